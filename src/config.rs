use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    /// Lifetime of a "remember me" session.
    pub remember_ttl_days: i64,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub tokeninfo_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` runs the service on the in-memory stores.
    pub database_url: Option<String>,
    pub session: SessionConfig,
    pub google: GoogleConfig,
    pub static_dir: String,
    pub host: String,
    pub port: u16,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let session = SessionConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "clubspot".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "clubspot-web".into()),
            ttl_minutes: env_or("SESSION_TTL_MINUTES", 60),
            remember_ttl_days: env_or("SESSION_REMEMBER_TTL_DAYS", 365),
            cookie_secure: env_or("COOKIE_SECURE", false),
        };
        anyhow::ensure!(!session.secret.is_empty(), "JWT_SECRET must not be empty");

        let google = GoogleConfig {
            client_id: std::env::var("GOOGLE_CLIENT_ID").context("GOOGLE_CLIENT_ID must be set")?,
            tokeninfo_url: std::env::var("GOOGLE_TOKENINFO_URL")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/tokeninfo".into()),
        };

        Ok(Self {
            database_url,
            session,
            google,
            static_dir: std::env::var("STATIC_DIR").unwrap_or_else(|_| "dist".into()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 3000),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_on_garbage() {
        std::env::set_var("CLUBSPOT_TEST_TTL", "not-a-number");
        assert_eq!(env_or("CLUBSPOT_TEST_TTL", 60i64), 60);
        std::env::set_var("CLUBSPOT_TEST_TTL", "15");
        assert_eq!(env_or("CLUBSPOT_TEST_TTL", 60i64), 15);
        assert!(!env_or("CLUBSPOT_TEST_MISSING_FLAG", false));
    }
}
