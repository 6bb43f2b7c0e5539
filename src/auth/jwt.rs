use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{auth::claims::Claims, config::SessionConfig, state::AppState};

/// Signing and verification keys for session credentials.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
    pub remember_ttl: Duration,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.session)
    }
}

impl SessionKeys {
    pub fn from_config(cfg: &SessionConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::minutes(cfg.ttl_minutes),
            remember_ttl: Duration::days(cfg.remember_ttl_days),
        }
    }

    pub fn lifetime(&self, remember: bool) -> Duration {
        if remember {
            self.remember_ttl
        } else {
            self.ttl
        }
    }

    pub fn sign(&self, user_id: Uuid, name: &str, remember: bool) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + self.lifetime(remember);
        let claims = Claims {
            sub: user_id,
            name: name.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, remember, "session signed");
        Ok(token)
    }

    /// Checks signature, expiry, issuer and audience.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "session verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn session_config(secret: &str) -> SessionConfig {
        SessionConfig {
            secret: secret.into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 60,
            remember_ttl_days: 365,
            cookie_secure: false,
        }
    }

    /// Token with an `exp` well past the default validation leeway.
    pub(crate) fn expired_token(cfg: &SessionConfig, user_id: Uuid) -> String {
        let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
        let claims = Claims {
            sub: user_id,
            name: "Late".into(),
            iat: now - 7200,
            exp: now - 3600,
            iss: cfg.issuer.clone(),
            aud: cfg.audience.clone(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(cfg.secret.as_bytes()),
        )
        .expect("encode expired token")
    }

    #[test]
    fn sign_and_verify() {
        let keys = SessionKeys::from_config(&session_config("dev-secret"));
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, "Ada", false).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.name, "Ada");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn remember_me_outlives_short_session() {
        let keys = SessionKeys::from_config(&session_config("dev-secret"));
        let token = keys.sign(Uuid::new_v4(), "Ada", true).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.exp - claims.iat, 365 * 24 * 3600);
    }

    #[test]
    fn verify_rejects_other_secret() {
        let good = SessionKeys::from_config(&session_config("secret-a"));
        let bad = SessionKeys::from_config(&session_config("secret-b"));
        let token = bad.sign(Uuid::new_v4(), "Mallory", false).expect("sign");
        assert!(good.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_other_audience() {
        let good = SessionKeys::from_config(&session_config("same"));
        let mut other_cfg = session_config("same");
        other_cfg.audience = "someone-else".into();
        let other = SessionKeys::from_config(&other_cfg);
        let token = other.sign(Uuid::new_v4(), "Eve", false).expect("sign");
        assert!(good.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_expired() {
        let cfg = session_config("dev-secret");
        let keys = SessionKeys::from_config(&cfg);
        let token = expired_token(&cfg, Uuid::new_v4());
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_garbage() {
        let keys = SessionKeys::from_config(&session_config("dev-secret"));
        assert!(keys.verify("not.a.jwt").is_err());
        assert!(keys.verify("").is_err());
    }
}
