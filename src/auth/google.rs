use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::services::is_valid_email;
use crate::{config::GoogleConfig, error::AppError};

const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Identity asserted by the external issuer after verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, AppError>;
}

/// Payload of Google's `tokeninfo` endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenInfo {
    pub aud: String,
    pub iss: String,
    pub email: Option<String>,
    // Google sends "true"/"false" strings here
    #[serde(default)]
    pub email_verified: serde_json::Value,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Accepts a tokeninfo payload only if it was minted for `client_id`.
pub(crate) fn check_token_info(
    info: TokenInfo,
    client_id: &str,
) -> Result<VerifiedIdentity, AppError> {
    if info.aud != client_id {
        warn!(aud = %info.aud, "identity token issued for another audience");
        return Err(AppError::AuthenticationFailed);
    }
    if !GOOGLE_ISSUERS.contains(&info.iss.as_str()) {
        warn!(iss = %info.iss, "identity token from unexpected issuer");
        return Err(AppError::AuthenticationFailed);
    }
    if !(info.email_verified == true || info.email_verified == "true") {
        warn!("identity token email not verified");
        return Err(AppError::AuthenticationFailed);
    }

    let email = info
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| is_valid_email(e))
        .ok_or(AppError::AuthenticationFailed)?;
    let name = info
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

    Ok(VerifiedIdentity {
        email,
        name,
        picture: info.picture,
    })
}

pub struct GoogleVerifier {
    http: reqwest::Client,
    client_id: String,
    tokeninfo_url: String,
}

impl GoogleVerifier {
    pub fn new(cfg: &GoogleConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            client_id: cfg.client_id.clone(),
            tokeninfo_url: cfg.tokeninfo_url.clone(),
        })
    }
}

#[async_trait]
impl TokenVerifier for GoogleVerifier {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, AppError> {
        let res = self
            .http
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "tokeninfo request failed");
                AppError::AuthenticationFailed
            })?;

        if !res.status().is_success() {
            warn!(status = %res.status(), "tokeninfo rejected token");
            return Err(AppError::AuthenticationFailed);
        }

        let info: TokenInfo = res.json().await.map_err(|e| {
            warn!(error = %e, "tokeninfo payload unreadable");
            AppError::AuthenticationFailed
        })?;
        let identity = check_token_info(info, &self.client_id)?;
        debug!(email = %identity.email, "identity token verified");
        Ok(identity)
    }
}

/// Verifier that knows a fixed set of tokens.
#[cfg(test)]
pub(crate) struct StaticVerifier {
    pub known: std::collections::HashMap<String, VerifiedIdentity>,
}

#[cfg(test)]
#[async_trait]
impl TokenVerifier for StaticVerifier {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, AppError> {
        self.known
            .get(id_token)
            .cloned()
            .ok_or(AppError::AuthenticationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info(v: serde_json::Value) -> TokenInfo {
        serde_json::from_value(v).expect("tokeninfo json")
    }

    #[test]
    fn accepts_token_for_this_app() {
        let id = check_token_info(
            info(json!({
                "aud": "client-1",
                "iss": "https://accounts.google.com",
                "email": "A@X.com",
                "email_verified": "true",
                "name": "A",
                "picture": "http://pic"
            })),
            "client-1",
        )
        .expect("verified");
        assert_eq!(id.email, "a@x.com");
        assert_eq!(id.name, "A");
        assert_eq!(id.picture.as_deref(), Some("http://pic"));
    }

    #[test]
    fn rejects_foreign_audience() {
        let err = check_token_info(
            info(json!({
                "aud": "some-other-app",
                "iss": "accounts.google.com",
                "email": "a@x.com",
                "email_verified": true,
                "name": "A"
            })),
            "client-1",
        )
        .unwrap_err();
        assert!(matches!(err, AppError::AuthenticationFailed));
    }

    #[test]
    fn rejects_unverified_email_and_bad_issuer() {
        let unverified = check_token_info(
            info(json!({
                "aud": "client-1",
                "iss": "accounts.google.com",
                "email": "a@x.com",
                "email_verified": "false"
            })),
            "client-1",
        );
        assert!(matches!(unverified, Err(AppError::AuthenticationFailed)));

        let bad_iss = check_token_info(
            info(json!({
                "aud": "client-1",
                "iss": "evil.example.com",
                "email": "a@x.com",
                "email_verified": "true"
            })),
            "client-1",
        );
        assert!(matches!(bad_iss, Err(AppError::AuthenticationFailed)));
    }

    #[test]
    fn missing_name_falls_back_to_mailbox() {
        let id = check_token_info(
            info(json!({
                "aud": "client-1",
                "iss": "accounts.google.com",
                "email": "grace@x.com",
                "email_verified": true
            })),
            "client-1",
        )
        .expect("verified");
        assert_eq!(id.name, "grace");
        assert_eq!(id.picture, None);
    }
}
