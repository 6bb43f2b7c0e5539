use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;

use super::{google::TokenVerifier, repo::UserStore, repo_types::User};
use crate::error::AppError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Verify an external identity token and bind it to a durable user.
pub async fn sign_in(
    verifier: &dyn TokenVerifier,
    users: &dyn UserStore,
    id_token: &str,
) -> Result<User, AppError> {
    if id_token.trim().is_empty() {
        return Err(AppError::validation("token is required"));
    }
    let identity = verifier.verify(id_token).await?;
    let user = users
        .upsert_by_email(&identity.email, &identity.name, identity.picture.as_deref())
        .await?;
    info!(user_id = %user.id, email = %user.email, "user signed in");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use super::*;
    use crate::{
        auth::google::{StaticVerifier, VerifiedIdentity},
        memory::MemoryStore,
    };

    fn verifier() -> StaticVerifier {
        let mut known = HashMap::new();
        known.insert(
            "good".to_string(),
            VerifiedIdentity {
                email: "a@x.com".into(),
                name: "A".into(),
                picture: None,
            },
        );
        StaticVerifier { known }
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("a x@y.com"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn first_sign_in_creates_user_with_no_joined_events() {
        let store = MemoryStore::default();
        let user = sign_in(&verifier(), &store, "good").await.expect("sign in");
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.name, "A");
        assert!(user.joined_events.is_empty());
    }

    #[tokio::test]
    async fn rejected_and_blank_tokens() {
        let store = MemoryStore::default();
        let err = sign_in(&verifier(), &store, "forged").await.unwrap_err();
        assert!(matches!(err, AppError::AuthenticationFailed));
        let err = sign_in(&verifier(), &store, "  ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn concurrent_sign_ins_share_one_user() {
        let store = Arc::new(MemoryStore::default());
        let verifier = Arc::new(verifier());
        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            let verifier = verifier.clone();
            handles.push(tokio::spawn(async move {
                sign_in(verifier.as_ref(), store.as_ref(), "good")
                    .await
                    .expect("sign in")
                    .id
            }));
        }
        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.expect("join"));
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.user_count(), 1);
    }
}
