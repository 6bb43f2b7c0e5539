use std::sync::Arc;

use tracing::warn;

use crate::auth::google::{GoogleVerifier, TokenVerifier};
use crate::auth::repo::{PgUserStore, UserStore};
use crate::config::AppConfig;
use crate::events::repo::{EventStore, PgEventStore};
use crate::memory::MemoryStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub events: Arc<dyn EventStore>,
    pub verifier: Arc<dyn TokenVerifier>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let verifier = Arc::new(GoogleVerifier::new(&config.google)?) as Arc<dyn TokenVerifier>;

        let (users, events): (Arc<dyn UserStore>, Arc<dyn EventStore>) =
            match &config.database_url {
                Some(url) => {
                    let db = crate::db::connect(url).await?;
                    (
                        Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>,
                        Arc::new(PgEventStore::new(db)) as Arc<dyn EventStore>,
                    )
                }
                None => {
                    warn!("DATABASE_URL not set; using in-memory stores");
                    let store = Arc::new(MemoryStore::default());
                    (
                        store.clone() as Arc<dyn UserStore>,
                        store as Arc<dyn EventStore>,
                    )
                }
            };

        Ok(Self::from_parts(config, users, events, verifier))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        events: Arc<dyn EventStore>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            config,
            users,
            events,
            verifier,
        }
    }

    /// Memory-backed state whose verifier accepts the tokens in `known`.
    #[cfg(test)]
    pub fn fake(
        known: std::collections::HashMap<String, crate::auth::google::VerifiedIdentity>,
    ) -> Self {
        use crate::auth::google::StaticVerifier;
        use crate::config::GoogleConfig;

        let config = Arc::new(AppConfig {
            database_url: None,
            session: crate::auth::jwt::tests::session_config("test-secret"),
            google: GoogleConfig {
                client_id: "test-client".into(),
                tokeninfo_url: "http://127.0.0.1:9/tokeninfo".into(),
            },
            static_dir: "dist".into(),
            host: "127.0.0.1".into(),
            port: 0,
        });
        let store = Arc::new(MemoryStore::default());
        Self::from_parts(config, store.clone(), store, Arc::new(StaticVerifier { known }))
    }
}
