use std::sync::Arc;

use anyhow::Context;
use rand::{rngs::StdRng, SeedableRng};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::config::{AppConfig, StoreKind};
use crate::garden::GardenEngine;
use crate::store::{GardenStore, MemoryGardenStore, PgGardenStore};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<GardenEngine>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn GardenStore> = match config.store {
            StoreKind::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL missing")?;
                let db = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                let store = PgGardenStore::new(db);
                if let Err(e) = store.migrate().await {
                    warn!(error = %e, "migrations failed; continuing");
                }
                Arc::new(store)
            }
            StoreKind::Memory => {
                warn!("using in-memory store; data is lost on restart");
                Arc::new(MemoryGardenStore::new())
            }
        };

        let engine = match config.rng_seed {
            Some(seed) => {
                info!(seed, "garden rng seeded from config");
                GardenEngine::new(store, StdRng::seed_from_u64(seed))
            }
            None => GardenEngine::from_entropy(store),
        };

        Ok(Self::from_parts(Arc::new(engine), config))
    }

    pub fn from_parts(engine: Arc<GardenEngine>, config: Arc<AppConfig>) -> Self {
        Self { engine, config }
    }

    /// In-memory state with a fixed seed and test JWT settings.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::JwtConfig;

        let config = Arc::new(AppConfig {
            store: StoreKind::Memory,
            database_url: None,
            db_max_connections: 1,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            rng_seed: Some(7),
        });
        let store = Arc::new(MemoryGardenStore::new()) as Arc<dyn GardenStore>;
        let engine = GardenEngine::new(store, StdRng::seed_from_u64(7));
        Self::from_parts(Arc::new(engine), config)
    }
}
