pub mod seed;
pub mod serve;
pub mod token;

use std::sync::Arc;

use anyhow::Context;

use crate::config::AppConfig;
use crate::database::{DocumentStore, MemoryStore, PgStore};

/// Postgres when `DATABASE_URL` is configured, an empty in-memory store otherwise
pub async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match &config.database.url {
        Some(url) => {
            let store = PgStore::connect(url, &config.database)
                .await
                .context("connecting to DATABASE_URL")?;
            store.migrate().await.context("creating documents table")?;
            tracing::info!("Using Postgres document store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory document store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
