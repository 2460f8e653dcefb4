use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;
use crate::database::{Document, DocumentStore};
use crate::filter::{Filter, FindQuery};
use crate::services;
use crate::types::collections;

pub const DEFAULT_FIXTURE_DIR: &str = "fixtures";

/// Load order matters: bootcamps before the courses and reviews that
/// point at them
const FIXTURE_COLLECTIONS: &[&str] = &[
    collections::USERS,
    collections::BOOTCAMPS,
    collections::COURSES,
    collections::REVIEWS,
];

#[derive(Subcommand)]
pub enum SeedCommands {
    #[command(about = "Import fixture JSON files into the store")]
    Import {
        #[arg(long, help = "Fixture directory")]
        dir: Option<PathBuf>,
    },

    #[command(about = "Delete every document the fixtures could have created")]
    Destroy,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub counts: Vec<(String, usize)>,
}

impl SeedSummary {
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    fn to_json(&self) -> Value {
        let counts: serde_json::Map<String, Value> =
            self.counts.iter().map(|(c, n)| (c.clone(), json!(n))).collect();
        json!({ "imported": counts })
    }
}

pub async fn handle(cmd: SeedCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config::config();
    if config.database.url.is_none() {
        bail!("DATABASE_URL must be set to seed a persistent store");
    }
    let store = super::open_store(config).await?;

    match cmd {
        SeedCommands::Import { dir } => {
            let dir = dir.unwrap_or_else(|| PathBuf::from(DEFAULT_FIXTURE_DIR));
            let summary = import(store.as_ref(), &dir).await?;
            output_success(
                &output_format,
                &format!("Imported {} documents from {}", summary.total(), dir.display()),
                Some(summary.to_json()),
            )
        }
        SeedCommands::Destroy => {
            let removed = destroy(store.as_ref()).await?;
            output_success(
                &output_format,
                &format!("Destroyed {} documents", removed),
                Some(json!({ "destroyed": removed })),
            )
        }
    }
}

fn read_fixture(dir: &Path, collection: &str) -> anyhow::Result<Vec<Document>> {
    let path = dir.join(format!("{}.json", collection));
    if !path.exists() {
        tracing::debug!("No fixture file {}", path.display());
        return Ok(vec![]);
    }
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let values: Vec<Value> = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            Document::from_value(v).with_context(|| format!("{} entry {} is not an object", path.display(), i))
        })
        .collect()
}

/// Insert every fixture file found in `dir`, then derive bootcamp averages
pub async fn import(store: &dyn DocumentStore, dir: &Path) -> anyhow::Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for collection in FIXTURE_COLLECTIONS {
        let docs = read_fixture(dir, collection)?;
        let n = docs.len();
        for doc in docs {
            store.insert(collection, doc).await?;
        }
        summary.counts.push((collection.to_string(), n));
    }

    let bootcamps = store.find(collections::BOOTCAMPS, &FindQuery::default()).await?;
    for bootcamp in &bootcamps {
        if let Some(id) = bootcamp.id() {
            services::refresh_average_cost(store, id).await?;
            services::refresh_average_rating(store, id).await?;
        }
    }

    tracing::info!("Seeded {} documents from {}", summary.total(), dir.display());
    Ok(summary)
}

pub async fn destroy(store: &dyn DocumentStore) -> anyhow::Result<u64> {
    let mut removed = 0;
    for collection in FIXTURE_COLLECTIONS.iter().rev() {
        removed += store.delete_many(collection, &Filter::new()).await?;
    }
    tracing::info!("Destroyed {} documents", removed);
    Ok(removed)
}
