use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::app::{app, AppState};
use crate::config::{self, AppConfig, GeocoderProvider};
use crate::geo::{GeoResolver, Geocoder, MapQuestGeocoder, StaticGeocoder};
use crate::upload::LocalDiskSink;

pub fn geocoder(config: &AppConfig) -> anyhow::Result<Arc<dyn Geocoder>> {
    match config.geocoder.provider {
        GeocoderProvider::MapQuest => {
            let key = config
                .geocoder
                .api_key
                .clone()
                .context("GEOCODER_API_KEY is required for the mapquest geocoder")?;
            Ok(Arc::new(MapQuestGeocoder::new(key)))
        }
        GeocoderProvider::Static => Ok(Arc::new(StaticGeocoder::with_fixture_postal_codes())),
    }
}

pub async fn build_state(config: Arc<AppConfig>) -> anyhow::Result<AppState> {
    let store = super::open_store(&config).await?;
    let geo = GeoResolver::new(geocoder(&config)?, Duration::from_millis(config.geocoder.timeout_ms));
    let sink = Arc::new(LocalDiskSink::new(config.upload.path.clone()));

    Ok(AppState { store, geo, sink, config })
}

pub async fn handle(port: Option<u16>, seed: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = config::config().clone();
    if let Some(port) = port {
        config.server.port = port;
    }
    tracing::info!("Starting DevCamper API in {:?} mode", config.environment);

    let state = build_state(Arc::new(config)).await?;
    if let Some(dir) = seed {
        super::seed::import(state.store.as_ref(), &dir).await?;
    }

    let bind_addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("DevCamper API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
