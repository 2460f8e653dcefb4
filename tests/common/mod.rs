#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use devcamper_api::auth::{generate_jwt, Claims};
use devcamper_api::cli::commands::seed::import;
use devcamper_api::config::AppConfig;
use devcamper_api::database::{DocumentStore, MemoryStore};
use devcamper_api::geo::{GeoResolver, StaticGeocoder};
use devcamper_api::types::Role;
use devcamper_api::upload::LocalDiskSink;
use devcamper_api::{app, AppState};

pub const ADMIN: &str = "5c8a1d5b0190b214360dc031";
pub const PUBLISHER: &str = "5c8a1d5b0190b214360dc032";
pub const PUBLISHER_2: &str = "5c8a1d5b0190b214360dc033";
pub const USER: &str = "5c8a1d5b0190b214360dc040";
pub const USER_2: &str = "5c8a1d5b0190b214360dc041";

pub const DEVWORKS: &str = "5d713995b721c3bb38c1f5d0";
pub const MODERNTECH: &str = "5d713a66ec8f2b88b8f830b8";
pub const CODEMASTERS: &str = "5d725a037b292f5f8ceff787";

/// An app over a freshly seeded in-memory store. Each test gets its own.
pub struct TestApp {
    pub state: AppState,
    pub upload_dir: PathBuf,
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        let mut config = AppConfig::development();
        let upload_dir =
            std::env::temp_dir().join(format!("devcamper-test-{}", uuid::Uuid::new_v4().simple()));
        config.upload.path = upload_dir.clone();

        let store = Arc::new(MemoryStore::new());
        let fixtures = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures");
        import(store.as_ref(), &fixtures).await.context("seeding fixtures")?;

        let state = AppState {
            store,
            geo: GeoResolver::new(
                Arc::new(StaticGeocoder::with_fixture_postal_codes()),
                Duration::from_millis(config.geocoder.timeout_ms),
            ),
            sink: Arc::new(LocalDiskSink::new(upload_dir.clone())),
            config: Arc::new(config),
        };
        Ok(Self { state, upload_dir })
    }

    pub fn router(&self) -> Router {
        app(self.state.clone())
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.state.store.as_ref()
    }

    pub fn token(&self, user_id: &str, role: Role) -> String {
        let claims = Claims::new(user_id.to_string(), role, 1);
        generate_jwt(&claims, &self.state.config.security.jwt_secret).expect("signing test token")
    }

    pub async fn get(&self, uri: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, uri, None, None).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };
        self.call(request).await
    }

    pub async fn call(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let payload = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).with_context(|| {
                format!("non-JSON body ({}): {}", status, String::from_utf8_lossy(&bytes))
            })?
        };
        Ok((status, payload))
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

/// `data` as an array, or empty
pub fn data_array(payload: &Value) -> Vec<Value> {
    payload["data"].as_array().cloned().unwrap_or_default()
}

pub fn titles(payload: &Value, field: &str) -> Vec<String> {
    data_array(payload)
        .iter()
        .filter_map(|d| d[field].as_str().map(String::from))
        .collect()
}
