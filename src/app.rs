use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{get, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::database::DocumentStore;
use crate::geo::GeoResolver;
use crate::handlers::{auth, bootcamps, courses, reviews, users};
use crate::middleware::jwt_auth_middleware;
use crate::query::QueryOptions;
use crate::upload::FileSink;

/// Collaborators shared by every request
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub geo: GeoResolver,
    pub sink: Arc<dyn FileSink>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn query_options(&self) -> QueryOptions {
        self.config.query.options()
    }
}

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        // Leave room above the upload limit so the validator, not the body
        // limit, reports oversized photos
        .layer(DefaultBodyLimit::max(state.config.upload.max_file_upload as usize + 64 * 1024))
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/bootcamps", get(bootcamps::list))
        .route("/api/v1/bootcamps/:id", get(bootcamps::get))
        .route("/api/v1/bootcamps/radius/:zipcode/:distance", get(bootcamps::radius))
        .route("/api/v1/bootcamps/:id/courses", get(courses::list_for_bootcamp))
        .route("/api/v1/bootcamps/:id/reviews", get(reviews::list_for_bootcamp))
        .route("/api/v1/courses", get(courses::list))
        .route("/api/v1/courses/:id", get(courses::get))
        .route("/api/v1/reviews", get(reviews::list))
        .route("/api/v1/reviews/:id", get(reviews::get))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use axum::routing::post;

    Router::new()
        .route("/api/v1/auth/me", get(auth::me))
        .route("/api/v1/bootcamps", post(bootcamps::create))
        .route("/api/v1/bootcamps/:id", put(bootcamps::update).delete(bootcamps::delete))
        .route("/api/v1/bootcamps/:id/photo", put(bootcamps::photo))
        .route("/api/v1/bootcamps/:id/courses", post(courses::create))
        .route("/api/v1/bootcamps/:id/reviews", post(reviews::create))
        .route("/api/v1/courses/:id", put(courses::update).delete(courses::delete))
        .route("/api/v1/reviews/:id", put(reviews::update).delete(reviews::delete))
        .route("/api/v1/users", get(users::list).post(users::create))
        .route(
            "/api/v1/users/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "DevCamper API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "bootcamps": "/api/v1/bootcamps[/:id] (read public, write publisher)",
                "radius": "/api/v1/bootcamps/radius/:zipcode/:distance?unit=mi|km (public)",
                "courses": "/api/v1/courses[/:id], /api/v1/bootcamps/:id/courses",
                "reviews": "/api/v1/reviews[/:id], /api/v1/bootcamps/:id/reviews",
                "users": "/api/v1/users[/:id] (admin)",
                "auth": "/api/v1/auth/me (protected)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
