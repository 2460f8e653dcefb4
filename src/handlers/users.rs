use axum::extract::rejection::JsonRejection;
use axum::{
    extract::{Path, RawQuery, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::access::require_role;
use crate::app::AppState;
use crate::database::models::{sanitize_patch, NewUser};
use crate::database::Document;
use crate::error::ApiError;
use crate::filter::Filter;
use crate::middleware::{ApiResponse, ApiResult, PageResponse};
use crate::query::{execute, translate_query_string};
use crate::types::{collections, Principal, Role};

use super::utils::{check_patched, load, parse_payload, patch_object};

const KIND: &str = "user";
const ADMINS: &[Role] = &[Role::Admin];

async fn ensure_email_free(state: &AppState, email: &str, except: Option<&str>) -> Result<(), ApiError> {
    let holder = state
        .store
        .find_one(collections::USERS, Filter::new().eq("email", json!(email)))
        .await?;
    match holder {
        Some(user) if user.id() != except => Err(ApiError::conflict(format!("Email {} is already registered", email))),
        _ => Ok(()),
    }
}

/// GET /api/v1/users
pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    RawQuery(raw): RawQuery,
) -> Result<PageResponse<Document>, ApiError> {
    require_role(&principal, ADMINS)?;
    let descriptor = translate_query_string(raw.as_deref(), &state.query_options());
    let page = execute(state.store.as_ref(), collections::USERS, &descriptor).await?;
    Ok(page.into())
}

/// GET /api/v1/users/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Document> {
    require_role(&principal, ADMINS)?;
    Ok(ApiResponse::success(load(&state, collections::USERS, KIND, &id).await?))
}

/// POST /api/v1/users
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    require_role(&principal, ADMINS)?;

    let Json(body) = body?;
    let payload: NewUser = parse_payload(body)?;
    ensure_email_free(&state, &payload.email, None).await?;

    let doc = Document::from_value(serde_json::to_value(&payload)?)
        .ok_or_else(|| ApiError::internal_server_error("Failed to build user"))?;
    let created = state.store.insert(collections::USERS, doc).await?;
    tracing::info!("Admin {} created {} {}", principal.id, payload.role, created.id().unwrap_or_default());
    Ok(ApiResponse::created(created))
}

/// PUT /api/v1/users/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    require_role(&principal, ADMINS)?;
    let current = load(&state, collections::USERS, KIND, &id).await?;

    let Json(body) = body?;
    let patch = sanitize_patch(patch_object(body)?, &[]);
    let merged: NewUser = check_patched(&current, &patch)?;
    ensure_email_free(&state, &merged.email, Some(&id)).await?;

    let updated = state
        .store
        .update(collections::USERS, &id, patch)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(KIND, &id))?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/users/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    require_role(&principal, ADMINS)?;
    if !state.store.delete(collections::USERS, &id).await? {
        return Err(ApiError::resource_not_found(KIND, &id));
    }
    Ok(ApiResponse::success(json!({})))
}
