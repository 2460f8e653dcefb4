use axum::extract::rejection::JsonRejection;
use axum::{
    extract::{Path, RawQuery, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::access::{authorize, require_role, Action};
use crate::app::AppState;
use crate::database::models::course::PROTECTED_FIELDS;
use crate::database::models::{sanitize_patch, to_owned_document, NewCourse};
use crate::database::Document;
use crate::error::ApiError;
use crate::filter::{Filter, FindQuery};
use crate::middleware::{ApiResponse, ApiResult, ListResponse, PageResponse};
use crate::query::descriptor::default_sort;
use crate::query::{execute, populate_relation, translate_query_string, Populate};
use crate::services;
use crate::types::{collections, Principal, Role};

use super::utils::{check_patched, load, parse_payload, patch_object};

const KIND: &str = "course";
const PUBLISHERS: &[Role] = &[Role::Publisher, Role::Admin];

fn bootcamp_summary() -> Populate {
    Populate::one("bootcamp", collections::BOOTCAMPS).select(&["name", "description"])
}

/// GET /api/v1/courses - paginated, each with its bootcamp's name and description
pub async fn list(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<PageResponse<Document>, ApiError> {
    let descriptor = translate_query_string(raw.as_deref(), &state.query_options()).with_populate(bootcamp_summary());
    let page = execute(state.store.as_ref(), collections::COURSES, &descriptor).await?;
    Ok(page.into())
}

/// GET /api/v1/bootcamps/:id/courses - every course of one bootcamp
pub async fn list_for_bootcamp(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
) -> Result<ListResponse<Document>, ApiError> {
    let query = FindQuery {
        filter: Filter::new().eq("bootcamp", json!(bootcamp_id)),
        sort: default_sort(),
        ..Default::default()
    };
    let courses = state.store.find(collections::COURSES, &query).await?;
    Ok(ListResponse::new(courses))
}

/// GET /api/v1/courses/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Document> {
    let mut course = [load(&state, collections::COURSES, KIND, &id).await?];
    populate_relation(state.store.as_ref(), &mut course, &bootcamp_summary()).await?;
    let [course] = course;
    Ok(ApiResponse::success(course))
}

/// POST /api/v1/bootcamps/:id/courses - only the bootcamp's owner may add
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(bootcamp_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    require_role(&principal, PUBLISHERS)?;
    let bootcamp = load(&state, collections::BOOTCAMPS, "bootcamp", &bootcamp_id).await?;
    authorize(&principal, "bootcamp", &bootcamp, Action::AddCourse).into_result()?;

    let Json(body) = body?;
    let payload: NewCourse = parse_payload(body)?;
    let mut doc = to_owned_document(&payload, &principal.id)?;
    doc.set("bootcamp", json!(bootcamp_id));

    let created = state.store.insert(collections::COURSES, doc).await?;
    services::refresh_average_cost(state.store.as_ref(), &bootcamp_id).await?;
    tracing::info!("User {} added course {} to bootcamp {}", principal.id, created.id().unwrap_or_default(), bootcamp_id);
    Ok(ApiResponse::created(created))
}

/// PUT /api/v1/courses/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    require_role(&principal, PUBLISHERS)?;
    let current = load(&state, collections::COURSES, KIND, &id).await?;
    authorize(&principal, KIND, &current, Action::Update).into_result()?;

    let Json(body) = body?;
    let patch = sanitize_patch(patch_object(body)?, PROTECTED_FIELDS);
    check_patched::<NewCourse>(&current, &patch)?;

    let updated = state
        .store
        .update(collections::COURSES, &id, patch)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(KIND, &id))?;
    if let Some(bootcamp_id) = updated.get_str("bootcamp") {
        services::refresh_average_cost(state.store.as_ref(), bootcamp_id).await?;
    }
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/courses/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    require_role(&principal, PUBLISHERS)?;
    let current = load(&state, collections::COURSES, KIND, &id).await?;
    authorize(&principal, KIND, &current, Action::Delete).into_result()?;

    state.store.delete(collections::COURSES, &id).await?;
    if let Some(bootcamp_id) = current.get_str("bootcamp") {
        services::refresh_average_cost(state.store.as_ref(), bootcamp_id).await?;
    }
    Ok(ApiResponse::success(json!({})))
}
