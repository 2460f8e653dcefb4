use axum::extract::rejection::JsonRejection;
use axum::{
    extract::{Path, RawQuery, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::access::{authorize, ensure_single_per_owner, require_role, Action};
use crate::app::AppState;
use crate::database::document::OWNER_FIELD;
use crate::database::models::review::{MAX_RATING, MIN_RATING, PROTECTED_FIELDS};
use crate::database::models::{sanitize_patch, to_owned_document, NewReview};
use crate::database::Document;
use crate::error::ApiError;
use crate::filter::{Filter, FindQuery};
use crate::middleware::{ApiResponse, ApiResult, ListResponse, PageResponse};
use crate::query::descriptor::default_sort;
use crate::query::{execute, populate_relation, translate_query_string, Populate};
use crate::services;
use crate::types::{collections, Principal, Role};

use super::utils::{check_patched, load, parse_payload, patch_object};

const KIND: &str = "review";
const REVIEWERS: &[Role] = &[Role::User, Role::Admin];

fn bootcamp_summary() -> Populate {
    Populate::one("bootcamp", collections::BOOTCAMPS).select(&["name", "description"])
}

fn check_rating(review: &NewReview) -> Result<(), ApiError> {
    if NewReview::rating_in_range(review.rating) {
        Ok(())
    } else {
        Err(ApiError::validation_error(
            format!("Rating must be between {} and {}", MIN_RATING, MAX_RATING),
            None,
        ))
    }
}

/// GET /api/v1/reviews
pub async fn list(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<PageResponse<Document>, ApiError> {
    let descriptor = translate_query_string(raw.as_deref(), &state.query_options()).with_populate(bootcamp_summary());
    let page = execute(state.store.as_ref(), collections::REVIEWS, &descriptor).await?;
    Ok(page.into())
}

/// GET /api/v1/bootcamps/:id/reviews
pub async fn list_for_bootcamp(
    State(state): State<AppState>,
    Path(bootcamp_id): Path<String>,
) -> Result<ListResponse<Document>, ApiError> {
    let query = FindQuery {
        filter: Filter::new().eq("bootcamp", json!(bootcamp_id)),
        sort: default_sort(),
        ..Default::default()
    };
    let reviews = state.store.find(collections::REVIEWS, &query).await?;
    Ok(ListResponse::new(reviews))
}

/// GET /api/v1/reviews/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Document> {
    let mut review = [load(&state, collections::REVIEWS, KIND, &id).await?];
    populate_relation(state.store.as_ref(), &mut review, &bootcamp_summary()).await?;
    let [review] = review;
    Ok(ApiResponse::success(review))
}

/// POST /api/v1/bootcamps/:id/reviews - one review per user per bootcamp
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(bootcamp_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    require_role(&principal, REVIEWERS)?;
    load(&state, collections::BOOTCAMPS, "bootcamp", &bootcamp_id).await?;

    let mine = Filter::new()
        .eq("bootcamp", json!(bootcamp_id))
        .eq(OWNER_FIELD, json!(principal.id));
    let existing = state.store.find_one(collections::REVIEWS, mine).await?;
    ensure_single_per_owner(&principal, existing.as_ref(), "reviewed this bootcamp")?;

    let Json(body) = body?;
    let payload: NewReview = parse_payload(body)?;
    check_rating(&payload)?;

    let mut doc = to_owned_document(&payload, &principal.id)?;
    doc.set("bootcamp", json!(bootcamp_id));

    let created = state.store.insert(collections::REVIEWS, doc).await?;
    services::refresh_average_rating(state.store.as_ref(), &bootcamp_id).await?;
    Ok(ApiResponse::created(created))
}

/// PUT /api/v1/reviews/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    require_role(&principal, REVIEWERS)?;
    let current = load(&state, collections::REVIEWS, KIND, &id).await?;
    authorize(&principal, KIND, &current, Action::Update).into_result()?;

    let Json(body) = body?;
    let patch = sanitize_patch(patch_object(body)?, PROTECTED_FIELDS);
    let merged: NewReview = check_patched(&current, &patch)?;
    check_rating(&merged)?;

    let updated = state
        .store
        .update(collections::REVIEWS, &id, patch)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(KIND, &id))?;
    if let Some(bootcamp_id) = updated.get_str("bootcamp") {
        services::refresh_average_rating(state.store.as_ref(), bootcamp_id).await?;
    }
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/reviews/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    require_role(&principal, REVIEWERS)?;
    let current = load(&state, collections::REVIEWS, KIND, &id).await?;
    authorize(&principal, KIND, &current, Action::Delete).into_result()?;

    state.store.delete(collections::REVIEWS, &id).await?;
    if let Some(bootcamp_id) = current.get_str("bootcamp") {
        services::refresh_average_rating(state.store.as_ref(), bootcamp_id).await?;
    }
    Ok(ApiResponse::success(json!({})))
}
