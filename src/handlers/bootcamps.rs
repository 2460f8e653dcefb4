use axum::{
    extract::{Multipart, Path, Query, RawQuery, State},
    Extension, Json,
};
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::access::{authorize, ensure_single_per_owner, require_role, Action};
use crate::app::AppState;
use crate::database::document::OWNER_FIELD;
use crate::database::models::bootcamp::{slugify, DEFAULT_PHOTO, DERIVED_FIELDS};
use crate::database::models::{sanitize_patch, to_owned_document, NewBootcamp};
use crate::database::Document;
use crate::error::ApiError;
use crate::filter::{Filter, FindQuery};
use crate::geo::{parse_distance, radius_query, DistanceUnit};
use crate::middleware::{ApiResponse, ApiResult, ListResponse, PageResponse};
use crate::query::{execute, translate_query_string, Populate};
use crate::services;
use crate::types::{collections, Principal, Role};
use crate::upload::{self, UploadedAsset};

use super::utils::{check_patched, load, parse_payload, patch_object};

const KIND: &str = "bootcamp";
const PUBLISHERS: &[Role] = &[Role::Publisher, Role::Admin];

/// GET /api/v1/bootcamps - paginated list with each bootcamp's courses
pub async fn list(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<PageResponse<Document>, ApiError> {
    let descriptor = translate_query_string(raw.as_deref(), &state.query_options())
        .with_populate(Populate::many("courses", collections::COURSES, "bootcamp"));
    let page = execute(state.store.as_ref(), collections::BOOTCAMPS, &descriptor).await?;
    Ok(page.into())
}

/// GET /api/v1/bootcamps/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Document> {
    Ok(ApiResponse::success(load(&state, collections::BOOTCAMPS, KIND, &id).await?))
}

/// POST /api/v1/bootcamps - one per publisher; admins may add more
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    require_role(&principal, PUBLISHERS)?;

    let existing = state
        .store
        .find_one(collections::BOOTCAMPS, Filter::new().eq(OWNER_FIELD, json!(principal.id)))
        .await?;
    ensure_single_per_owner(&principal, existing.as_ref(), "published a bootcamp")?;

    let Json(body) = body?;
    let payload: NewBootcamp = parse_payload(body)?;
    let location = state.geo.locate(&payload.address).await?;

    let mut doc = to_owned_document(&payload, &principal.id)?;
    doc.set("slug", json!(slugify(&payload.name)));
    doc.set("location", location.to_geojson());
    doc.set("photo", json!(DEFAULT_PHOTO));

    let created = state.store.insert(collections::BOOTCAMPS, doc).await?;
    tracing::info!("User {} created bootcamp {}", principal.id, created.id().unwrap_or_default());
    Ok(ApiResponse::created(created))
}

/// PUT /api/v1/bootcamps/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Document> {
    require_role(&principal, PUBLISHERS)?;
    let current = load(&state, collections::BOOTCAMPS, KIND, &id).await?;
    authorize(&principal, KIND, &current, Action::Update).into_result()?;

    let Json(body) = body?;
    let mut patch = sanitize_patch(patch_object(body)?, DERIVED_FIELDS);

    // A new address is geocoded like on create and never stored raw
    let address = match patch.remove("address") {
        Some(Value::String(address)) => Some(address),
        Some(_) => return Err(ApiError::bad_request("address must be a string")),
        None => None,
    };
    if let Some(Value::String(name)) = patch.get("name") {
        let slug = slugify(name);
        patch.insert("slug".to_string(), json!(slug));
    }

    let mut candidate = patch.clone();
    candidate.insert("address".to_string(), json!(address.clone().unwrap_or_default()));
    check_patched::<NewBootcamp>(&current, &candidate)?;

    if let Some(address) = address {
        let location = state.geo.locate(&address).await?;
        patch.insert("location".to_string(), location.to_geojson());
    }

    let updated = state
        .store
        .update(collections::BOOTCAMPS, &id, patch)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(KIND, &id))?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/v1/bootcamps/:id - removes its courses and reviews too
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    require_role(&principal, PUBLISHERS)?;
    let current = load(&state, collections::BOOTCAMPS, KIND, &id).await?;
    authorize(&principal, KIND, &current, Action::Delete).into_result()?;

    services::cascade_delete(state.store.as_ref(), &id).await?;
    Ok(ApiResponse::success(json!({})))
}

#[derive(Debug, Deserialize)]
pub struct RadiusQuery {
    /// `mi` (default) or `km`
    pub unit: Option<String>,
}

/// GET /api/v1/bootcamps/radius/:zipcode/:distance
pub async fn radius(
    State(state): State<AppState>,
    Path((zipcode, distance)): Path<(String, String)>,
    Query(query): Query<RadiusQuery>,
) -> Result<ListResponse<Document>, ApiError> {
    let distance = parse_distance(&distance)?;
    let unit = match query.unit.as_deref() {
        Some(raw) => raw.parse::<DistanceUnit>()?,
        None => DistanceUnit::default(),
    };

    let center = state.geo.resolve(&zipcode).await?;
    let region = radius_query(center, distance, unit)?;

    let found = state
        .store
        .find(
            collections::BOOTCAMPS,
            &FindQuery::new(Filter::new().within("location", region)),
        )
        .await?;
    tracing::debug!("{} bootcamps within {} {:?} of {}", found.len(), distance, unit, zipcode);
    Ok(ListResponse::new(found))
}

/// PUT /api/v1/bootcamps/:id/photo - multipart field `file`
pub async fn photo(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<String> {
    require_role(&principal, PUBLISHERS)?;
    let current = load(&state, collections::BOOTCAMPS, KIND, &id).await?;
    authorize(&principal, KIND, &current, Action::UploadPhoto).into_result()?;

    let asset = read_file_field(multipart).await?;
    let name = upload::validate(asset.as_ref(), &id, state.config.upload.max_file_upload)?;

    // validate() only accepts present assets
    if let Some(asset) = asset {
        state.sink.put(&name, &asset.bytes).await.map_err(|e| {
            tracing::error!("Failed to store upload {}: {}", name, e);
            ApiError::internal_server_error("Problem with file upload")
        })?;
    }

    let mut patch = serde_json::Map::new();
    patch.insert("photo".to_string(), json!(name));
    state.store.update(collections::BOOTCAMPS, &id, patch).await?;

    Ok(ApiResponse::success(name))
}

async fn read_file_field(mut multipart: Multipart) -> Result<Option<UploadedAsset>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original_name = field.file_name().unwrap_or_default().to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(|e| ApiError::bad_request(e.body_text()))?;
        return Ok(Some(UploadedAsset::new(original_name, mime_type, bytes.to_vec())));
    }
    Ok(None)
}
