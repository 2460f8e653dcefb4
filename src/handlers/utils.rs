use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::app::AppState;
use crate::database::Document;
use crate::error::ApiError;

/// Fetch a document or answer 404 naming the kind and id
pub async fn load(state: &AppState, collection: &str, kind: &str, id: &str) -> Result<Document, ApiError> {
    state
        .store
        .find_by_id(collection, id)
        .await?
        .ok_or_else(|| ApiError::resource_not_found(kind, id))
}

/// Deserialize a create payload, reporting serde's message as a validation error
pub fn parse_payload<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    Ok(serde_json::from_value(body)?)
}

pub fn patch_object(body: Value) -> Result<Map<String, Value>, ApiError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::bad_request("Request body must be a JSON object")),
    }
}

/// Apply `patch` to a copy of `current` and check the result still
/// deserializes as a valid `T`
pub fn check_patched<T: DeserializeOwned>(current: &Document, patch: &Map<String, Value>) -> Result<T, ApiError> {
    let mut merged = current.clone();
    merged.merge(patch.clone());
    parse_payload(merged.into_value())
}
