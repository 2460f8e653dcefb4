use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::database::Document;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::{collections, Principal};

use super::utils::load;

/// GET /api/v1/auth/me - the authenticated user's own document
pub async fn me(State(state): State<AppState>, Extension(principal): Extension<Principal>) -> ApiResult<Document> {
    Ok(ApiResponse::success(
        load(&state, collections::USERS, "user", &principal.id).await?,
    ))
}
