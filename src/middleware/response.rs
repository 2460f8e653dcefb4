use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::query::{Page, Pagination};

/// Wrapper for API responses that automatically adds success envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response with default 200 status
    pub fn success(data: T) -> Self {
        Self { data, status_code: None }
    }

    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self {
            data,
            status_code: Some(status_code),
        }
    }

    /// Create a 201 Created response
    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED)
    }
}

fn serialize_or_500<T: Serialize>(data: &T) -> Result<Value, Response> {
    serde_json::to_value(data).map_err(|e| {
        tracing::error!("Failed to serialize response data: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": "Failed to serialize response data",
                "code": "INTERNAL_SERVER_ERROR"
            })),
        )
            .into_response()
    })
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let data_value = match serialize_or_500(&self.data) {
            Ok(value) => value,
            Err(response) => return response,
        };

        (status, Json(json!({ "success": true, "data": data_value }))).into_response()
    }
}

/// Plain list envelope: `{ success, count, data }`
#[derive(Debug)]
pub struct ListResponse<T: Serialize> {
    pub items: Vec<T>,
}

impl<T: Serialize> ListResponse<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T: Serialize> IntoResponse for ListResponse<T> {
    fn into_response(self) -> Response {
        let data = match serialize_or_500(&self.items) {
            Ok(value) => value,
            Err(response) => return response,
        };
        Json(json!({
            "success": true,
            "count": self.items.len(),
            "data": data
        }))
        .into_response()
    }
}

/// Paginated envelope: `{ success, count, pagination, data }`
#[derive(Debug)]
pub struct PageResponse<T: Serialize> {
    pub page: Page<T>,
}

impl<T: Serialize> From<Page<T>> for PageResponse<T> {
    fn from(page: Page<T>) -> Self {
        Self { page }
    }
}

impl<T: Serialize> IntoResponse for PageResponse<T> {
    fn into_response(self) -> Response {
        let Page { items, count, pagination } = self.page;
        let data = match serialize_or_500(&items) {
            Ok(value) => value,
            Err(response) => return response,
        };
        let pagination: Value = match serialize_or_500::<Pagination>(&pagination) {
            Ok(value) => value,
            Err(response) => return response,
        };
        Json(json!({
            "success": true,
            "count": count,
            "pagination": pagination,
            "data": data
        }))
        .into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;
