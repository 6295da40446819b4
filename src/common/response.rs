// src/common/response.rs

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::common::pagination::Page;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub total_pages: u64,
    pub total: u64,
    pub limit: u32,
}

/// Envelope padrão de todas as respostas: `{success, message?, data?, pagination?}`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            pagination: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            pagination: None,
        }
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    pub fn paginated(page: Page<T>) -> Self {
        let pagination = PaginationMeta {
            page: page.page,
            total_pages: page.total_pages(),
            total: page.total,
            limit: page.limit,
        };
        Self {
            success: true,
            message: None,
            data: Some(page.items),
            pagination: Some(pagination),
        }
    }
}

impl ApiResponse<()> {
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            pagination: None,
        }
    }
}

// Atalhos usados pelos handlers
pub fn ok<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::OK, Json(ApiResponse::ok(data)))
}

pub fn created<T: Serialize>(data: T, message: &str) -> impl IntoResponse {
    (StatusCode::CREATED, Json(ApiResponse::with_message(data, message)))
}

pub fn ok_with_message<T: Serialize>(data: T, message: &str) -> impl IntoResponse {
    (StatusCode::OK, Json(ApiResponse::with_message(data, message)))
}

pub fn paginated<T: Serialize>(page: Page<T>) -> impl IntoResponse {
    (StatusCode::OK, Json(ApiResponse::paginated(page)))
}

pub fn ok_message(message: &str) -> impl IntoResponse {
    (StatusCode::OK, Json(ApiResponse::message_only(message)))
}
