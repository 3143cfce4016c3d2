// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP error mapping.
//!
//! Handlers return `Result<_, ApiError>`; internal error details are
//! logged but never leak into 5xx response bodies.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kioku_core::KiokuError;
use serde_json::json;
use tracing::error;

/// An error ready to be rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: message.into(),
        }
    }

    pub fn unsupported_media_type(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
            message: message.into(),
        }
    }
}

impl From<KiokuError> for ApiError {
    fn from(err: KiokuError) -> Self {
        match err {
            KiokuError::Unavailable { service } => Self {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: format!("{service} is not configured"),
            },
            KiokuError::Validation(message) => Self {
                status: StatusCode::BAD_REQUEST,
                message,
            },
            other => {
                error!(error = %other, "internal error while handling request");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "internal server error".to_string(),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
