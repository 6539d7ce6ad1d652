// --------------------------------------------------
// Error taxonomy shared by validation, the store and the HTTP handlers.
//
// Every variant except `Internal` is a client mistake and is reported
// verbatim. `Internal` is logged and answered with a generic body.
// --------------------------------------------------

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::store::StoreError;

pub const INTERNAL_MESSAGE: &str = "Internal server error";
pub const RANGE_MESSAGE: &str = "End time must be after start time";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required fields")]
    MissingField(Vec<String>),

    #[error("{0}")]
    InvalidDate(String),

    #[error("{0}")]
    InvalidRange(String),

    #[error("Title must be between 1 and 100 characters")]
    InvalidLength,

    #[error("Invalid color format. Must be a valid hex color (e.g., #4285f4)")]
    InvalidColor,

    #[error("{0}")]
    InvalidType(String),

    #[error("Both startDate and endDate are required for date range filtering")]
    IncompleteRange,

    #[error("Event not found")]
    NotFound,

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("internal fault: {0}")]
    Internal(#[source] StoreError),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::InvalidDate(_) => "invalid_date",
            Self::InvalidRange(_) => "invalid_range",
            Self::InvalidLength => "invalid_length",
            Self::InvalidColor => "invalid_color",
            Self::InvalidType(_) => "invalid_type",
            Self::IncompleteRange => "incomplete_range",
            Self::NotFound => "not_found",
            Self::MalformedBody(_) => "malformed_body",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::NotFound,
            StoreError::InvalidRange => Self::InvalidRange(RANGE_MESSAGE.to_string()),
            other => Self::Internal(other),
        }
    }
}

/// JSON body sent for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            Self::Internal(source) => {
                // Detail stays in the log only.
                tracing::error!(error = %source, "store operation failed");
                ErrorBody {
                    error: INTERNAL_MESSAGE.to_string(),
                    code: self.code(),
                    details: None,
                }
            }
            Self::MissingField(fields) => {
                let details: Map<String, Value> = fields
                    .iter()
                    .map(|f| (f.clone(), Value::String(format!("{f} is required"))))
                    .collect();
                ErrorBody {
                    error: self.to_string(),
                    code: self.code(),
                    details: Some(Value::Object(details)),
                }
            }
            _ => ErrorBody {
                error: self.to_string(),
                code: self.code(),
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Answer for a handler that panicked; installed through `CatchPanicLayer`.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "request handler panicked");

    let body = ErrorBody {
        error: INTERNAL_MESSAGE.to_string(),
        code: "internal_error",
        details: None,
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}
