//! # Response Envelope
//!
//! Uniform success/error wrapping for all outward responses. The transport
//! layer serializes this as-is; `status` carries the HTTP code the error
//! kind maps to.

use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiResponse {
    fn success(status: u16, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            status,
            message: message.into(),
            data,
        }
    }

    /// 200 with a payload.
    pub fn ok(message: impl Into<String>, data: impl Serialize) -> Self {
        Self::success(200, message, Some(to_value(data)))
    }

    /// 200 without a payload.
    pub fn ok_empty(message: impl Into<String>) -> Self {
        Self::success(200, message, None)
    }

    /// 201 with the created entity.
    pub fn created(message: impl Into<String>, data: impl Serialize) -> Self {
        Self::success(201, message, Some(to_value(data)))
    }

    pub fn from_error(err: &AppError) -> Self {
        Self {
            success: false,
            status: err.status(),
            message: err.to_string(),
            data: None,
        }
    }
}

fn to_value(data: impl Serialize) -> Value {
    serde_json::to_value(data).unwrap_or(Value::Null)
}

/// Folds an engine result into the envelope, `201 Created` on success.
pub fn envelope_created<T: Serialize>(
    message: &str,
    result: crate::error::Result<T>,
) -> ApiResponse {
    match result {
        Ok(data) => ApiResponse::created(message, data),
        Err(err) => ApiResponse::from_error(&err),
    }
}

/// Folds an engine result into the envelope, `200 OK` on success.
pub fn envelope_ok<T: Serialize>(message: &str, result: crate::error::Result<T>) -> ApiResponse {
    match result {
        Ok(data) => ApiResponse::ok(message, data),
        Err(err) => ApiResponse::from_error(&err),
    }
}
