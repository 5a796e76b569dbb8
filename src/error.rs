// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the HTML pastebin.
//!
//! Every failure is turned into a structured JSON body at the request
//! boundary. Storage failures are logged in full but only reported to the
//! caller as a generic message.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

/// Malformed names or content.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Site name must match [A-Za-z0-9_-]+, got {0:?}")]
    InvalidName(String),

    #[error("Site name is longer than {max} characters")]
    NameTooLong { max: usize },

    #[error("Site name {0:?} is reserved")]
    ReservedName(String),

    #[error("Source and destination names are identical")]
    SameName,

    #[error("HTML is missing required tag {0}")]
    MissingTag(&'static str),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

/// Application error types.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Site name {0:?} is already taken")]
    NameTaken(String),

    #[error("Site {0:?} already exists")]
    AlreadyExists(String),

    #[error("Site {0:?} not found")]
    NotFound(String),

    #[error("Content is {actual} bytes, the limit is {limit} bytes")]
    PayloadTooLarge { limit: usize, actual: usize },

    #[error("Request body is too large")]
    BodyTooLarge,

    #[error("Too many requests, please wait before trying again")]
    RateLimited { retry_after: Duration },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Could not find a free site name after {attempts} attempts")]
    NamesExhausted { attempts: u32 },

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T, E = SiteError> = std::result::Result<T, E>;

/// Error response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl SiteError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NameTaken(_) | Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge { .. } | Self::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NamesExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code, also used as the rejection metric label.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::NameTaken(_) => "NAME_TAKEN",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::NotFound(_) => "NOT_FOUND",
            Self::PayloadTooLarge { .. } | Self::BodyTooLarge => "PAYLOAD_TOO_LARGE",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NamesExhausted { .. } => "NAMES_EXHAUSTED",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to the caller.
    pub fn public_message(&self) -> String {
        match self {
            Self::Storage(_) => "Failed to access site storage".to_string(),
            Self::Internal(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }

    /// Map a filesystem error for `name` onto the store's taxonomy.
    pub(crate) fn from_io(err: std::io::Error, name: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(name.to_string()),
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists(name.to_string()),
            _ => Self::Storage(err),
        }
    }
}

impl From<JsonRejection> for SiteError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::BodyTooLarge
        } else {
            ValidationError::MalformedRequest(rejection.body_text()).into()
        }
    }
}

impl From<PathRejection> for SiteError {
    fn from(rejection: PathRejection) -> Self {
        ValidationError::MalformedRequest(rejection.body_text()).into()
    }
}

/// Whole seconds a client should wait, rounded up.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0)
}

impl IntoResponse for SiteError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Storage(_) | Self::Internal(_)) {
            error!(error = %self, "Request failed");
        }

        let status = self.status();
        let body = ErrorResponse {
            error: self.public_message(),
            code: self.code(),
            retry_after_secs: match &self {
                Self::RateLimited { retry_after } => Some(retry_after_secs(*retry_after)),
                _ => None,
            },
        };

        match body.retry_after_secs {
            Some(secs) => (
                status,
                [(header::RETRY_AFTER, secs.to_string())],
                Json(body),
            )
                .into_response(),
            None => (status, Json(body)).into_response(),
        }
    }
}
