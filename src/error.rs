// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the contact endpoint and their HTTP mapping.
//!
//! Validation details are returned verbatim. Configuration and delivery
//! failures get a fixed message; their cause only goes to the log.

use crate::mailer::SendError;
use crate::metrics::SubmissionOutcome;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub const INVALID_INPUT: &str = "Invalid input";
pub const METHOD_NOT_ALLOWED: &str = "Method not allowed";
pub const TOO_MANY_REQUESTS: &str = "Too many requests. Please try again later.";
pub const CONFIGURATION_FAILURE: &str =
    "Server configuration error. Please contact the administrator.";
pub const DELIVERY_FAILURE: &str = "Failed to send message. Please try again later.";

/// Application error types
#[derive(Debug, Error)]
pub enum ContactError {
    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("rate limit exceeded for {client_id}")]
    RateLimited {
        client_id: String,
        retry_after: Duration,
    },

    #[error("invalid input: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("server misconfigured: {0}")]
    Configuration(String),

    #[error(transparent)]
    Send(#[from] SendError),
}

impl ContactError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Configuration(_) | Self::Send(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn outcome(&self) -> SubmissionOutcome {
        match self {
            Self::MethodNotAllowed => SubmissionOutcome::MethodNotAllowed,
            Self::RateLimited { .. } => SubmissionOutcome::RateLimited,
            Self::Validation(_) => SubmissionOutcome::Invalid,
            Self::Configuration(_) => SubmissionOutcome::Misconfigured,
            Self::Send(_) => SubmissionOutcome::SendFailed,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ErrorResponse {
    fn message(error: &'static str) -> Self {
        Self {
            error,
            details: None,
            retry_after: None,
        }
    }
}

impl IntoResponse for ContactError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::MethodNotAllowed => {
                (status, Json(ErrorResponse::message(METHOD_NOT_ALLOWED))).into_response()
            }
            Self::RateLimited { retry_after, .. } => {
                let retry_secs = retry_after.as_secs();
                (
                    status,
                    [(header::RETRY_AFTER, retry_secs.to_string())],
                    Json(ErrorResponse {
                        retry_after: Some(retry_secs),
                        ..ErrorResponse::message(TOO_MANY_REQUESTS)
                    }),
                )
                    .into_response()
            }
            Self::Validation(details) => (
                status,
                Json(ErrorResponse {
                    details: Some(details),
                    ..ErrorResponse::message(INVALID_INPUT)
                }),
            )
                .into_response(),
            Self::Configuration(_) => {
                (status, Json(ErrorResponse::message(CONFIGURATION_FAILURE))).into_response()
            }
            Self::Send(_) => {
                (status, Json(ErrorResponse::message(DELIVERY_FAILURE))).into_response()
            }
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ContactError>;
