// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact relay service.
//!
//! The contact endpoint accepts every method and gates them itself:
//! preflight, method check, rate limit, validation, credentials, dispatch.

use crate::config::Config;
use crate::error::{ContactError, Result};
use crate::limiter::{client_id, RateLimitResult, RateLimiter};
use crate::mailer::MailDispatcher;
use crate::metrics::{ContactMetrics, SubmissionOutcome};
use crate::validator::{ContactSubmission, ContactValidator};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

pub const SUCCESS_MESSAGE: &str = "Message sent successfully!";
pub const MALFORMED_BODY: &str = "Request body must be a JSON object";

const ALLOW_METHODS: &str = "GET,OPTIONS,PATCH,DELETE,POST,PUT";
const ALLOW_HEADERS: &str = "X-CSRF-Token, X-Requested-With, Accept, Accept-Version, \
    Content-Length, Content-MD5, Content-Type, Date, X-Api-Version";

/// Shared application state.
pub struct AppState {
    pub limiter: RateLimiter,
    pub validator: ContactValidator,
    /// `None` when the mail credentials are not configured.
    pub dispatcher: Option<MailDispatcher>,
    pub metrics: ContactMetrics,
    pub config: Config,
}

/// Successful submission response.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Diagnostics response. Reports whether credentials are present, never
/// their values.
#[derive(Debug, Serialize)]
pub struct DiagnosticsResponse {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: String,
    pub environment: EnvironmentCheck,
}

#[derive(Debug, Serialize)]
pub struct EnvironmentCheck {
    #[serde(rename = "EMAIL_USER")]
    pub email_user: &'static str,
    #[serde(rename = "EMAIL_PASS")]
    pub email_pass: &'static str,
}

/// Build the service router with tracing and CORS response headers.
pub fn router(state: Arc<AppState>) -> Router {
    let allow_origin = HeaderValue::from_str(&state.config.cors.allow_origin).unwrap_or_else(|_| {
        warn!(
            origin = %state.config.cors.allow_origin,
            "Invalid CORS origin, falling back to *"
        );
        HeaderValue::from_static("*")
    });

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/test", get(diagnostics).options(preflight))
        .route("/api/test", get(diagnostics).options(preflight))
        .route("/contact", any(contact))
        .route("/api/contact", any(contact));

    if state.config.metrics.enabled {
        router = router.route(&state.config.metrics.path, get(metrics));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors_header(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        ))
        .layer(cors_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin))
        .layer(cors_header(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ))
        .layer(cors_header(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ))
        .with_state(state)
}

fn cors_header(name: HeaderName, value: HeaderValue) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(name, value)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "contact-relay",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Liveness plus credential presence.
pub async fn diagnostics(State(state): State<Arc<AppState>>) -> Json<DiagnosticsResponse> {
    let presence = |value: &Option<String>| match value.as_deref() {
        Some(v) if !v.is_empty() => "Set",
        _ => "Not Set",
    };

    Json(DiagnosticsResponse {
        success: true,
        message: "Test endpoint working!",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        environment: EnvironmentCheck {
            email_user: presence(&state.config.mail.user),
            email_pass: presence(&state.config.mail.password),
        },
    })
}

/// Empty success for CORS preflight.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.encode() {
        Ok((content_type, body)) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Contact form submission endpoint.
pub async fn contact(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return preflight().await.into_response();
    }

    let client_id = client_id(&headers);
    match submit(&state, &method, &client_id, &body).await {
        Ok(()) => {
            state.metrics.record_submission(SubmissionOutcome::Sent);
            info!(client_id = %client_id, outcome = "sent", "Submission relayed");
            (
                StatusCode::OK,
                Json(SuccessResponse {
                    success: true,
                    message: SUCCESS_MESSAGE,
                }),
            )
                .into_response()
        }
        Err(err) => {
            let outcome = err.outcome();
            state.metrics.record_submission(outcome);
            match &err {
                ContactError::Configuration(_) | ContactError::Send(_) => {
                    error!(client_id = %client_id, outcome = outcome.as_str(), error = %err, "Submission failed")
                }
                _ => info!(client_id = %client_id, outcome = outcome.as_str(), "Submission rejected"),
            }
            err.into_response()
        }
    }
}

async fn submit(state: &AppState, method: &Method, client_id: &str, body: &[u8]) -> Result<()> {
    if *method != Method::POST {
        return Err(ContactError::MethodNotAllowed);
    }

    if let RateLimitResult::Limited { retry_after } = state.limiter.check(client_id).await {
        return Err(ContactError::RateLimited {
            client_id: client_id.to_string(),
            retry_after,
        });
    }

    let submission = parse_submission(body)?;
    let validation = state.validator.validate(&submission);
    if !validation.is_valid() {
        let details = validation.messages();
        debug!(client_id, errors = ?details, "Invalid submission");
        return Err(ContactError::Validation(details));
    }

    let Some(dispatcher) = state.dispatcher.as_ref() else {
        let missing = state.config.mail.missing_credentials().join(", ");
        return Err(ContactError::Configuration(format!(
            "missing environment variables: {missing}"
        )));
    };

    dispatcher.dispatch(&submission).await?;
    Ok(())
}

/// Parse the body as a JSON object of string fields.
fn parse_submission(body: &[u8]) -> Result<ContactSubmission> {
    let malformed = || ContactError::Validation(vec![MALFORMED_BODY.to_string()]);

    let value: serde_json::Value = serde_json::from_slice(body).map_err(|_| malformed())?;
    if !value.is_object() {
        return Err(malformed());
    }
    serde_json::from_value(value).map_err(|_| malformed())
}
