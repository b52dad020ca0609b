// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for driving the contact relay router end to end.
//!
//! Mail goes to an in-memory transport so tests can inspect what would have
//! been sent and inject provider failures.

#![allow(dead_code)]

pub mod generators;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use contact_relay::{
    config::{Config, MailConfig},
    handlers::{router, AppState},
    limiter::RateLimiter,
    mailer::{MailDispatcher, MailTransport, OutboundMessage, SendError},
    metrics::ContactMetrics,
    validator::ContactValidator,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

pub const OWNER: &str = "owner@example.com";

/// Transport that records messages instead of sending them.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutboundMessage>>,
    attempts: AtomicUsize,
    fail_on: Option<usize>,
}

impl RecordingTransport {
    /// Fail the `attempt`-th send (0-based) with a provider error.
    pub fn failing_on(attempt: usize) -> Self {
        Self {
            fail_on: Some(attempt),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<(), SendError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(attempt) {
            return Err(SendError::Transport(
                "454 4.7.0 Too many login attempts, please try again later".into(),
            ));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// A router wired to a recording transport.
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub transport: Arc<RecordingTransport>,
}

impl TestApp {
    /// Default configuration with credentials present.
    pub fn new() -> Self {
        Self::with(Config::default(), RecordingTransport::default(), true)
    }

    /// Default configuration without mail credentials.
    pub fn without_credentials() -> Self {
        Self::with(Config::default(), RecordingTransport::default(), false)
    }

    pub fn with_transport(transport: RecordingTransport) -> Self {
        Self::with(Config::default(), transport, true)
    }

    pub fn with(mut config: Config, transport: RecordingTransport, credentials: bool) -> Self {
        let transport = Arc::new(transport);
        let metrics = ContactMetrics::new().unwrap();

        config.mail = if credentials {
            MailConfig {
                user: Some(OWNER.into()),
                password: Some("app-password".into()),
                ..config.mail
            }
        } else {
            MailConfig {
                user: None,
                password: None,
                ..config.mail
            }
        };

        let dispatcher = credentials.then(|| {
            MailDispatcher::new(
                transport.clone(),
                OWNER,
                config.mail.owner_name.clone(),
                Duration::from_secs(5),
            )
            .with_metrics(metrics.clone())
        });

        let state = Arc::new(AppState {
            limiter: RateLimiter::new(config.rate_limit.clone()),
            validator: ContactValidator::new(config.validation.clone()),
            dispatcher,
            metrics,
            config,
        });

        Self {
            router: router(state.clone()),
            state,
            transport,
        }
    }

    pub async fn call(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// A well-formed submission body.
pub fn valid_body() -> serde_json::Value {
    serde_json::json!({
        "name": "Al",
        "email": "al@x.co",
        "subject": "Hi there",
        "message": "Hello, testing."
    })
}

/// POST a JSON body to the contact endpoint from `client`.
pub fn post_contact(body: &serde_json::Value, client: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/contact")
        .header("content-type", "application/json");
    if let Some(ip) = client {
        builder = builder.header("x-forwarded-for", ip);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
