// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Integration tests for the contact endpoint.

mod harness;

use axum::http::{header, StatusCode};
use contact_relay::{
    config::{Config, ValidationConfig},
    error::{CONFIGURATION_FAILURE, DELIVERY_FAILURE, METHOD_NOT_ALLOWED, TOO_MANY_REQUESTS},
    metrics::SubmissionOutcome,
};
use harness::{
    body_bytes, body_json, post_contact, request, valid_body, RecordingTransport, TestApp, OWNER,
};
use serde_json::json;

#[tokio::test]
async fn test_valid_submission_sends_two_messages() {
    let app = TestApp::new();

    let response = app.call(post_contact(&valid_body(), Some("203.0.113.5"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "success": true, "message": "Message sent successfully!" })
    );

    let sent = app.transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, OWNER);
    assert_eq!(sent[0].reply_to.as_deref(), Some("al@x.co"));
    assert_eq!(sent[0].subject, "Portfolio Contact: Hi there");
    assert_eq!(sent[1].to, "al@x.co");
    assert_eq!(sent[1].subject, "Thank you for contacting me!");
}

#[tokio::test]
async fn test_preflight_bypasses_everything() {
    let app = TestApp::new();

    for _ in 0..10 {
        let response = app.call(request("OPTIONS", "/api/contact")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        assert!(body_bytes(response).await.is_empty());
    }

    // Preflights did not consume the quota of the shared "unknown" client.
    for _ in 0..5 {
        let response = app.call(post_contact(&valid_body(), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(app.transport.attempts(), 10);
}

#[tokio::test]
async fn test_non_post_methods_rejected() {
    let app = TestApp::new();

    for method in ["GET", "PUT", "DELETE", "PATCH"] {
        let response = app.call(request(method, "/contact")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(body_json(response).await, json!({ "error": METHOD_NOT_ALLOWED }));
    }
    assert_eq!(app.transport.attempts(), 0);
}

#[tokio::test]
async fn test_invalid_input_lists_every_violation() {
    let app = TestApp::new();
    let body = json!({ "name": "A", "email": "not-an-email", "subject": "Hey", "message": "short" });

    let response = app.call(post_contact(&body, Some("198.51.100.1"))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({
            "error": "Invalid input",
            "details": [
                "Name must be at least 2 characters long",
                "Please provide a valid email address",
                "Subject must be at least 5 characters long",
                "Message must be at least 10 characters long"
            ]
        })
    );
    assert_eq!(app.transport.attempts(), 0);
}

#[tokio::test]
async fn test_lenient_validation_policy_is_configurable() {
    let config = Config {
        validation: ValidationConfig {
            min_subject_len: 2,
            min_message_len: 1,
            ..Default::default()
        },
        ..Default::default()
    };
    let app = TestApp::with(config, RecordingTransport::default(), true);
    let body = json!({ "name": "Al", "email": "al@x.co", "subject": "Hi", "message": "?" });

    let response = app.call(post_contact(&body, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = TestApp::new();
    let response = app
        .call(
            axum::http::Request::builder()
                .method("POST")
                .uri("/contact")
                .body(axum::body::Body::from("name=Al&email=al@x.co"))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Invalid input", "details": ["Request body must be a JSON object"] })
    );
}

#[tokio::test]
async fn test_sixth_request_is_rate_limited() {
    let app = TestApp::new();

    for i in 0..5 {
        let response = app.call(post_contact(&valid_body(), Some("192.0.2.44"))).await;
        assert_eq!(response.status(), StatusCode::OK, "request {}", i + 1);
    }

    let response = app.call(post_contact(&valid_body(), Some("192.0.2.44"))).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "900");
    assert_eq!(
        body_json(response).await,
        json!({ "error": TOO_MANY_REQUESTS, "retryAfter": 900 })
    );
    assert_eq!(app.transport.sent().len(), 10);

    // Another client is unaffected.
    let response = app.call(post_contact(&valid_body(), Some("192.0.2.45"))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_applies_before_validation() {
    let app = TestApp::new();
    let invalid = json!({ "name": "", "email": "", "subject": "", "message": "" });

    for _ in 0..5 {
        let response = app.call(post_contact(&invalid, Some("192.0.2.60"))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = app.call(post_contact(&valid_body(), Some("192.0.2.60"))).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_missing_credentials_is_configuration_error() {
    let app = TestApp::without_credentials();

    let response = app.call(post_contact(&valid_body(), None)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({ "error": CONFIGURATION_FAILURE }));
    assert_eq!(app.transport.attempts(), 0);
    assert_eq!(
        app.state.metrics.submissions(SubmissionOutcome::Misconfigured),
        1
    );
}

#[tokio::test]
async fn test_invalid_input_reported_before_missing_credentials() {
    let app = TestApp::without_credentials();
    let response = app
        .call(post_contact(&json!({ "email": "al@x.co" }), None))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_notification_failure_skips_confirmation() {
    let app = TestApp::with_transport(RecordingTransport::failing_on(0));

    let response = app.call(post_contact(&valid_body(), None)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body, json!({ "error": DELIVERY_FAILURE }));
    assert!(!body.to_string().contains("454"), "provider detail leaked");
    assert_eq!(app.transport.attempts(), 1);
    assert!(app.transport.sent().is_empty());
}

#[tokio::test]
async fn test_confirmation_failure_reports_failure_after_owner_notified() {
    let app = TestApp::with_transport(RecordingTransport::failing_on(1));

    let response = app.call(post_contact(&valid_body(), None)).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({ "error": DELIVERY_FAILURE }));

    // The owner notification went out and is not compensated.
    let sent = app.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, OWNER);
    assert_eq!(
        app.state.metrics.submissions(SubmissionOutcome::SendFailed),
        1
    );
}

#[tokio::test]
async fn test_cors_headers_on_every_response() {
    let app = TestApp::new();

    let responses = vec![
        app.call(post_contact(&valid_body(), None)).await,
        app.call(request("GET", "/api/contact")).await,
        app.call(request("GET", "/health")).await,
    ];

    for response in responses {
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET,OPTIONS,PATCH,DELETE,POST,PUT"
        );
        assert!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
            .to_str()
            .unwrap()
            .contains("X-CSRF-Token"));
    }
}

#[tokio::test]
async fn test_diagnostics_reports_presence_only() {
    let app = TestApp::new();
    let response = app.call(request("GET", "/api/test")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["environment"], json!({ "EMAIL_USER": "Set", "EMAIL_PASS": "Set" }));
    assert!(body["timestamp"].as_str().is_some());
    assert!(!body.to_string().contains("app-password"));

    let app = TestApp::without_credentials();
    let body = body_json(app.call(request("GET", "/test")).await).await;
    assert_eq!(
        body["environment"],
        json!({ "EMAIL_USER": "Not Set", "EMAIL_PASS": "Not Set" })
    );
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new();
    let body = body_json(app.call(request("GET", "/health")).await).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "contact-relay");
}

#[tokio::test]
async fn test_metrics_endpoint_counts_outcomes() {
    let app = TestApp::new();
    app.call(post_contact(&valid_body(), None)).await;
    app.call(request("GET", "/contact")).await;

    let response = app.call(request("GET", "/metrics")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let text = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(text.contains(r#"contact_submissions_total{outcome="sent"} 1"#));
    assert!(text.contains(r#"contact_submissions_total{outcome="method_not_allowed"} 1"#));
    assert!(text.contains(r#"contact_mail_sends_total{kind="notification",result="ok"} 1"#));
}

#[tokio::test]
async fn test_metrics_endpoint_can_be_disabled() {
    let mut config = Config::default();
    config.metrics.enabled = false;
    let app = TestApp::with(config, RecordingTransport::default(), true);

    let response = app.call(request("GET", "/metrics")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
