// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Relay Service
//!
//! Receives contact-form submissions, rate-limits them per client address,
//! validates the fields and forwards them to the site owner by email with a
//! confirmation to the submitter.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (and `.env`):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:3001)
//! - `EMAIL_USER` / `EMAIL_PASS`: mail account credentials (required to send)
//! - `RATE_LIMIT_MAX_REQUESTS`: submissions per window (default: 5)
//! - `RATE_LIMIT_WINDOW_SECS`: window length (default: 900)
//! - `VALIDATION_MIN_SUBJECT` / `VALIDATION_MIN_MESSAGE`: minimum lengths (default: 5 / 10)

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contact_relay::{
    config::Config,
    handlers::{router, AppState},
    limiter::RateLimiter,
    mailer::MailDispatcher,
    metrics::ContactMetrics,
    validator::ContactValidator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables first so `.env` can set RUST_LOG
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(log_filter(EnvFilter::DEFAULT_ENV))
        .init();

    let config = Config::from_env();
    info!(
        bind_addr = %config.bind_addr,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        min_subject = config.validation.min_subject_len,
        min_message = config.validation.min_message_len,
        smtp_host = %config.mail.smtp_host,
        "Starting contact relay"
    );

    let metrics = ContactMetrics::new()?;
    let dispatcher =
        MailDispatcher::from_config(&config.mail)?.map(|d| d.with_metrics(metrics.clone()));
    if dispatcher.is_none() {
        warn!(
            missing = ?config.mail.missing_credentials(),
            "Mail credentials not configured; submissions will be refused"
        );
    }

    let state = Arc::new(AppState {
        limiter: RateLimiter::new(config.rate_limit.clone()),
        validator: ContactValidator::new(config.validation.clone()),
        dispatcher,
        metrics,
        config: config.clone(),
    });

    // Spawn cleanup task
    let cleanup_state = state.clone();
    let sweep_every = config.rate_limit.sweep_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        loop {
            interval.tick().await;
            cleanup_state.limiter.cleanup().await;
        }
    });

    let app = router(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn log_filter(var: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .with_env_var(var)
        .from_env_lossy()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
