// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Relay
//!
//! This crate relays portfolio contact-form submissions to the site owner's
//! inbox:
//!
//! - Fixed-window rate limiting per client address (5 per 15 minutes default)
//! - Field validation with accumulated, user-facing error messages
//! - Owner notification followed by a submitter confirmation over SMTP
//! - Permissive CORS headers and a preflight short-circuit

pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod mailer;
pub mod metrics;
pub mod validator;

pub use config::Config;
pub use error::ContactError;
pub use handlers::{router, AppState};
pub use limiter::{RateLimitResult, RateLimitStore, RateLimiter};
pub use mailer::{MailDispatcher, MailTransport, OutboundMessage, SendError};
pub use validator::{ContactSubmission, ContactValidator, ValidationResult};
