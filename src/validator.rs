// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact submission validator.
//!
//! Every rule is checked independently; a submission collects one error per
//! violated rule, in field order (name, email, subject, message).

use crate::config::ValidationConfig;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

/// A contact form submission as received from the client.
///
/// Absent or `null` fields deserialize as empty strings so that they fail
/// their own rule instead of rejecting the whole body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactSubmission {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub subject: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single violated rule. The display text is safe to return to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Name must be at least {0} characters long")]
    NameTooShort(usize),

    #[error("Please provide a valid email address")]
    InvalidEmail,

    #[error("Subject must be at least {0} characters long")]
    SubjectTooShort(usize),

    #[error("Message must be at least {0} characters long")]
    MessageTooShort(usize),
}

/// Result of validation.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<FieldError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Human-readable messages, in rule order.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Contact submission validator.
pub struct ContactValidator {
    config: ValidationConfig,
}

impl ContactValidator {
    /// Create a new validator with the given configuration.
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Check all four fields. Pure; never short-circuits.
    pub fn validate(&self, submission: &ContactSubmission) -> ValidationResult {
        let mut errors = Vec::new();

        if trimmed_len(&submission.name) < self.config.min_name_len {
            errors.push(FieldError::NameTooShort(self.config.min_name_len));
        }

        if !is_valid_email(&submission.email) {
            errors.push(FieldError::InvalidEmail);
        }

        if trimmed_len(&submission.subject) < self.config.min_subject_len {
            errors.push(FieldError::SubjectTooShort(self.config.min_subject_len));
        }

        // A present message is required even when the minimum is configured as zero.
        let min_message = self.config.min_message_len.max(1);
        if trimmed_len(&submission.message) < min_message {
            errors.push(FieldError::MessageTooShort(min_message));
        }

        if !errors.is_empty() {
            debug!(violations = errors.len(), "Submission failed validation");
        }

        ValidationResult { errors }
    }
}

fn trimmed_len(value: &str) -> usize {
    value.trim().chars().count()
}

/// Permissive syntactic check: `local@domain.tld` with no whitespace and a
/// single `@`. Not RFC 5322.
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static email pattern"))
        .is_match(email)
}
