// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact relay.
//!
//! Everything is read from the process environment at startup. Only the two
//! mail secrets lack defaults; without them the service still starts but
//! answers every valid submission with a configuration error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Configuration for the contact relay service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:3001)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Validation configuration
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Mail transport configuration
    #[serde(default)]
    pub mail: MailConfig,

    /// Response header configuration
    #[serde(default)]
    pub cors: CorsConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per client per window (default: 5)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds (default: 900)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Upper bound on tracked client identifiers (default: 10000)
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Interval of the background sweep in seconds (default: 60)
    #[serde(default = "default_sweep_secs")]
    pub sweep_interval_secs: u64,
}

/// Minimum trimmed lengths for submission fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_min_name")]
    pub min_name_len: usize,

    #[serde(default = "default_min_subject")]
    pub min_subject_len: usize,

    #[serde(default = "default_min_message")]
    pub min_message_len: usize,
}

/// Mail provider settings.
///
/// `user` doubles as the site owner's inbox and the `from` address of both
/// outbound messages.
#[derive(Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// Per-send timeout in seconds (default: 30)
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Name used to sign the confirmation message
    #[serde(default = "default_owner_name")]
    pub owner_name: String,
}

/// Credentials for the mail provider. Both parts are guaranteed non-empty.
#[derive(Clone)]
pub struct MailCredentials {
    pub user: String,
    pub password: String,
}

/// Values for the permissive CORS headers set on every response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_allow_origin")]
    pub allow_origin: String,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    15 * 60
}

fn default_max_entries() -> usize {
    10_000
}

fn default_sweep_secs() -> u64 {
    60
}

fn default_min_name() -> usize {
    2
}

fn default_min_subject() -> usize {
    5
}

fn default_min_message() -> usize {
    10
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    465
}

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_owner_name() -> String {
    "Kaushikee Bhatt".to_string()
}

fn default_allow_origin() -> String {
    "*".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rate_limit: RateLimitConfig::default(),
            validation: ValidationConfig::default(),
            mail: MailConfig::default(),
            cors: CorsConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            max_entries: default_max_entries(),
            sweep_interval_secs: default_sweep_secs(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_name_len: default_min_name(),
            min_subject_len: default_min_subject(),
            min_message_len: default_min_message(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            user: None,
            password: None,
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            send_timeout_secs: default_send_timeout_secs(),
            owner_name: default_owner_name(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: default_allow_origin(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl MailConfig {
    /// Both credentials, or `None` if either is unset or empty.
    pub fn credentials(&self) -> Option<MailCredentials> {
        match (non_empty(&self.user), non_empty(&self.password)) {
            (Some(user), Some(password)) => Some(MailCredentials {
                user: user.to_string(),
                password: password.to_string(),
            }),
            _ => None,
        }
    }

    /// Names of the credential variables that are unset or empty.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if non_empty(&self.user).is_none() {
            missing.push("EMAIL_USER");
        }
        if non_empty(&self.password).is_none() {
            missing.push("EMAIL_PASS");
        }
        missing
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("send_timeout_secs", &self.send_timeout_secs)
            .field("owner_name", &self.owner_name)
            .finish()
    }
}

impl fmt::Debug for MailCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Unparseable numbers
    /// fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Config {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(default_bind_addr),
            rate_limit: RateLimitConfig {
                max_requests: parse_or(lookup("RATE_LIMIT_MAX_REQUESTS"), default_max_requests()),
                window_secs: parse_or(lookup("RATE_LIMIT_WINDOW_SECS"), default_window_secs()),
                max_entries: parse_or(lookup("RATE_LIMIT_MAX_ENTRIES"), default_max_entries()),
                sweep_interval_secs: parse_or(lookup("RATE_LIMIT_SWEEP_SECS"), default_sweep_secs()),
            },
            validation: ValidationConfig {
                min_subject_len: parse_or(lookup("VALIDATION_MIN_SUBJECT"), default_min_subject()),
                min_message_len: parse_or(lookup("VALIDATION_MIN_MESSAGE"), default_min_message()),
                ..Default::default()
            },
            mail: MailConfig {
                user: lookup("EMAIL_USER"),
                password: lookup("EMAIL_PASS"),
                smtp_host: lookup("SMTP_HOST").unwrap_or_else(default_smtp_host),
                smtp_port: parse_or(lookup("SMTP_PORT"), default_smtp_port()),
                send_timeout_secs: parse_or(
                    lookup("MAIL_SEND_TIMEOUT_SECS"),
                    default_send_timeout_secs(),
                ),
                owner_name: lookup("SITE_OWNER_NAME").unwrap_or_else(default_owner_name),
            },
            cors: CorsConfig {
                allow_origin: lookup("CORS_ALLOW_ORIGIN").unwrap_or_else(default_allow_origin),
            },
            metrics: MetricsConfig {
                enabled: parse_or(lookup("METRICS_ENABLED"), default_true()),
                ..Default::default()
            },
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
