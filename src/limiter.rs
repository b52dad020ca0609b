// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window rate limiter for contact submissions.
//!
//! Each client identifier gets `max_requests` submissions per window. The
//! first request after a window expires opens a new window with a count of 1.
//!
//! Counting lives behind [`RateLimitStore`]. [`InMemoryRateLimitStore`] only
//! enforces the quota within a single process; deployments running several
//! instances need a store backed by a shared cache with atomic
//! increment-and-expire.

use crate::clock::{Clock, SystemClock};
use crate::config::RateLimitConfig;
use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Client identifier used when no forwarding header is present. All such
/// clients share one quota.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Counter state for one client within its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

/// Outcome of [`RateLimitStore::check_and_increment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Counted against the window; `count` includes this request.
    Allowed { count: u32, reset_at: DateTime<Utc> },
    /// Quota already used up; nothing was recorded.
    Denied { reset_at: DateTime<Utc> },
}

/// Shared counter keyed by client identity with expiry.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one request for `key`, opening a fresh window of `window` if none
    /// is active. Denies without incrementing once `quota` is reached.
    async fn check_and_increment(
        &self,
        key: &str,
        quota: u32,
        window: Duration,
    ) -> RateLimitDecision;

    /// Drop expired records. Returns how many were removed.
    async fn sweep(&self) -> usize {
        0
    }
}

/// Process-local store. Memory is bounded by `max_entries`.
pub struct InMemoryRateLimitStore<C: Clock = SystemClock> {
    clock: C,
    max_entries: usize,
    records: RwLock<HashMap<String, RateLimitRecord>>,
}

impl InMemoryRateLimitStore<SystemClock> {
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(SystemClock, max_entries)
    }
}

impl<C: Clock> InMemoryRateLimitStore<C> {
    pub fn with_clock(clock: C, max_entries: usize) -> Self {
        Self {
            clock,
            max_entries: max_entries.max(1),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Current record for `key`, expired or not.
    pub async fn get(&self, key: &str) -> Option<RateLimitRecord> {
        self.records.read().await.get(key).copied()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Free a slot for a new key: drop expired records, then the record
    /// closest to expiry if the table is still full.
    fn make_room(&self, records: &mut HashMap<String, RateLimitRecord>, now: DateTime<Utc>) {
        records.retain(|_, record| now <= record.reset_at);
        if records.len() < self.max_entries {
            return;
        }

        let oldest = records
            .iter()
            .min_by_key(|(_, record)| record.reset_at)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            warn!(
                client_id = %key,
                max_entries = self.max_entries,
                "Rate limit table full, evicting active record"
            );
            records.remove(&key);
        }
    }
}

#[async_trait]
impl<C: Clock> RateLimitStore for InMemoryRateLimitStore<C> {
    async fn check_and_increment(
        &self,
        key: &str,
        quota: u32,
        window: Duration,
    ) -> RateLimitDecision {
        let now = self.clock.now();
        let mut records = self.records.write().await;

        if let Some(record) = records.get_mut(key) {
            if now <= record.reset_at {
                if record.count >= quota {
                    return RateLimitDecision::Denied {
                        reset_at: record.reset_at,
                    };
                }
                record.count += 1;
                return RateLimitDecision::Allowed {
                    count: record.count,
                    reset_at: record.reset_at,
                };
            }
        } else if records.len() >= self.max_entries {
            self.make_room(&mut records, now);
        }

        let window = ChronoDuration::from_std(window).unwrap_or_else(|_| ChronoDuration::days(1));
        let reset_at = now + window;
        records.insert(key.to_string(), RateLimitRecord { count: 1, reset_at });
        RateLimitDecision::Allowed { count: 1, reset_at }
    }

    async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| now <= record.reset_at);
        before - records.len()
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Remaining requests in current window
        remaining: u32,
    },
    /// Request is rate limited
    Limited {
        /// Hint for the caller; always the full window length
        retry_after: Duration,
    },
}

/// Applies the configured quota to a [`RateLimitStore`].
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    /// Create a rate limiter backed by an in-process table.
    pub fn new(config: RateLimitConfig) -> Self {
        let store = Arc::new(InMemoryRateLimitStore::new(config.max_entries));
        Self { config, store }
    }

    /// Create a rate limiter over an arbitrary store, e.g. a shared cache.
    pub fn with_store(config: RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self { config, store }
    }

    /// Count a submission from `client_id`.
    pub async fn check(&self, client_id: &str) -> RateLimitResult {
        let decision = self
            .store
            .check_and_increment(
                client_id,
                self.config.max_requests,
                self.config.window_duration(),
            )
            .await;

        match decision {
            RateLimitDecision::Allowed { count, .. } => RateLimitResult::Allowed {
                remaining: self.config.max_requests.saturating_sub(count),
            },
            RateLimitDecision::Denied { reset_at } => {
                let retry_after = self.config.window_duration();
                debug!(
                    client_id,
                    %reset_at,
                    retry_after_secs = retry_after.as_secs(),
                    "Client rate limit exceeded"
                );
                RateLimitResult::Limited { retry_after }
            }
        }
    }

    /// Clean up expired entries (should be called periodically).
    pub async fn cleanup(&self) -> usize {
        let removed = self.store.sweep().await;
        if removed > 0 {
            debug!(removed, "Swept expired rate limit records");
        }
        removed
    }
}

/// Derive the rate-limit key from request headers: first `X-Forwarded-For`
/// hop, then `X-Real-IP`, then [`UNKNOWN_CLIENT`].
pub fn client_id(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
