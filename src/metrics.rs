// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for submissions and outbound mail.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Terminal outcome of one request to the contact endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Sent,
    RateLimited,
    Invalid,
    Misconfigured,
    SendFailed,
    MethodNotAllowed,
}

impl SubmissionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::RateLimited => "rate_limited",
            Self::Invalid => "invalid",
            Self::Misconfigured => "misconfigured",
            Self::SendFailed => "send_failed",
            Self::MethodNotAllowed => "method_not_allowed",
        }
    }
}

/// Counters exposed on the metrics endpoint. Cloning shares the counters.
#[derive(Clone)]
pub struct ContactMetrics {
    registry: Registry,
    submissions: IntCounterVec,
    mail_sends: IntCounterVec,
}

impl ContactMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let submissions = IntCounterVec::new(
            Opts::new(
                "contact_submissions_total",
                "Contact endpoint requests by terminal outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(submissions.clone()))?;

        let mail_sends = IntCounterVec::new(
            Opts::new(
                "contact_mail_sends_total",
                "Outbound mail attempts by message kind and result",
            ),
            &["kind", "result"],
        )?;
        registry.register(Box::new(mail_sends.clone()))?;

        Ok(Self {
            registry,
            submissions,
            mail_sends,
        })
    }

    pub fn record_submission(&self, outcome: SubmissionOutcome) {
        self.submissions
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    pub fn record_send(&self, kind: &str, ok: bool) {
        let result = if ok { "ok" } else { "error" };
        self.mail_sends.with_label_values(&[kind, result]).inc();
    }

    pub fn submissions(&self, outcome: SubmissionOutcome) -> u64 {
        self.submissions
            .with_label_values(&[outcome.as_str()])
            .get()
    }

    pub fn mail_sends(&self, kind: &str, ok: bool) -> u64 {
        let result = if ok { "ok" } else { "error" };
        self.mail_sends.with_label_values(&[kind, result]).get()
    }

    /// Encode all metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<(String, Vec<u8>), prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok((encoder.format_type().to_string(), buffer))
    }
}
