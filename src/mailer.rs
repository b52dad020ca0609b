// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound mail for accepted submissions.
//!
//! Each accepted submission produces two messages, sent strictly in order:
//! a notification to the site owner (reply-to the submitter) and a
//! confirmation to the submitter. The confirmation is only attempted once
//! the notification has been accepted by the provider. No retries.

use crate::config::{MailConfig, MailCredentials};
use crate::metrics::ContactMetrics;
use crate::validator::ContactSubmission;
use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

/// Failure to hand a message to the mail provider. The text may contain
/// provider diagnostics and is for logs only.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("mail transport error: {0}")]
    Transport(String),

    #[error("send timed out after {0:?}")]
    Timeout(Duration),
}

/// A fully rendered message, independent of the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub from: String,
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

/// Which of the two per-submission messages is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Notification,
    Confirmation,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Notification => "notification",
            Self::Confirmation => "confirmation",
        }
    }
}

/// Hands a message to the mail provider and waits for its verdict.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), SendError>;
}

/// SMTP relay transport (implicit TLS) authenticated with the account
/// credentials.
pub struct SmtpMailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    /// Configure the relay. No connection is opened until the first send.
    pub fn new(config: &MailConfig, credentials: &MailCredentials) -> Result<Self, SendError> {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| SendError::Transport(e.to_string()))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                credentials.user.clone(),
                credentials.password.clone(),
            ))
            .timeout(Some(config.send_timeout()))
            .build();

        Ok(Self { mailer })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<(), SendError> {
        let email = to_lettre(message)?;
        let response = self
            .mailer
            .send(email)
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;
        debug!(code = %response.code(), "Provider accepted message");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, SendError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| SendError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Convert to a multipart/alternative lettre message.
pub(crate) fn to_lettre(message: &OutboundMessage) -> Result<Message, SendError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&message.from)?)
        .to(parse_mailbox(&message.to)?)
        .subject(message.subject.as_str());

    if let Some(reply_to) = &message.reply_to {
        builder = builder.reply_to(parse_mailbox(reply_to)?);
    }

    builder
        .multipart(MultiPart::alternative_plain_html(
            message.text_body.clone(),
            message.html_body.clone(),
        ))
        .map_err(|e| SendError::Build(e.to_string()))
}

/// Composes and sends the two messages for a submission.
pub struct MailDispatcher {
    transport: Arc<dyn MailTransport>,
    owner_address: String,
    owner_name: String,
    send_timeout: Duration,
    metrics: Option<ContactMetrics>,
}

impl MailDispatcher {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        owner_address: impl Into<String>,
        owner_name: impl Into<String>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            owner_address: owner_address.into(),
            owner_name: owner_name.into(),
            send_timeout,
            metrics: None,
        }
    }

    /// Build a dispatcher over SMTP from configuration. `None` when either
    /// credential is missing.
    pub fn from_config(config: &MailConfig) -> Result<Option<Self>, SendError> {
        let Some(credentials) = config.credentials() else {
            return Ok(None);
        };
        let transport = SmtpMailTransport::new(config, &credentials)?;
        Ok(Some(Self::new(
            Arc::new(transport),
            credentials.user,
            config.owner_name.clone(),
            config.send_timeout(),
        )))
    }

    pub fn with_metrics(mut self, metrics: ContactMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Send the owner notification, then the submitter confirmation.
    ///
    /// A confirmation failure is still a failure even though the owner has
    /// already been notified; nothing is rolled back or retried.
    pub async fn dispatch(&self, submission: &ContactSubmission) -> Result<(), SendError> {
        let notification = compose_notification(&self.owner_address, submission);
        self.send(MessageKind::Notification, &notification).await?;

        let confirmation = compose_confirmation(&self.owner_address, &self.owner_name, submission);
        if let Err(e) = self.send(MessageKind::Confirmation, &confirmation).await {
            error!(
                error = %e,
                "Confirmation failed after owner notification was delivered"
            );
            return Err(e);
        }

        Ok(())
    }

    async fn send(&self, kind: MessageKind, message: &OutboundMessage) -> Result<(), SendError> {
        let result = match tokio::time::timeout(self.send_timeout, self.transport.send(message)).await
        {
            Ok(result) => result,
            Err(_) => Err(SendError::Timeout(self.send_timeout)),
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_send(kind.as_str(), result.is_ok());
        }

        match &result {
            Ok(()) => info!(kind = kind.as_str(), "Mail sent"),
            Err(e) => error!(kind = kind.as_str(), error = %e, "Mail send failed"),
        }
        result
    }
}

/// Message to the site owner with the submission contents.
pub fn compose_notification(owner: &str, submission: &ContactSubmission) -> OutboundMessage {
    let ContactSubmission {
        name,
        email,
        subject,
        message,
    } = submission;

    let html_body = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #333;">New Contact Form Submission</h2>
  <div style="background-color: #f5f5f5; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <p><strong>Name:</strong> {name}</p>
    <p><strong>Email:</strong> {email}</p>
    <p><strong>Subject:</strong> {subject}</p>
    <p><strong>Message:</strong></p>
    <div style="background-color: white; padding: 15px; border-radius: 5px; margin-top: 10px;">
      {message}
    </div>
  </div>
  <p style="color: #666; font-size: 12px;">
    This message was sent from your portfolio contact form.
  </p>
</div>"#,
        name = escape_html(name),
        email = escape_html(email),
        subject = escape_html(subject),
        message = escape_html(message).replace('\n', "<br>"),
    );

    let text_body = format!(
        "New Contact Form Submission\n\n\
         Name: {name}\n\
         Email: {email}\n\
         Subject: {subject}\n\n\
         Message:\n{message}\n\n\
         ---\n\
         This message was sent from your portfolio contact form.\n"
    );

    OutboundMessage {
        from: owner.to_string(),
        to: owner.to_string(),
        reply_to: Some(email.clone()),
        subject: format!("Portfolio Contact: {subject}"),
        html_body,
        text_body,
    }
}

/// Acknowledgement to the submitter.
pub fn compose_confirmation(
    owner: &str,
    owner_name: &str,
    submission: &ContactSubmission,
) -> OutboundMessage {
    let html_body = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #333;">Thank you for reaching out!</h2>
  <p>Hi {name},</p>
  <p>Thank you for contacting me through my portfolio. I've received your message and will get back to you within 24 hours.</p>
  <div style="background-color: #f5f5f5; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <p><strong>Your message:</strong></p>
    <p>{message}</p>
  </div>
  <p>Best regards,<br>{owner_name}</p>
</div>"#,
        name = escape_html(&submission.name),
        message = escape_html(&submission.message).replace('\n', "<br>"),
        owner_name = escape_html(owner_name),
    );

    let text_body = format!(
        "Thank you for reaching out!\n\n\
         Hi {name},\n\n\
         Thank you for contacting me through my portfolio. I've received your message and will get back to you within 24 hours.\n\n\
         Your message:\n{message}\n\n\
         Best regards,\n{owner_name}\n",
        name = submission.name,
        message = submission.message,
    );

    OutboundMessage {
        from: owner.to_string(),
        to: submission.email.clone(),
        reply_to: None,
        subject: "Thank you for contacting me!".to_string(),
        html_body,
        text_body,
    }
}

/// Escape text for interpolation into HTML element content or attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
