//! Best-effort progress notifications to the Poke inbox
//!
//! Delivery failures are logged and reported as [`NotifyOutcome::Swallowed`];
//! they never fail the operation that triggered them. There is no retry.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::NotifierConfig;

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub message: String,
    pub thread_ref: Option<String>,
    pub attachments: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            thread_ref: None,
            attachments: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_thread_ref(mut self, thread_ref: Option<String>) -> Self {
        self.thread_ref = thread_ref;
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<String>) -> Self {
        self.attachments = attachments;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Delivered,
    /// No API key configured
    Skipped,
    /// Delivery failed; the reason was logged
    Swallowed(String),
}

#[derive(Debug, Clone)]
pub struct Notifier {
    config: NotifierConfig,
    http: reqwest::Client,
}

impl Notifier {
    pub fn new(config: NotifierConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(NOTIFY_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client for notifications: {}", e);
                reqwest::Client::new()
            });
        Self { config, http }
    }

    pub fn disabled() -> Self {
        Self::new(NotifierConfig::disabled())
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Deliver one notification, awaiting the outcome
    pub async fn notify(&self, notification: &Notification) -> NotifyOutcome {
        let Some(api_key) = self.config.api_key() else {
            tracing::debug!("Notifier disabled; skipping: {}", notification.message);
            return NotifyOutcome::Skipped;
        };

        let result = self
            .http
            .post(&self.config.webhook_url)
            .bearer_auth(api_key)
            .json(notification)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("Notification delivered: {}", notification.message);
                NotifyOutcome::Delivered
            }
            Ok(response) => {
                let reason = format!("webhook returned HTTP {}", response.status().as_u16());
                tracing::warn!("Failed to send notification: {}", reason);
                NotifyOutcome::Swallowed(reason)
            }
            Err(e) => {
                tracing::warn!("Failed to send notification: {}", e);
                NotifyOutcome::Swallowed(e.to_string())
            }
        }
    }

    /// Fire and forget. Without a Tokio runtime the notification is
    /// dropped.
    pub fn dispatch(&self, notification: Notification) {
        if !self.is_enabled() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let notifier = self.clone();
                handle.spawn(async move {
                    notifier.notify(&notification).await;
                });
            }
            Err(_) => {
                tracing::warn!(
                    "No async runtime; dropping notification: {}",
                    notification.message
                );
            }
        }
    }
}
