//! Batch summaries posted to a chat webhook (Bitrix24 `im.notify`).
//!
//! Notification is fire-and-forget: a missing configuration or a failed post
//! is logged and never reaches the batch that triggered it.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::config::NotifyConfig;

const NOTIFY_TIMEOUT_SECS: u64 = 10;
const NOTIFY_METHOD: &str = "im.notify";

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Could not connect to webhook at {0}")]
    Connection(String),

    #[error("Webhook timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Webhook returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    SearchCompleted {
        matching: usize,
        total: usize,
        criteria: String,
    },
    LedgerUpdated {
        ledger_file: String,
        processed: usize,
        updated: usize,
    },
    Failure {
        operation: String,
        error: String,
    },
}

impl NotificationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SearchCompleted { .. } => "search_completed",
            Self::LedgerUpdated { .. } => "ledger_updated",
            Self::Failure { .. } => "error",
        }
    }

    /// Chat message body.
    pub fn message(&self) -> String {
        match self {
            Self::SearchCompleted {
                matching,
                total,
                criteria,
            } => format!(
                "Search results\n\nMatching files: {matching}\nTotal files: {total}\nSearch criteria: {criteria}\n"
            ),
            Self::LedgerUpdated {
                ledger_file,
                processed,
                updated,
            } => {
                let name = ledger_file.rsplit('/').next().unwrap_or(ledger_file);
                format!(
                    "Ledger processed\n\nLedger file: {name}\nFiles processed: {processed}\nRows added: {updated}\n"
                )
            }
            Self::Failure { operation, error } => {
                format!("An error occurred\n\nOperation: {operation}\nError: {error}\n")
            }
        }
    }
}

/// Receives batch summaries. Implementations must not fail the caller.
pub trait NotificationSink {
    fn notify(&self, event: &NotificationEvent);
}

/// Sink for deployments without a webhook.
pub struct NoopNotifier;

impl NotificationSink for NoopNotifier {
    fn notify(&self, event: &NotificationEvent) {
        tracing::debug!(event = event.kind(), "Notification dropped (no webhook configured)");
    }
}

/// Keeps every event in memory. Used by batch tests.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, event: &NotificationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Who receives the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyTarget {
    Chat(String),
    User(u64),
}

impl NotifyTarget {
    /// Chat id wins over user id; `None` when neither is set.
    pub fn from_config(config: &NotifyConfig) -> Option<Self> {
        match (&config.chat_id, config.user_id) {
            (Some(chat), _) if !chat.trim().is_empty() => Some(Self::Chat(chat.trim().to_string())),
            (_, Some(user)) => Some(Self::User(user)),
            _ => None,
        }
    }

    /// Value of the `to` parameter: `chat<ID>` for chats, the numeric id for users.
    pub fn to_param(&self) -> serde_json::Value {
        match self {
            Self::Chat(id) => serde_json::Value::String(format!("chat{id}")),
            Self::User(id) => serde_json::Value::from(*id),
        }
    }
}

#[derive(Debug, Serialize)]
struct NotifyRequest<'a> {
    to: serde_json::Value,
    message: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

pub struct WebhookNotifier {
    endpoint: String,
    target: NotifyTarget,
    client: reqwest::blocking::Client,
}

impl WebhookNotifier {
    pub fn new(webhook_url: &str, target: NotifyTarget) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(NOTIFY_TIMEOUT_SECS))
            .build()
            .map_err(|e| NotifyError::HttpClient(e.to_string()))?;

        Ok(Self {
            endpoint: format!("{}/{NOTIFY_METHOD}", webhook_url.trim_end_matches('/')),
            target,
            client,
        })
    }

    /// `None` (with a warning) when the webhook URL or the target is missing.
    pub fn from_config(config: &NotifyConfig) -> Option<Self> {
        let Some(url) = config.webhook_url.as_deref().filter(|u| !u.trim().is_empty()) else {
            tracing::warn!("Webhook URL not configured, notifications disabled");
            return None;
        };
        let Some(target) = NotifyTarget::from_config(config) else {
            tracing::warn!("No notification target configured, notifications disabled");
            return None;
        };
        match Self::new(url, target) {
            Ok(notifier) => Some(notifier),
            Err(e) => {
                tracing::warn!(error = %e, "Webhook client could not be built");
                None
            }
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn payload(&self, event: &NotificationEvent) -> serde_json::Value {
        let message = event.message();
        serde_json::to_value(NotifyRequest {
            to: self.target.to_param(),
            message: &message,
            kind: "SYSTEM",
        })
        .unwrap_or_default()
    }

    pub fn send(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.payload(event))
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    NotifyError::Connection(self.endpoint.clone())
                } else if e.is_timeout() {
                    NotifyError::Timeout(NOTIFY_TIMEOUT_SECS)
                } else {
                    NotifyError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

impl NotificationSink for WebhookNotifier {
    fn notify(&self, event: &NotificationEvent) {
        match self.send(event) {
            Ok(()) => tracing::info!(event = event.kind(), "Notification sent"),
            Err(e) => tracing::warn!(event = event.kind(), error = %e, "Notification failed"),
        }
    }
}

/// Webhook sink when configured, otherwise [`NoopNotifier`].
pub fn notifier_from_config(config: &NotifyConfig) -> Box<dyn NotificationSink> {
    match WebhookNotifier::from_config(config) {
        Some(webhook) => Box::new(webhook),
        None => Box::new(NoopNotifier),
    }
}
