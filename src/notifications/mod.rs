pub mod telegram;

pub use telegram::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{error, info, warn};

/// Why the messaging API turned a message down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    Other,
}

impl RejectionKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => RejectionKind::BadRequest,
            401 => RejectionKind::Unauthorized,
            403 => RejectionKind::Forbidden,
            404 => RejectionKind::NotFound,
            429 => RejectionKind::RateLimited,
            _ => RejectionKind::Other,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RejectionKind::BadRequest => "bad request (chat not found or malformed markup)",
            RejectionKind::Unauthorized => "unauthorized (invalid bot token)",
            RejectionKind::Forbidden => "forbidden/wrong destination type",
            RejectionKind::NotFound => "not found (malformed bot token)",
            RejectionKind::RateLimited => "rate limited",
            RejectionKind::Other => "unexpected response",
        }
    }

    /// What the operator should check.
    pub fn hint(&self) -> &'static str {
        match self {
            RejectionKind::BadRequest => "check chat_id and that the bot was added to the chat",
            RejectionKind::Unauthorized => "regenerate the token with @BotFather and update bot_token",
            RejectionKind::Forbidden => {
                "the bot was blocked or chat_id points at another bot; start a chat with the bot or use a group/channel id"
            }
            RejectionKind::NotFound => "bot_token must look like <digits>:<secret>",
            RejectionKind::RateLimited => "reduce report frequency",
            RejectionKind::Other => "see the response body",
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification credentials are not configured")]
    NotConfigured,

    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("rejected with status {status}: {}", kind.description())]
    Rejected {
        status: u16,
        kind: RejectionKind,
        body: String,
    },
}

impl NotifyError {
    pub fn hint(&self) -> &'static str {
        match self {
            NotifyError::NotConfigured => "set notifications.bot_token and notifications.chat_id",
            NotifyError::Transport(_) => "check network access to the messaging API",
            NotifyError::Rejected { kind, .. } => kind.hint(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub status: u16,
    pub chars: usize,
}

/// Outbound chat channel.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// False when credentials are missing; callers skip sending entirely.
    fn is_configured(&self) -> bool;
    async fn send(&self, text: &str) -> Result<DeliveryReceipt, NotifyError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Detailed,
    Summary,
    Startup,
    Shutdown,
    Test,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Delivered,
    Failed(String),
}

/// One delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: MessageKind,
    pub outcome: Outcome,
}

impl Notification {
    pub fn new(kind: MessageKind, outcome: Outcome, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            kind,
            outcome,
        }
    }

    pub fn delivered(&self) -> bool {
        self.outcome == Outcome::Delivered
    }
}

/// Recent delivery attempts, newest first.
pub struct NotificationLog {
    entries: VecDeque<Notification>,
    max_entries: usize,
    delivered: u64,
    failed: u64,
}

impl NotificationLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
            delivered: 0,
            failed: 0,
        }
    }

    pub fn record(&mut self, notification: Notification) {
        if notification.delivered() {
            self.delivered += 1;
        } else {
            self.failed += 1;
        }
        self.entries.push_front(notification);
        self.entries.truncate(self.max_entries);
    }

    pub fn recent(&self, limit: usize) -> Vec<&Notification> {
        self.entries.iter().take(limit).collect()
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Sends `text` and logs the result; failures are reported, never raised.
pub async fn deliver<N>(
    notifier: &N,
    log: &mut NotificationLog,
    kind: MessageKind,
    text: &str,
    now: DateTime<Utc>,
) -> bool
where
    N: Notifier + ?Sized,
{
    let outcome = match notifier.send(text).await {
        Ok(receipt) => {
            info!("{:?} message delivered ({} chars)", kind, receipt.chars);
            Outcome::Delivered
        }
        Err(e @ NotifyError::Rejected { .. }) => {
            if let NotifyError::Rejected { body, .. } = &e {
                error!("{:?} message {}; response: {}", kind, e, body);
            }
            warn!("Hint: {}", e.hint());
            Outcome::Failed(e.to_string())
        }
        Err(e) => {
            error!("{:?} message not sent: {}", kind, e);
            warn!("Hint: {}", e.hint());
            Outcome::Failed(e.to_string())
        }
    };

    let notification = Notification::new(kind, outcome, now);
    let delivered = notification.delivered();
    log.record(notification);
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_classification() {
        assert_eq!(RejectionKind::from_status(403), RejectionKind::Forbidden);
        assert_eq!(RejectionKind::from_status(401), RejectionKind::Unauthorized);
        assert_eq!(RejectionKind::from_status(502), RejectionKind::Other);
        assert_eq!(
            RejectionKind::Forbidden.description(),
            "forbidden/wrong destination type"
        );
    }

    #[test]
    fn test_rejected_error_message() {
        let err = NotifyError::Rejected {
            status: 403,
            kind: RejectionKind::Forbidden,
            body: "{}".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "rejected with status 403: forbidden/wrong destination type"
        );
        assert!(err.hint().contains("blocked"));
    }

    #[test]
    fn test_log_is_bounded() {
        let mut log = NotificationLog::new(2);
        for _ in 0..3 {
            log.record(Notification::new(MessageKind::Summary, Outcome::Delivered, Utc::now()));
        }
        log.record(Notification::new(
            MessageKind::Detailed,
            Outcome::Failed("boom".to_string()),
            Utc::now(),
        ));

        assert_eq!(log.recent(10).len(), 2);
        assert_eq!(log.recent(1)[0].kind, MessageKind::Detailed);
        assert_eq!(log.delivered(), 3);
        assert_eq!(log.failed(), 1);
    }

    #[tokio::test]
    async fn test_deliver_records_failure() {
        let mut notifier = MockNotifier::new();
        notifier.expect_send().times(1).returning(|_| {
            Err(NotifyError::Rejected {
                status: 403,
                kind: RejectionKind::Forbidden,
                body: "Forbidden".to_string(),
            })
        });

        let mut log = NotificationLog::default();
        let ok = deliver(&notifier, &mut log, MessageKind::Summary, "text", Utc::now()).await;

        assert!(!ok);
        assert_eq!(log.failed(), 1);
        assert_eq!(
            log.recent(1)[0].outcome,
            Outcome::Failed("rejected with status 403: forbidden/wrong destination type".to_string())
        );
    }
}
