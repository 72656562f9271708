use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::borrow::Cow;
use std::time::Duration;
use tracing::{debug, warn};

use super::{DeliveryReceipt, Notifier, NotifyError, RejectionKind};

pub const TELEGRAM_API: &str = "https://api.telegram.org";

/// Longest message body the Bot API accepts.
pub const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

/// Posts messages through the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    token: String,
    chat_id: String,
    base_url: String,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(NotifyError::Transport)?;

        Ok(Self {
            client,
            token: token.trim().to_string(),
            chat_id: chat_id.trim().to_string(),
            base_url: TELEGRAM_API.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url, self.token)
    }
}

const FENCE: &str = "```";
const FENCE_CLOSE: &str = "\n```";

/// Cuts `text` to at most `max_chars` characters.
///
/// The cut lands on the last line break that fits, and a code block left
/// open by the cut is closed so the Markdown still parses.
pub fn truncate_message(text: &str, max_chars: usize) -> Cow<'_, str> {
    if text.chars().count() <= max_chars {
        return Cow::Borrowed(text);
    }

    let budget = max_chars.saturating_sub(FENCE_CLOSE.len());
    let head = match text.char_indices().nth(budget) {
        Some((idx, _)) => &text[..idx],
        None => text,
    };
    let head = match head.rfind('\n') {
        Some(idx) => &head[..idx],
        None => head,
    };

    let mut cut = head.to_string();
    if head.matches(FENCE).count() % 2 == 1 {
        cut.push_str(FENCE_CLOSE);
    }
    Cow::Owned(cut)
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn is_configured(&self) -> bool {
        !self.token.is_empty() && !self.chat_id.is_empty()
    }

    async fn send(&self, text: &str) -> Result<DeliveryReceipt, NotifyError> {
        if !self.is_configured() {
            return Err(NotifyError::NotConfigured);
        }

        let body = truncate_message(text, MAX_MESSAGE_CHARS);
        let chars = body.chars().count();
        if let Cow::Owned(_) = body {
            warn!(
                "Message truncated to {} of {} characters",
                chars,
                text.chars().count()
            );
        }

        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: &body,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(NotifyError::Transport)?;

        let status = response.status();
        if status == StatusCode::OK {
            debug!("Message delivered to chat {}", self.chat_id);
            return Ok(DeliveryReceipt {
                status: status.as_u16(),
                chars,
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            kind: RejectionKind::from_status(status.as_u16()),
            body,
        })
    }
}
