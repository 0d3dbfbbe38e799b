use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::{debug, info};

use crate::error::AgentError;
use crate::models::NewsSummary;

/// Telegram rejects messages above 4096 UTF-16 code units; keep some headroom.
pub const MAX_MESSAGE_LEN: usize = 4000;

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━";
const CONNECTED_MESSAGE: &str = "✅ Tech News Agent is connected and ready!";

/// Delivery channel for digests and operator alerts.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Format, split and send `summary`, one message per chunk, in order.
    async fn send_summary(&self, summary: &NewsSummary) -> crate::error::Result<()>;

    /// Send a single alert message; never split.
    async fn send_error(&self, message: &str) -> crate::error::Result<()>;

    /// Send a plain test message.
    async fn test_connection(&self) -> crate::error::Result<()>;
}

/// Telegram Bot API notifier posting to one chat
pub struct TelegramNotifier {
    base_url: String,
    token: String,
    chat_id: i64,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, chat_id: i64) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            chat_id,
            client: reqwest::Client::new(),
        }
    }

    /// Build the notifier and check the token with `getMe`.
    pub async fn connect(
        base_url: impl Into<String>,
        token: impl Into<String>,
        chat_id: i64,
    ) -> crate::error::Result<Self> {
        let notifier = Self::new(base_url, token, chat_id);
        let bot = notifier
            .get_me()
            .await
            .map_err(|source| AgentError::Connection {
                service: "Telegram",
                source,
            })?;
        info!(
            "Authorized on Telegram bot account {}",
            bot.username.as_deref().unwrap_or("<unnamed>")
        );
        Ok(notifier)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn get_me(&self) -> Result<BotUser> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await
            .context("Telegram getMe request failed")?;
        read_reply(response).await
    }

    async fn send_message(&self, text: &str, parse_mode: Option<&str>) -> Result<()> {
        let body = SendMessage {
            chat_id: self.chat_id,
            text,
            parse_mode,
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .context("Telegram sendMessage request failed")?;

        let _: serde_json::Value = read_reply(response).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send_summary(&self, summary: &NewsSummary) -> crate::error::Result<()> {
        let message = format_message(summary);
        let chunks = split_message(&message, MAX_MESSAGE_LEN);
        let total = chunks.len();

        for (i, chunk) in chunks.iter().enumerate() {
            self.send_message(chunk, Some("Markdown"))
                .await
                .map_err(|source| AgentError::Delivery {
                    chunk: i + 1,
                    total,
                    source,
                })?;
            debug!("Sent summary chunk {}/{} ({} units)", i + 1, total, message_len(chunk));
        }

        Ok(())
    }

    async fn send_error(&self, message: &str) -> crate::error::Result<()> {
        let text = format!("⚠️ *Tech News Agent Error*\n\n```\n{}\n```", message);
        self.send_message(&text, Some("Markdown"))
            .await
            .map_err(|source| AgentError::Delivery {
                chunk: 1,
                total: 1,
                source,
            })
    }

    async fn test_connection(&self) -> crate::error::Result<()> {
        self.send_message(CONNECTED_MESSAGE, None)
            .await
            .map_err(|source| AgentError::Connection {
                service: "Telegram",
                source,
            })
    }
}

async fn read_reply<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .context("failed to read Telegram response body")?;

    let reply: TelegramReply<T> = match serde_json::from_str(&body) {
        Ok(reply) => reply,
        Err(_) if !status.is_success() => anyhow::bail!("Telegram API error {}: {}", status, body),
        Err(e) => return Err(e).context("failed to parse Telegram response"),
    };

    if !status.is_success() || !reply.ok {
        anyhow::bail!(
            "Telegram API error {}: {}",
            status,
            reply.description.unwrap_or(body)
        );
    }

    reply
        .result
        .context("Telegram response has no result")
}

/// Render the digest as one Markdown document.
pub fn format_message(summary: &NewsSummary) -> String {
    let mut out = String::new();

    out.push_str("📰 *Weekly Tech News Summary*\n");
    let _ = writeln!(out, "📅 *{}*", summary.week_range);
    let _ = writeln!(out, "📊 Articles analyzed: {}", summary.total_articles);
    let _ = write!(out, "\n{}\n\n", DIVIDER);

    out.push_str(&summary.summary);
    out.push_str("\n\n");

    if !summary.key_topics.is_empty() {
        let _ = writeln!(out, "{}", DIVIDER);
        out.push_str("🔑 *Key Topics*\n\n");
        for topic in &summary.key_topics {
            let _ = writeln!(out, "• {}", topic);
        }
        out.push('\n');
    }

    if !summary.trending_stories.is_empty() {
        let _ = writeln!(out, "{}", DIVIDER);
        out.push_str("🔥 *Trending Stories*\n\n");
        for (i, story) in summary.trending_stories.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, story);
        }
        out.push('\n');
    }

    let _ = writeln!(out, "{}", DIVIDER);
    let _ = writeln!(
        out,
        "🤖 Generated on {}",
        summary.generated_at.format("%b %d, %Y %H:%M %Z")
    );
    out.push_str("_Powered by Gemini AI & Rust_");
    out
}

/// Length as Telegram counts it: UTF-16 code units, so characters outside
/// the Basic Multilingual Plane (most emoji) count twice.
pub fn message_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Split `message` on line boundaries into chunks of at most `max_len`
/// units (see `message_len`). A single line longer than `max_len` becomes
/// its own oversized chunk.
pub fn split_message(message: &str, max_len: usize) -> Vec<String> {
    if message_len(message) <= max_len {
        return vec![message.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for line in message.split('\n') {
        let line_len = message_len(line);
        if !current.is_empty() && current_len + 1 + line_len > max_len {
            chunks.push(current.join("\n"));
            current.clear();
            current_len = 0;
        }

        current_len += if current.is_empty() { line_len } else { line_len + 1 };
        current.push(line);
    }

    if !current.is_empty() {
        chunks.push(current.join("\n"));
    }

    chunks
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct TelegramReply<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    username: Option<String>,
}
