//! Slack delivery through `chat.postMessage`.

use crate::report::DiagnosticMessage;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Slack rejects section blocks longer than this.
const SECTION_LIMIT: usize = 3000;

/// Maximum characters in a header block's plain text.
const HEADER_LIMIT: usize = 150;

/// Connection settings for the Slack Web API.
#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub api_url: String,
    pub token: String,
    pub timeout_seconds: u64,
    pub retries: usize,
    pub retry_delay_ms: u64,
}

/// Slack Web API response envelope.
#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts diagnostic messages to Slack channels.
pub struct SlackClient {
    config: SlackConfig,
    http_client: reqwest::Client,
}

impl SlackClient {
    pub fn new(config: SlackConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Post one message, retrying transient failures.
    pub async fn post(&self, message: &DiagnosticMessage) -> Result<()> {
        let payload = build_payload(message);
        let attempts = self.config.retries + 1;

        for attempt in 1..=attempts {
            match self.send(&payload).await {
                Ok(()) => {
                    info!("Posted diagnostic to Slack channel {}", message.audience_id);
                    return Ok(());
                }
                Err(SendError::Fatal(e)) => return Err(e),
                Err(SendError::Transient(e)) if attempt < attempts => {
                    let delay = self.config.retry_delay_ms * attempt as u64;
                    warn!(
                        "Slack delivery to {} failed (attempt {}/{}): {}; retrying in {}ms",
                        message.audience_id, attempt, attempts, e, delay
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Err(SendError::Transient(e)) => return Err(e),
            }
        }

        Err(anyhow!("Slack delivery to {} failed", message.audience_id))
    }

    async fn send(&self, payload: &Value) -> std::result::Result<(), SendError> {
        let response = self
            .http_client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.token)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SendError::Transient(anyhow!(
                        "Request timed out after {}s",
                        self.config.timeout_seconds
                    ))
                } else {
                    SendError::Transient(anyhow!("Failed to send request: {}", e))
                }
            })?;

        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SendError::Transient(anyhow!("Slack API error {}", status)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Fatal(anyhow!("Slack API error {}: {}", status, body)));
        }

        let body: SlackResponse = response
            .json()
            .await
            .map_err(|e| SendError::Fatal(anyhow!("Failed to parse Slack response: {}", e)))?;
        debug!("Slack response ok={}", body.ok);

        if body.ok {
            Ok(())
        } else {
            Err(SendError::Fatal(anyhow!(
                "Slack rejected the message: {}",
                body.error.unwrap_or_else(|| "unknown error".to_string())
            )))
        }
    }
}

enum SendError {
    Transient(anyhow::Error),
    Fatal(anyhow::Error),
}

/// Build the `chat.postMessage` body for a message.
pub fn build_payload(message: &DiagnosticMessage) -> Value {
    let mut blocks = vec![
        json!({
            "type": "header",
            "text": {
                "type": "plain_text",
                "text": truncate_chars(&message.title, HEADER_LIMIT),
                "emoji": true
            }
        }),
        json!({
            "type": "context",
            "elements": [{ "type": "mrkdwn", "text": message.summary }]
        }),
    ];

    if let Some(ref url) = message.image_url {
        blocks.push(json!({
            "type": "image",
            "title": { "type": "plain_text", "text": "Strategic analysis" },
            "image_url": url,
            "alt_text": "Diagnostic cover"
        }));
    }

    blocks.push(json!({ "type": "divider" }));

    for chunk in chunk_lines(&message.text, SECTION_LIMIT) {
        blocks.push(json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": chunk }
        }));
    }

    json!({
        "channel": message.audience_id,
        "text": message.title,
        "blocks": blocks,
        "unfurl_links": false,
        "unfurl_media": true
    })
}

/// Split text on line boundaries into chunks of at most `limit` bytes.
/// Lines longer than `limit` are cut at the last char boundary that fits.
pub fn chunk_lines(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        for piece in split_line(line, limit) {
            if !current.is_empty() && current.len() + 1 + piece.len() > limit {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(piece);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn split_line(line: &str, limit: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = line;

    while rest.len() > limit {
        let mut end = limit;
        while end > 0 && !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // A single char wider than the limit still has to go somewhere.
            end = rest.chars().next().map(char::len_utf8).unwrap_or(rest.len());
        }
        let (head, tail) = rest.split_at(end);
        pieces.push(head);
        rest = tail;
    }
    pieces.push(rest);

    pieces
}

/// Cut `text` to at most `max` chars, marking the cut with an ellipsis.
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}
