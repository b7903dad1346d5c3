//! Webhook delivery of the weekly summary.
//!
//! The payload carries both a Slack (`text`) and a Discord (`content`) field
//! so a single URL of either kind works. Delivery is best effort: every
//! failure is logged and reported as `false`, never propagated.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

/// Longest excerpt sent before truncation.
pub const MAX_EXCERPT_CHARS: usize = 1800;
pub const TRUNCATION_MARKER: &str = "\n…(truncated)";
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookPayload {
    pub text: String,
    pub content: String,
}

/// Cut `content` to [`MAX_EXCERPT_CHARS`] characters, appending a marker
/// when anything was dropped.
pub fn excerpt(content: &str) -> String {
    match content.char_indices().nth(MAX_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}{}", &content[..cut], TRUNCATION_MARKER),
        None => content.to_string(),
    }
}

pub fn build_payload(title: &str, content: &str) -> WebhookPayload {
    let excerpt = excerpt(content);
    WebhookPayload {
        text: format!("*{}*\n{}", title, excerpt),
        content: format!("**{}**\n{}", title, excerpt),
    }
}

/// POST the summary to `url`. Returns whether the target accepted it.
///
/// `None` or an empty URL is a no-op returning `false`.
pub async fn dispatch(client: &Client, url: Option<&str>, title: &str, content: &str) -> bool {
    let Some(url) = url.filter(|url| !url.trim().is_empty()) else {
        return false;
    };

    let payload = build_payload(title, content);
    let result = client
        .post(url)
        .timeout(WEBHOOK_TIMEOUT)
        .json(&payload)
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => {
            tracing::info!("Webhook delivered ({})", response.status());
            true
        }
        Ok(response) => {
            tracing::warn!("Webhook rejected with HTTP {}", response.status());
            false
        }
        Err(err) => {
            tracing::warn!("Webhook delivery failed: {}", err);
            false
        }
    }
}
