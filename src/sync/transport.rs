//! HTTP calls against a Discord webhook.
//!
//! The orchestrator only needs two capabilities: post a new message and
//! edit an existing one. [`WebhookTransport`] captures them so tests can
//! swap in a recording fake; [`CurlTransport`] is the real implementation.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{MessageId, Role};
use crate::error::{Result, TodoError};

/// Per-request timeout handed to curl.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Response of a single webhook call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// HTTP status returned by the webhook.
    pub status: u16,
}

impl Delivery {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self { status }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstraction for the webhook endpoint.
///
/// Both calls take the role they act for so failures can be attributed.
/// An `Err` means the request could not be made at all; a completed request
/// with a non-2xx status is an `Ok(Delivery)` the caller inspects.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// Post a new message. Webhooks do not return its id.
    async fn create(&self, role: Role, endpoint: &str, content: &str) -> Result<Delivery>;

    /// Replace the content of an existing message.
    async fn edit(
        &self,
        role: Role,
        endpoint: &str,
        message_id: &MessageId,
        content: &str,
    ) -> Result<Delivery>;
}

/// Webhook transport that shells out to `curl`.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    timeout_secs: u64,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl CurlTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Build the curl argument list for one request.
    fn args(&self, method: &str, url: &str, content: &str) -> Vec<String> {
        let body = json!({ "content": content }).to_string();
        vec![
            "-s".to_string(),
            "-o".to_string(),
            null_device().to_string(),
            "-w".to_string(),
            "%{http_code}".to_string(),
            "-X".to_string(),
            method.to_string(),
            "--url".to_string(),
            url.to_string(),
            "-H".to_string(),
            "Content-Type: application/json".to_string(),
            "-d".to_string(),
            body,
            "--max-time".to_string(),
            self.timeout_secs.to_string(),
        ]
    }

    async fn request(&self, role: Role, method: &str, url: &str, content: &str) -> Result<Delivery> {
        debug!("{} {} message via webhook ({} chars)", method, role, content.len());

        let output = tokio::process::Command::new("curl")
            .args(self.args(method, url, content))
            .output()
            .await
            .map_err(|e| TodoError::sync_failed(role, None, format!("Failed to execute curl: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = if stderr.contains("timed out") || output.status.code() == Some(28) {
                format!("request timed out after {}s", self.timeout_secs)
            } else {
                format!("curl failed: {}", stderr.trim())
            };
            return Err(TodoError::sync_failed(role, None, reason));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let status = stdout.trim().parse::<u16>().map_err(|_| {
            TodoError::sync_failed(role, None, format!("unexpected curl output '{}'", stdout.trim()))
        })?;

        debug!("Webhook answered HTTP {}", status);
        Ok(Delivery::new(status))
    }
}

fn null_device() -> &'static str {
    if cfg!(windows) {
        "NUL"
    } else {
        "/dev/null"
    }
}

/// URL that edits `message_id` through the webhook at `endpoint`.
#[must_use]
pub fn message_url(endpoint: &str, message_id: &MessageId) -> String {
    format!("{}/messages/{}", endpoint.trim_end_matches('/'), message_id)
}

#[async_trait]
impl WebhookTransport for CurlTransport {
    async fn create(&self, role: Role, endpoint: &str, content: &str) -> Result<Delivery> {
        self.request(role, "POST", endpoint, content).await
    }

    async fn edit(
        &self,
        role: Role,
        endpoint: &str,
        message_id: &MessageId,
        content: &str,
    ) -> Result<Delivery> {
        self.request(role, "PATCH", &message_url(endpoint, message_id), content)
            .await
    }
}
