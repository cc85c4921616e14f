use crate::error::TransportError;
use crate::language::Locale;
use crate::text;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub content: String,
}

impl ChatEntry {
    pub fn user(content: &str) -> Self {
        Self {
            role: ChatRole::User,
            content: content.to_string(),
        }
    }

    pub fn assistant(content: &str) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.to_string(),
        }
    }
}

/// One request to the answering service. Built fresh for every turn and never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    /// `None` only when the lesson has no sections.
    pub section_id: Option<String>,
    pub section_index: usize,
    pub total_sections: usize,
    pub user_message: String,
    pub history_tail: Vec<ChatEntry>,
    pub language: Locale,
    /// Section renders issued by navigation rather than by the learner.
    pub silent: bool,
}

// The controller depends on this trait rather than on the HTTP client, so the
// session can run against a mock in tests or the offline tutor without a backend.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AnsweringService: Send + Sync {
    /// Returns the raw reply payload for a turn.
    async fn answer(&self, request: &TurnRequest) -> Result<String, TransportError>;
}

/// HTTP implementation: POSTs the request as JSON and returns the reply text.
pub struct AnsweringClient {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl AnsweringClient {
    pub fn new(
        endpoint: &str,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
        })
    }
}

const REPLY_FIELDS: [&str; 4] = ["reply", "response", "content", "message"];

// Accepts either a bare text body or a JSON object wrapping the text in one
// of the usual field names.
fn extract_reply_text(body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for field in REPLY_FIELDS {
            if let Some(text) = map.get(field).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    body.to_string()
}

const MAX_ERROR_BODY: usize = 512;

fn truncate_body(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}

#[async_trait]
impl AnsweringService for AnsweringClient {
    async fn answer(&self, request: &TurnRequest) -> Result<String, TransportError> {
        tracing::debug!(
            "Sending turn for section {:?} (silent: {})",
            request.section_id,
            request.silent
        );

        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let resp = builder.send().await.map_err(|e| {
            tracing::warn!("Answering service request failed: {}", e);
            TransportError::Network(e.to_string())
        })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        if matches!(status.as_u16(), 502..=504) {
            return Err(TransportError::UpstreamUnavailable {
                status: Some(status.as_u16()),
            });
        }
        if !status.is_success() {
            // Proxies and crashed backends answer with error pages; those
            // are an outage rather than a rejected request.
            if text::sanitize(&body) != body {
                return Err(TransportError::UpstreamUnavailable {
                    status: Some(status.as_u16()),
                });
            }
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(extract_reply_text(&body))
    }
}
