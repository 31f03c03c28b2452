//! Slack Web API client.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::{ChatService, ChatUser};
use crate::error::{Error, Result};

const SLACK_API_URL: &str = "https://slack.com/api";

/// Slack client for the chat-service capability.
#[derive(Debug, Clone)]
pub struct SlackClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl SlackClient {
    /// Create a new Slack client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(token, SLACK_API_URL)
    }

    /// Create a client against a non-default API root (used by tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            token: token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Slack reports failures in-band with `ok: false` and an error token.
#[derive(Deserialize)]
struct SlackEnvelope<T> {
    ok: bool,
    error: Option<String>,
    #[serde(flatten)]
    payload: Option<T>,
}

#[derive(Deserialize)]
struct LookupPayload {
    user: RawUser,
}

#[derive(Deserialize)]
struct RawUser {
    id: String,
    #[serde(default)]
    real_name: Option<String>,
}

#[async_trait]
impl ChatService for SlackClient {
    async fn user_by_email(&self, email: &str) -> Result<Option<ChatUser>> {
        let response = self
            .client
            .get(format!("{}/users.lookupByEmail", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .query(&[("email", email)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                service: "Slack",
                status,
                body,
            });
        }

        let envelope: SlackEnvelope<LookupPayload> = response.json().await?;

        if !envelope.ok {
            // Covers users_not_found as well as token problems; the caller
            // only needs to know that no account could be resolved.
            error!(
                email,
                error = envelope.error.as_deref().unwrap_or("unknown"),
                "email lookup failed"
            );
            return Ok(None);
        }

        Ok(envelope.payload.map(|p| ChatUser {
            id: p.user.id,
            name: p.user.real_name,
        }))
    }

    async fn send_dm(&self, user_id: &str, text: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&json!({ "channel": user_id, "text": text }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                service: "Slack",
                status,
                body,
            });
        }

        let envelope: SlackEnvelope<serde_json::Value> = response.json().await?;

        if !envelope.ok {
            return Err(Error::Api {
                service: "Slack",
                status: reqwest::StatusCode::OK,
                body: envelope.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        Ok(())
    }
}
