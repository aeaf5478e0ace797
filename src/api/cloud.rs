//! The WhatsApp Cloud API: the outbound message client and the inbound webhook
//! payload shapes.
//!
//! Meta pushes inbound messages as JSON nested as
//! `entry[0].changes[0].value.messages[0]`; replies go out as a POST to
//! `{graph_api_base}/{phone_number_id}/messages` with a bearer token.

use crate::api::Sender;
use crate::{Config, Result};
use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

/// Implements [`Sender`] against the Graph API.
pub(crate) struct CloudApi {
    http: reqwest::Client,
    messages_url: String,
    access_token: String,
}

impl CloudApi {
    /// Builds the client from the configured phone number id, base URL and access
    /// token. The token is read once here; restart the service to pick up a new one.
    pub(crate) async fn new(config: &Config) -> Result<Self> {
        let access_token = config.access_token().await?;
        Ok(Self {
            http: reqwest::Client::new(),
            messages_url: format!(
                "{}/{}/messages",
                config.graph_api_base(),
                config.phone_number_id()
            ),
            access_token,
        })
    }
}

#[async_trait::async_trait]
impl Sender for CloudApi {
    async fn send_text(&self, to: &str, body: &str) -> Result<()> {
        debug!("Sending text message to {to}");
        let response = self
            .http
            .post(&self.messages_url)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": "text",
                "text": { "body": body }
            }))
            .send()
            .await
            .context("Failed to send message request to the Graph API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            anyhow::bail!("Graph API send failed with status {status}: {body}");
        }
        Ok(())
    }
}

/// The envelope Meta POSTs to the webhook. Every level is optional in practice
/// (status updates, delivery receipts and other events arrive with no `messages`),
/// so all the collections default to empty and extraction returns an `Option`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WebhookPayload {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Default, Deserialize)]
struct Entry {
    #[serde(default)]
    changes: Vec<Change>,
}

#[derive(Debug, Default, Deserialize)]
struct Change {
    #[serde(default)]
    value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
struct ChangeValue {
    #[serde(default)]
    messages: Vec<InboundMessage>,
}

/// One inbound message. `text` is absent for interactive/button input.
#[derive(Debug, Deserialize)]
pub(crate) struct InboundMessage {
    from: String,
    #[serde(default)]
    text: Option<TextBody>,
}

#[derive(Debug, Deserialize)]
struct TextBody {
    body: String,
}

impl WebhookPayload {
    /// The first message of the payload, if it carries one at all.
    pub(crate) fn first_message(&self) -> Option<&InboundMessage> {
        self.entry
            .first()?
            .changes
            .first()?
            .value
            .messages
            .first()
    }
}

impl InboundMessage {
    /// The sender's WhatsApp id, e.g. `"50761234567"`.
    pub(crate) fn from_wa_id(&self) -> &str {
        &self.from
    }

    /// The text body, `None` for non-text messages.
    pub(crate) fn text_body(&self) -> Option<&str> {
        self.text.as_ref().map(|t| t.body.as_str())
    }
}
