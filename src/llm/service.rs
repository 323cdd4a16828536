// SPDX-License-Identifier: MIT

//! HTTP reasoning-service client (chat-completions API shape)

use super::{CompletionRequest, Reasoner};
use crate::config::WeaverConfig;
use crate::error::WeaverError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// Chat-completions client for the configured reasoning service
pub struct ReasoningClient {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl ReasoningClient {
    /// Create a client from config.
    ///
    /// Requires `REASONER_API_KEY` (carried in the config); the request
    /// timeout is the engine's per-step bound so a hung call surfaces as
    /// a transient executor failure rather than a stuck session.
    pub fn new(config: &WeaverConfig) -> Result<Self, WeaverError> {
        let api_key = config
            .reasoner_api_key
            .clone()
            .ok_or_else(|| WeaverError::config("REASONER_API_KEY must be set"))?;

        let client = Client::builder()
            .timeout(config.step_timeout)
            .build()
            .map_err(WeaverError::Http)?;

        Ok(Self {
            client,
            api_key,
            model_name: config.reasoner_model.clone(),
            base_url: config.reasoner_base_url.clone(),
        })
    }

    /// Pull the first choice's text out of a chat-completions response
    fn parse_response(response: &serde_json::Value) -> Result<String, WeaverError> {
        response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .and_then(|choice| choice["message"]["content"].as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| WeaverError::reasoner("No text content in response"))
    }
}

#[async_trait]
impl Reasoner for ReasoningClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, WeaverError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = json!({
            "model": self.model_name,
            "messages": [
                { "role": "system", "content": request.instruction },
                { "role": "user", "content": request.prompt }
            ]
        });

        log::debug!(
            "Reasoner request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WeaverError::reasoner("Call timed out")
                } else {
                    WeaverError::reasoner(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(WeaverError::reasoner(format!(
                "API error {}: {}",
                status, text
            )));
        }

        let resp_json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| WeaverError::reasoner(e.to_string()))?;
        log::debug!("Reasoner response: {}", resp_json);

        Self::parse_response(&resp_json)
    }
}
