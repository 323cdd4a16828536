// SPDX-License-Identifier: MIT

//! HTTP gateway client for the graph database

use super::{GraphClient, QueryResult};
use crate::config::WeaverConfig;
use crate::error::WeaverError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// Client for the graph query gateway.
///
/// The gateway accepts `{graph, query}` and answers with
/// `{columns, rows}` or `{error}`; transport and database errors both
/// surface as [`WeaverError::Graph`].
pub struct HttpGraphClient {
    client: Client,
    endpoint: String,
}

impl HttpGraphClient {
    pub fn new(config: &WeaverConfig) -> Result<Self, WeaverError> {
        let client = Client::builder()
            .timeout(config.step_timeout)
            .build()
            .map_err(WeaverError::Http)?;

        Ok(Self {
            client,
            endpoint: config.graph_endpoint.clone(),
        })
    }

    async fn post(&self, body: serde_json::Value) -> Result<serde_json::Value, WeaverError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| WeaverError::graph(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(WeaverError::graph(format!(
                "Gateway error {}: {}",
                status, text
            )));
        }

        resp.json()
            .await
            .map_err(|e| WeaverError::graph(e.to_string()))
    }
}

#[async_trait]
impl GraphClient for HttpGraphClient {
    async fn execute(&self, graph: &str, query: &str) -> Result<QueryResult, WeaverError> {
        log::debug!("Executing on graph '{}': {}", graph, query);

        let body = json!({ "graph": graph, "query": query });
        let resp = self.post(body).await?;

        if let Some(error) = resp["error"].as_str() {
            return Err(WeaverError::graph(error));
        }

        serde_json::from_value(resp).map_err(|e| WeaverError::graph(e.to_string()))
    }

    async fn drop_graph(&self, graph: &str) -> Result<(), WeaverError> {
        log::info!("Dropping graph namespace '{}'", graph);

        let body = json!({ "graph": graph, "drop": true });
        self.post(body).await.map(|_| ())
    }
}
