// SPDX-License-Identifier: MIT

//! Process configuration
//!
//! All tunables are read once at startup from environment variables
//! (loaded from `.env` by the binary) and passed into the engine and
//! server as an explicit value, never consulted ambiently.

use std::env;
use std::time::Duration;

use crate::error::WeaverError;

/// Default cap on validation-failure retries per session
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;
/// Default bound on a single external reasoning/graph call
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 120;
/// Default idle interval before a stream heartbeat is emitted
pub const DEFAULT_HEARTBEAT_SECS: u64 = 15;

/// Engine and service configuration
#[derive(Debug, Clone)]
pub struct WeaverConfig {
    /// Retry budget per session, overridable per request
    pub max_iterations: u32,
    /// Upper bound on one executor step (the external call)
    pub step_timeout: Duration,
    /// Idle interval between progress-stream heartbeats
    pub heartbeat_interval: Duration,
    /// Reasoning service endpoint
    pub reasoner_base_url: String,
    /// Reasoning service API key
    pub reasoner_api_key: Option<String>,
    /// Model name sent to the reasoning service
    pub reasoner_model: String,
    /// Graph database gateway endpoint
    pub graph_endpoint: String,
}

impl WeaverConfig {
    /// Build a config from the process environment.
    ///
    /// `REASONER_API_KEY` is required for live runs but optional here so
    /// tests and offline commands can construct a config without it.
    pub fn from_env() -> Result<Self, WeaverError> {
        let max_iterations = read_parsed("WEAVER_MAX_ITERATIONS", DEFAULT_MAX_ITERATIONS)?;
        if max_iterations == 0 {
            return Err(WeaverError::config(
                "WEAVER_MAX_ITERATIONS must be at least 1",
            ));
        }

        Ok(Self {
            max_iterations,
            step_timeout: Duration::from_secs(read_parsed(
                "WEAVER_STEP_TIMEOUT_SECS",
                DEFAULT_STEP_TIMEOUT_SECS,
            )?),
            heartbeat_interval: Duration::from_secs(read_parsed(
                "WEAVER_HEARTBEAT_SECS",
                DEFAULT_HEARTBEAT_SECS,
            )?),
            reasoner_base_url: env::var("REASONER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            reasoner_api_key: env::var("REASONER_API_KEY").ok(),
            reasoner_model: env::var("REASONER_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            graph_endpoint: env::var("GRAPH_ENDPOINT")
                .unwrap_or_else(|_| "http://127.0.0.1:6380/query".to_string()),
        })
    }
}

impl Default for WeaverConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            step_timeout: Duration::from_secs(DEFAULT_STEP_TIMEOUT_SECS),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            reasoner_base_url: "https://api.openai.com/v1".to_string(),
            reasoner_api_key: None,
            reasoner_model: "gpt-4o-mini".to_string(),
            graph_endpoint: "http://127.0.0.1:6380/query".to_string(),
        }
    }
}

fn read_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, WeaverError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| WeaverError::config(format!("{} has invalid value '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}
