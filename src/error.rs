// SPDX-License-Identifier: MIT

//! Typed error handling for ruleweaver
//!
//! This module provides a proper error type hierarchy using thiserror,
//! shared by the engine, the service clients, and the HTTP layer.

use thiserror::Error;

/// Top-level error type for ruleweaver
#[derive(Debug, Error)]
pub enum WeaverError {
    /// Errors from the external reasoning service
    #[error("Reasoning service error: {message}")]
    Reasoner { message: String },

    /// Errors from the graph database gateway
    #[error("Graph database error: {message}")]
    Graph { message: String },

    /// Configuration errors (missing env vars, invalid config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Workflow-specific errors
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Generic error wrapper for compatibility
    #[error("{0}")]
    Other(String),
}

/// Errors raised before or outside workflow execution
///
/// Executor failures never surface here; they are captured into the
/// workflow state and routed through the supervisor. These variants cover
/// invalid invocations and session bookkeeping only.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Rule text was empty or whitespace
    #[error("Rule text must not be empty")]
    EmptyRuleText,

    /// No receiving jurisdiction supplied
    #[error("At least one receiving jurisdiction is required")]
    NoReceivingJurisdictions,

    /// max_iterations of zero would forbid every retry
    #[error("max_iterations must be at least 1")]
    ZeroIterations,

    /// Session id not known to the session table
    #[error("Unknown session: {0}")]
    UnknownSession(uuid::Uuid),

    /// Resume called on a session that is not waiting for human input
    #[error("Session {0} is not suspended for human review")]
    NotSuspended(uuid::Uuid),
}

impl WeaverError {
    /// Create a reasoning-service error
    pub fn reasoner(message: impl Into<String>) -> Self {
        Self::Reasoner {
            message: message.into(),
        }
    }

    /// Create a graph-database error
    pub fn graph(message: impl Into<String>) -> Self {
        Self::Graph {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create from a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<&str> for WeaverError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for WeaverError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}
