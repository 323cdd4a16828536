// SPDX-License-Identifier: MIT

//! Reasoning-service boundary
//!
//! This module provides the core Reasoner trait and its HTTP-backed
//! implementation, plus structured-output extraction:
//! - [`Reasoner`] - one prompt in, raw text out
//! - [`service::ReasoningClient`] - chat-completions client over reqwest
//! - [`structured`] - fenced-block / brace-span JSON recovery

pub mod service;
pub mod structured;

use crate::error::WeaverError;
use async_trait::async_trait;

/// A single completion request to the reasoning service
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System-level instruction for the agent role
    pub instruction: String,
    /// The user-facing prompt body
    pub prompt: String,
}

impl CompletionRequest {
    pub fn new(instruction: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            prompt: prompt.into(),
        }
    }
}

/// Core trait for the external reasoning service.
///
/// One invocation performs exactly one network call; retry policy lives
/// in the workflow engine, never here.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, WeaverError>;
}
