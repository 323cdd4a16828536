// SPDX-License-Identifier: MIT

//! Data dictionary generator for attribute-based rules

use super::request_context;
use crate::llm::{structured, CompletionRequest, Reasoner};
use crate::wizard::executor::{Executor, ExecutorOutcome};
use crate::wizard::state::{AgentRole, DataDictionary, RoleOutput, WorkflowState};
use async_trait::async_trait;
use std::fmt::Write;
use std::sync::Arc;

const INSTRUCTION: &str = "You generate keyword dictionaries for data attributes used in \
compliance rules. For each attribute, list the keywords and synonyms that identify it in \
real datasets. Answer with a single JSON object: {\"entries\": [{\"attribute\": \"...\", \
\"keywords\": [\"...\"]}]}.";

pub struct DataDictionaryAgent {
    reasoner: Arc<dyn Reasoner>,
}

impl DataDictionaryAgent {
    pub fn new(reasoner: Arc<dyn Reasoner>) -> Self {
        Self { reasoner }
    }

    fn build_request(&self, state: &WorkflowState) -> CompletionRequest {
        let mut prompt = request_context(state);
        if let Some(analysis) = &state.analysis {
            let _ = writeln!(
                prompt,
                "\nAttributes needing dictionaries: {}",
                analysis.attributes.join(", ")
            );
        }
        CompletionRequest::new(INSTRUCTION, prompt)
    }
}

#[async_trait]
impl Executor for DataDictionaryAgent {
    fn role(&self) -> AgentRole {
        AgentRole::DataDictionary
    }

    async fn execute(&self, state: &WorkflowState) -> ExecutorOutcome {
        let request = self.build_request(state);
        let raw = match self.reasoner.complete(&request).await {
            Ok(raw) => raw,
            Err(e) => return ExecutorOutcome::failure(e.to_string()),
        };

        match structured::extract_as::<DataDictionary>(&raw) {
            Some(dictionary) if !dictionary.entries.is_empty() => {
                ExecutorOutcome::Success(RoleOutput::Dictionary(dictionary))
            }
            Some(_) => ExecutorOutcome::failure("Dictionary response contained no entries"),
            None => ExecutorOutcome::failure("Structured-output failure: no JSON in response"),
        }
    }
}
