// SPDX-License-Identifier: MIT

//! Cypher generator - turns the analysis into graph queries

use super::request_context;
use crate::llm::{structured, CompletionRequest, Reasoner};
use crate::wizard::executor::{Executor, ExecutorOutcome};
use crate::wizard::state::{AgentRole, GeneratedQueries, RoleOutput, WorkflowState};
use async_trait::async_trait;
use std::fmt::Write;
use std::sync::Arc;

const INSTRUCTION: &str = "You translate structured compliance-rule analyses into Cypher \
queries for a graph database of jurisdictions, data categories and transfer rules. Answer \
with a single JSON object: {\"queries\": [{\"purpose\": \"...\", \"cypher\": \"...\"}]}. \
Every query must be self-contained and runnable as written.";

pub struct CypherGeneratorAgent {
    reasoner: Arc<dyn Reasoner>,
}

impl CypherGeneratorAgent {
    pub fn new(reasoner: Arc<dyn Reasoner>) -> Self {
        Self { reasoner }
    }

    fn build_request(&self, state: &WorkflowState) -> CompletionRequest {
        let mut prompt = request_context(state);

        if let Some(analysis) = &state.analysis {
            let _ = writeln!(
                prompt,
                "\nRule analysis:\n{}",
                serde_json::to_string_pretty(analysis).unwrap_or_default()
            );
        }
        if let Some(dictionary) = &state.dictionary {
            let _ = writeln!(
                prompt,
                "\nAttribute dictionary:\n{}",
                serde_json::to_string_pretty(dictionary).unwrap_or_default()
            );
        }

        CompletionRequest::new(INSTRUCTION, prompt)
    }
}

#[async_trait]
impl Executor for CypherGeneratorAgent {
    fn role(&self) -> AgentRole {
        AgentRole::CypherGenerator
    }

    async fn execute(&self, state: &WorkflowState) -> ExecutorOutcome {
        let request = self.build_request(state);
        let raw = match self.reasoner.complete(&request).await {
            Ok(raw) => raw,
            Err(e) => return ExecutorOutcome::failure(e.to_string()),
        };

        match structured::extract_as::<GeneratedQueries>(&raw) {
            Some(generated) if !generated.queries.is_empty() => {
                if let Some(empty) = generated.queries.iter().find(|q| q.cypher.trim().is_empty())
                {
                    return ExecutorOutcome::failure(format!(
                        "Generated query '{}' has empty Cypher text",
                        empty.purpose
                    ));
                }
                ExecutorOutcome::Success(RoleOutput::Queries(generated))
            }
            Some(_) => ExecutorOutcome::failure("Generator returned no queries"),
            None => ExecutorOutcome::failure("Structured-output failure: no JSON in response"),
        }
    }
}
