// SPDX-License-Identifier: MIT

//! Validator - exercises generated queries in a sandbox graph
//!
//! The only agent without a reasoning-service call: its external
//! boundary is the graph database. Every generated query runs in the
//! session's disposable namespace; database errors become validation
//! feedback attributed to the generator, never engine faults.

use crate::graph::sandbox::SandboxGraph;
use crate::wizard::executor::{Executor, ExecutorOutcome};
use crate::wizard::state::{AgentRole, RoleOutput, ValidationResult, WorkflowState};
use async_trait::async_trait;

pub struct ValidatorAgent {
    sandbox: SandboxGraph,
}

impl ValidatorAgent {
    pub fn new(sandbox: SandboxGraph) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Executor for ValidatorAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Validator
    }

    async fn execute(&self, state: &WorkflowState) -> ExecutorOutcome {
        let Some(generated) = &state.queries else {
            return ExecutorOutcome::failure("No generated queries to validate");
        };

        let mut problems = Vec::new();
        for query in &generated.queries {
            if let Err(e) = self.sandbox.execute(&query.cypher).await {
                problems.push(format!("'{}': {}", query.purpose, e));
            }
        }

        let verdict = if problems.is_empty() {
            log::info!(
                "All {} queries validated in sandbox '{}'",
                generated.queries.len(),
                self.sandbox.namespace()
            );
            ValidationResult {
                passed: true,
                feedback: None,
                failing_role: None,
            }
        } else {
            ValidationResult {
                passed: false,
                feedback: Some(problems.join("; ")),
                failing_role: Some(AgentRole::CypherGenerator),
            }
        };

        ExecutorOutcome::Success(RoleOutput::Validation(verdict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WeaverError;
    use crate::graph::{GraphClient, QueryResult};
    use crate::wizard::state::{CypherQuery, GeneratedQueries, WizardRequest};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use uuid::Uuid;

    /// Graph client that fails the first `failures` calls, then succeeds
    struct FlakyGraph {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GraphClient for FlakyGraph {
        async fn execute(&self, _graph: &str, _query: &str) -> Result<QueryResult, WeaverError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(WeaverError::graph("Invalid input near 'RETRUN'"))
            } else {
                Ok(QueryResult::default())
            }
        }

        async fn drop_graph(&self, _graph: &str) -> Result<(), WeaverError> {
            Ok(())
        }
    }

    fn state_with_queries() -> WorkflowState {
        let mut state = WorkflowState::new(
            WizardRequest {
                origin_jurisdiction: "CountryA".to_string(),
                scenario_type: "transfer".to_string(),
                receiving_jurisdictions: vec!["CountryB".to_string()],
                rule_text: "transfers require explicit consent".to_string(),
                data_categories: vec![],
                pii_involved: true,
                max_iterations: None,
            },
            3,
        )
        .unwrap();
        state.queries = Some(GeneratedQueries {
            queries: vec![CypherQuery {
                purpose: "create rule node".to_string(),
                cypher: "MERGE (r:Rule {name: 'x'}) RETURN r".to_string(),
            }],
        });
        state
    }

    fn validator(failures: usize) -> ValidatorAgent {
        let graph = Arc::new(FlakyGraph {
            failures,
            calls: AtomicUsize::new(0),
        });
        ValidatorAgent::new(SandboxGraph::new(graph, Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_clean_queries_pass() {
        match validator(0).execute(&state_with_queries()).await {
            ExecutorOutcome::Success(RoleOutput::Validation(verdict)) => {
                assert!(verdict.passed);
                assert!(verdict.feedback.is_none());
            }
            other => panic!("expected verdict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_database_error_becomes_feedback() {
        match validator(1).execute(&state_with_queries()).await {
            ExecutorOutcome::Success(RoleOutput::Validation(verdict)) => {
                assert!(!verdict.passed);
                assert!(verdict.feedback.unwrap().contains("RETRUN"));
                assert_eq!(verdict.failing_role, Some(AgentRole::CypherGenerator));
            }
            other => panic!("expected verdict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_queries_is_executor_failure() {
        let mut state = state_with_queries();
        state.queries = None;

        assert!(matches!(
            validator(0).execute(&state).await,
            ExecutorOutcome::Failure { fatal: false, .. }
        ));
    }
}
