// SPDX-License-Identifier: MIT

//! Executor contract and the uniform node adapter
//!
//! An executor performs exactly one agent role's unit of work against a
//! read-only view of the workflow state and reports its outcome as data.
//! The adapter wraps every invocation with timing, the step timeout,
//! audit events and progress events, then merges the outcome.

use super::events::{AuditEvent, AuditEventKind, EventStore};
use super::progress::{AgentEvent, ProgressBroadcaster, ProgressKind};
use super::state::{AgentFailure, AgentRole, RoleOutput, WorkflowState};
use async_trait::async_trait;
use serde_json::json;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Outcome of one executor invocation.
///
/// Failures are data, never raised faults: the supervisor decides
/// whether to retry, escalate to a human, or give up.
#[derive(Debug, Clone)]
pub enum ExecutorOutcome {
    /// The role produced its output
    Success(RoleOutput),
    /// The role failed; `fatal` escalates straight to terminal failure
    Failure { reason: String, fatal: bool },
    /// The input is underspecified; a human must answer `question`
    NeedsHuman { question: String },
}

impl ExecutorOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
            fatal: false,
        }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
            fatal: true,
        }
    }
}

/// One agent role's unit of work.
///
/// Implementations must not mutate shared state and perform at most one
/// reasoning-service call per invocation; retry is engine policy.
#[async_trait]
pub trait Executor: Send + Sync {
    fn role(&self) -> AgentRole;

    async fn execute(&self, state: &WorkflowState) -> ExecutorOutcome;
}

/// Adapts an [`Executor`] to the engine's node-invocation contract.
pub struct NodeAdapter {
    store: EventStore,
    broadcaster: ProgressBroadcaster,
    step_timeout: Duration,
}

impl NodeAdapter {
    pub fn new(store: EventStore, broadcaster: ProgressBroadcaster, step_timeout: Duration) -> Self {
        Self {
            store,
            broadcaster,
            step_timeout,
        }
    }

    /// Run one executor against the state and merge its outcome.
    ///
    /// On failure the role-output fields keep their prior values; only
    /// the failure/status fields change.
    pub async fn invoke(&self, executor: &dyn Executor, mut state: WorkflowState) -> WorkflowState {
        let role = executor.role();
        let agent = role.as_str();
        let session_id = state.session_id;
        let correlation = Uuid::new_v4();

        self.store
            .append(
                AuditEvent::new(AuditEventKind::AgentInvoked, session_id)
                    .agent(agent)
                    .payload(json!({ "iteration": state.iteration }))
                    .correlated(correlation),
            )
            .await;
        self.broadcaster
            .publish(
                AgentEvent::new(
                    ProgressKind::AgentStarted,
                    session_id,
                    role.phase(),
                    format!("{} started", agent),
                )
                .agent(agent),
            )
            .await;

        let started = Instant::now();
        let outcome = match tokio::time::timeout(self.step_timeout, executor.execute(&state)).await
        {
            Ok(outcome) => outcome,
            Err(_) => ExecutorOutcome::failure(format!(
                "{} timed out after {:?}",
                agent, self.step_timeout
            )),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            ExecutorOutcome::Success(output) => {
                log::info!("Agent {} completed in {}ms", agent, duration_ms);
                self.store
                    .append(
                        AuditEvent::new(AuditEventKind::AgentCompleted, session_id)
                            .agent(agent)
                            .duration_ms(duration_ms)
                            .payload(json!({ "role": output.role().as_str() }))
                            .correlated(correlation),
                    )
                    .await;
                self.broadcaster
                    .publish(
                        AgentEvent::new(
                            ProgressKind::AgentCompleted,
                            session_id,
                            role.phase(),
                            format!("{} completed", agent),
                        )
                        .agent(agent),
                    )
                    .await;

                state.apply(output);
                state.retry_feedback = None;
                state.record(agent, "completed");
            }
            ExecutorOutcome::Failure { reason, fatal } => {
                log::warn!("Agent {} failed after {}ms: {}", agent, duration_ms, reason);
                self.store
                    .append(
                        AuditEvent::new(AuditEventKind::AgentFailed, session_id)
                            .agent(agent)
                            .duration_ms(duration_ms)
                            .error(reason.clone())
                            .correlated(correlation),
                    )
                    .await;
                self.broadcaster
                    .publish(
                        AgentEvent::new(
                            ProgressKind::AgentFailed,
                            session_id,
                            role.phase(),
                            reason.clone(),
                        )
                        .agent(agent),
                    )
                    .await;

                state.record(agent, format!("failed: {}", reason));
                state.last_failure = Some(AgentFailure {
                    role,
                    reason,
                    fatal,
                });
            }
            ExecutorOutcome::NeedsHuman { question } => {
                log::info!("Agent {} requests human review: {}", agent, question);
                self.store
                    .append(
                        AuditEvent::new(AuditEventKind::HumanReviewRequested, session_id)
                            .agent(agent)
                            .duration_ms(duration_ms)
                            .payload(json!({ "question": question.clone() }))
                            .correlated(correlation),
                    )
                    .await;
                self.broadcaster
                    .publish(
                        AgentEvent::new(
                            ProgressKind::HumanReviewRequested,
                            session_id,
                            role.phase(),
                            question.clone(),
                        )
                        .agent(agent),
                    )
                    .await;

                state.record(agent, format!("needs human input: {}", question));
                state.pending_question = Some(question);
                // A fresh question invalidates any earlier clarification
                state.clarification = None;
            }
        }

        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::state::{RuleAnalysis, WizardRequest};

    fn state() -> WorkflowState {
        WorkflowState::new(
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
        .unwrap()
    }

    fn adapter() -> NodeAdapter {
        NodeAdapter::new(
            EventStore::new(),
            ProgressBroadcaster::new(Duration::from_secs(60)),
            Duration::from_secs(5),
        )
    }

    struct FixedExecutor {
        role: AgentRole,
        outcome: ExecutorOutcome,
    }

    #[async_trait]
    impl Executor for FixedExecutor {
        fn role(&self) -> AgentRole {
            self.role
        }

        async fn execute(&self, _state: &WorkflowState) -> ExecutorOutcome {
            self.outcome.clone()
        }
    }

    struct SlowExecutor;

    #[async_trait]
    impl Executor for SlowExecutor {
        fn role(&self) -> AgentRole {
            AgentRole::RuleAnalyzer
        }

        async fn execute(&self, _state: &WorkflowState) -> ExecutorOutcome {
            tokio::time::sleep(Duration::from_secs(60)).await;
            ExecutorOutcome::failure("unreachable")
        }
    }

    fn analysis() -> RuleAnalysis {
        RuleAnalysis {
            rule_name: "consent_rule".to_string(),
            summary: "requires consent".to_string(),
            attribute_based: false,
            attributes: vec![],
            requires_reference_data: false,
            referenced_groups: vec![],
            conditions: vec![],
        }
    }

    #[tokio::test]
    async fn test_success_merges_output_and_audits() {
        let store = EventStore::new();
        let adapter = NodeAdapter::new(
            store.clone(),
            ProgressBroadcaster::new(Duration::from_secs(60)),
            Duration::from_secs(5),
        );
        let executor = FixedExecutor {
            role: AgentRole::RuleAnalyzer,
            outcome: ExecutorOutcome::Success(RoleOutput::Analysis(analysis())),
        };

        let state = adapter.invoke(&executor, state()).await;

        assert!(state.analysis.is_some());
        assert!(state.last_failure.is_none());

        let events = store.for_session(state.session_id).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, AuditEventKind::AgentInvoked);
        assert_eq!(events[1].kind, AuditEventKind::AgentCompleted);
        assert_eq!(events[0].correlation_id, events[1].correlation_id);
        assert!(events[1].duration_ms.is_some());
    }

    #[tokio::test]
    async fn test_failure_leaves_outputs_untouched() {
        let executor = FixedExecutor {
            role: AgentRole::CypherGenerator,
            outcome: ExecutorOutcome::failure("service unavailable"),
        };

        let mut initial = state();
        initial.analysis = Some(analysis());
        let result = adapter().invoke(&executor, initial).await;

        // Prior output survives the failed step
        assert!(result.analysis.is_some());
        assert!(result.queries.is_none());
        let failure = result.last_failure.unwrap();
        assert_eq!(failure.role, AgentRole::CypherGenerator);
        assert!(!failure.fatal);
    }

    #[tokio::test]
    async fn test_timeout_becomes_transient_failure() {
        let adapter = NodeAdapter::new(
            EventStore::new(),
            ProgressBroadcaster::new(Duration::from_secs(60)),
            Duration::from_millis(20),
        );

        let result = adapter.invoke(&SlowExecutor, state()).await;

        let failure = result.last_failure.unwrap();
        assert!(!failure.fatal);
        assert!(failure.reason.contains("timed out"));
    }

    #[tokio::test]
    async fn test_needs_human_sets_pending_question() {
        let executor = FixedExecutor {
            role: AgentRole::RuleAnalyzer,
            outcome: ExecutorOutcome::NeedsHuman {
                question: "Which consent standard applies?".to_string(),
            },
        };

        let mut initial = state();
        initial.clarification = Some("stale answer".to_string());
        let result = adapter().invoke(&executor, initial).await;

        assert_eq!(
            result.pending_question.as_deref(),
            Some("Which consent standard applies?")
        );
        assert!(result.clarification.is_none());
        assert!(result.last_failure.is_none());
    }
}
