// SPDX-License-Identifier: MIT

//! Wizard workflow engine
//!
//! Drives one session's state machine: ask the supervisor router what
//! comes next, dispatch the corresponding executor through the node
//! adapter, merge, repeat until a terminal state or human-review
//! suspension. All collaborators are explicit injected handles; the
//! engine holds no global state and each session's `WorkflowState` is
//! owned exclusively by the loop driving it.

use super::agents::{
    CypherGeneratorAgent, DataDictionaryAgent, ReferenceDataAgent, RuleAnalyzerAgent,
    ValidatorAgent,
};
use super::events::{AuditEvent, AuditEventKind, EventStore};
use super::executor::{Executor, NodeAdapter};
use super::progress::{AgentEvent, ProgressBroadcaster, ProgressKind};
use super::state::{AgentRole, Phase, WizardRequest, WorkflowState};
use super::supervisor::{route, Decision};
use crate::config::WeaverConfig;
use crate::error::{WeaverError, WorkflowError};
use crate::graph::sandbox::SandboxGraph;
use crate::graph::GraphClient;
use crate::llm::Reasoner;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Backstop against a routing cycle that never terminates
const MAX_ENGINE_STEPS: u32 = 100;

pub struct WizardEngine {
    reasoner: Arc<dyn Reasoner>,
    graph: Arc<dyn GraphClient>,
    store: EventStore,
    broadcaster: ProgressBroadcaster,
    config: WeaverConfig,
}

impl WizardEngine {
    pub fn new(
        reasoner: Arc<dyn Reasoner>,
        graph: Arc<dyn GraphClient>,
        store: EventStore,
        broadcaster: ProgressBroadcaster,
        config: WeaverConfig,
    ) -> Self {
        Self {
            reasoner,
            graph,
            store,
            broadcaster,
            config,
        }
    }

    pub fn event_store(&self) -> &EventStore {
        &self.store
    }

    pub fn broadcaster(&self) -> &ProgressBroadcaster {
        &self.broadcaster
    }

    /// Validate a request and open a session without running it yet.
    ///
    /// Lets callers learn the session id (to subscribe to progress)
    /// before the first step executes.
    pub fn prepare(&self, request: WizardRequest) -> Result<WorkflowState, WeaverError> {
        let state = WorkflowState::new(request, self.config.max_iterations)?;
        Ok(state)
    }

    /// Run a request to termination or human-review suspension
    pub async fn run(&self, request: WizardRequest) -> Result<WorkflowState, WeaverError> {
        let state = self.prepare(request)?;
        Ok(self.execute(state).await)
    }

    /// Drive a prepared session
    pub async fn execute(&self, state: WorkflowState) -> WorkflowState {
        let session_id = state.session_id;
        log::info!("Starting wizard session {}", session_id);

        self.store
            .append(
                AuditEvent::new(AuditEventKind::WorkflowStarted, session_id)
                    .payload(json!({ "rule_text": state.request.rule_text.clone() })),
            )
            .await;
        self.broadcaster
            .publish(AgentEvent::new(
                ProgressKind::WorkflowStarted,
                session_id,
                Phase::Supervisor,
                "wizard session started",
            ))
            .await;

        self.drive(state).await
    }

    /// Merge a human answer into a suspended session and continue
    pub async fn resume(
        &self,
        mut state: WorkflowState,
        clarification: String,
    ) -> Result<WorkflowState, WeaverError> {
        if state.phase != Phase::HumanReview {
            return Err(WorkflowError::NotSuspended(state.session_id).into());
        }

        log::info!("Resuming wizard session {}", state.session_id);
        state.pending_question = None;
        state.clarification = Some(clarification.clone());
        state.record("human_review", format!("clarification: {}", clarification));

        self.store
            .append(
                AuditEvent::new(AuditEventKind::WorkflowResumed, state.session_id)
                    .payload(json!({ "clarification": clarification })),
            )
            .await;

        Ok(self.drive(state).await)
    }

    async fn drive(&self, mut state: WorkflowState) -> WorkflowState {
        // Terminal states invoke no further agents
        if state.is_terminal() {
            return state;
        }

        let adapter = NodeAdapter::new(
            self.store.clone(),
            self.broadcaster.clone(),
            self.config.step_timeout,
        );

        let mut steps = 0;
        loop {
            steps += 1;
            if steps > MAX_ENGINE_STEPS {
                log::error!(
                    "Session {} exceeded {} engine steps",
                    state.session_id,
                    MAX_ENGINE_STEPS
                );
                return self
                    .finish_failed(state, "Engine step limit exceeded".to_string())
                    .await;
            }

            state.phase = Phase::Supervisor;
            match route(&state) {
                Decision::Run(role) => {
                    state = self.dispatch(&adapter, role, state).await;
                }
                Decision::Retry { role, feedback } => {
                    state.iteration += 1;
                    log::info!(
                        "Session {} iteration {}/{}: retrying {}",
                        state.session_id,
                        state.iteration,
                        state.max_iterations,
                        role.as_str()
                    );
                    state.retry_feedback = Some(feedback);
                    state.last_failure = None;
                    state = self.dispatch(&adapter, role, state).await;
                }
                Decision::HumanReview => {
                    state.phase = Phase::HumanReview;
                    log::info!(
                        "Session {} suspended for human review: {:?}",
                        state.session_id,
                        state.pending_question
                    );
                    return state;
                }
                Decision::Complete => {
                    return self.finish_complete(state).await;
                }
                Decision::Fail(reason) => {
                    return self.finish_failed(state, reason).await;
                }
            }
        }
    }

    async fn dispatch(
        &self,
        adapter: &NodeAdapter,
        role: AgentRole,
        mut state: WorkflowState,
    ) -> WorkflowState {
        state.phase = role.phase();
        let executor = self.executor_for(role, state.session_id);
        adapter.invoke(executor.as_ref(), state).await
    }

    fn executor_for(&self, role: AgentRole, session_id: Uuid) -> Box<dyn Executor> {
        match role {
            AgentRole::RuleAnalyzer => Box::new(RuleAnalyzerAgent::new(self.reasoner.clone())),
            AgentRole::DataDictionary => Box::new(DataDictionaryAgent::new(self.reasoner.clone())),
            AgentRole::CypherGenerator => {
                Box::new(CypherGeneratorAgent::new(self.reasoner.clone()))
            }
            AgentRole::Validator => Box::new(ValidatorAgent::new(SandboxGraph::new(
                self.graph.clone(),
                session_id,
            ))),
            AgentRole::ReferenceData => Box::new(ReferenceDataAgent::new(
                self.reasoner.clone(),
                self.graph.clone(),
            )),
        }
    }

    async fn finish_complete(&self, mut state: WorkflowState) -> WorkflowState {
        state.phase = Phase::Complete;
        state.succeeded = true;
        log::info!(
            "Session {} complete after {} retries",
            state.session_id,
            state.iteration
        );

        self.teardown_sandbox(state.session_id).await;
        self.store
            .append(
                AuditEvent::new(AuditEventKind::WorkflowCompleted, state.session_id)
                    .payload(json!({ "iterations": state.iteration })),
            )
            .await;
        self.broadcaster
            .publish(
                AgentEvent::new(
                    ProgressKind::WorkflowCompleted,
                    state.session_id,
                    Phase::Complete,
                    "wizard session complete",
                )
                .progress(100),
            )
            .await;
        self.broadcaster.close_session(state.session_id).await;

        state
    }

    async fn finish_failed(&self, mut state: WorkflowState, reason: String) -> WorkflowState {
        state.phase = Phase::Failed;
        state.error = Some(reason.clone());
        log::warn!("Session {} failed: {}", state.session_id, reason);

        self.teardown_sandbox(state.session_id).await;
        self.store
            .append(AuditEvent::new(AuditEventKind::WorkflowFailed, state.session_id).error(reason.clone()))
            .await;
        self.broadcaster
            .publish(AgentEvent::new(
                ProgressKind::WorkflowFailed,
                state.session_id,
                Phase::Failed,
                reason,
            ))
            .await;
        self.broadcaster.close_session(state.session_id).await;

        state
    }

    async fn teardown_sandbox(&self, session_id: Uuid) {
        SandboxGraph::new(self.graph.clone(), session_id)
            .teardown()
            .await;
    }
}
