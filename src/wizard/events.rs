// SPDX-License-Identifier: MIT

//! Audit events and the append-only per-session event store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Audit event types recorded for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventKind {
    WorkflowStarted,
    AgentInvoked,
    AgentCompleted,
    AgentFailed,
    HumanReviewRequested,
    WorkflowResumed,
    WorkflowCompleted,
    WorkflowFailed,
}

/// Immutable audit record. Created once, appended, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub kind: AuditEventKind,
    pub session_id: Uuid,
    pub agent: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: Option<u64>,
    pub payload: serde_json::Value,
    pub error: Option<String>,
    /// Links an invocation to its completion/failure event
    pub correlation_id: Option<Uuid>,
}

impl AuditEvent {
    pub fn new(kind: AuditEventKind, session_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            session_id,
            agent: None,
            timestamp: Utc::now(),
            duration_ms: None,
            payload: serde_json::Value::Null,
            error: None,
            correlation_id: None,
        }
    }

    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn duration_ms(mut self, millis: u64) -> Self {
        self.duration_ms = Some(millis);
        self
    }

    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn correlated(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// Append-only log of audit events, keyed by session.
///
/// Shared handle; constructed once per process and injected into the
/// engine and the HTTP layer.
#[derive(Clone)]
pub struct EventStore {
    events: Arc<RwLock<HashMap<Uuid, Vec<AuditEvent>>>>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn append(&self, event: AuditEvent) {
        let mut events = self.events.write().await;
        events.entry(event.session_id).or_default().push(event);
    }

    /// All events for a session, in append order
    pub async fn for_session(&self, session_id: Uuid) -> Vec<AuditEvent> {
        let events = self.events.read().await;
        events.get(&session_id).cloned().unwrap_or_default()
    }

    pub async fn session_count(&self) -> usize {
        self.events.read().await.len()
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}
