// SPDX-License-Identifier: MIT

//! Live progress events and the per-session broadcaster
//!
//! Progress events are transient: fanned out to whoever is listening at
//! the moment, never persisted. A new listener sees events from its
//! subscription onward, preceded by an immediate heartbeat.

use super::state::Phase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

/// Progress event types streamed to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    WorkflowStarted,
    AgentStarted,
    AgentCompleted,
    AgentFailed,
    HumanReviewRequested,
    WorkflowCompleted,
    WorkflowFailed,
    Heartbeat,
}

/// Lightweight progress record for live streams
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    pub kind: ProgressKind,
    pub session_id: Uuid,
    pub agent: Option<String>,
    pub phase: Phase,
    pub message: String,
    pub payload: Option<serde_json::Value>,
    /// Rough completion percentage, when the phase implies one
    pub progress: Option<u8>,
    pub timestamp: DateTime<Utc>,
}

impl AgentEvent {
    pub fn new(kind: ProgressKind, session_id: Uuid, phase: Phase, message: impl Into<String>) -> Self {
        Self {
            kind,
            session_id,
            agent: None,
            phase,
            message: message.into(),
            payload: None,
            progress: None,
            timestamp: Utc::now(),
        }
    }

    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn progress(mut self, percent: u8) -> Self {
        self.progress = Some(percent.min(100));
        self
    }

    pub fn heartbeat(session_id: Uuid, phase: Phase) -> Self {
        Self::new(ProgressKind::Heartbeat, session_id, phase, "keep-alive")
    }
}

/// Concurrency-safe per-session fan-out of progress events.
///
/// Broadcast and workflow advancement run on independent control paths;
/// a slow or disconnected listener never blocks the engine (lagging
/// receivers simply drop events).
#[derive(Clone)]
pub struct ProgressBroadcaster {
    channels: Arc<RwLock<HashMap<Uuid, broadcast::Sender<AgentEvent>>>>,
    heartbeat_interval: Duration,
}

impl ProgressBroadcaster {
    pub fn new(heartbeat_interval: Duration) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            heartbeat_interval,
        }
    }

    async fn sender(&self, session_id: Uuid) -> broadcast::Sender<AgentEvent> {
        let mut channels = self.channels.write().await;
        channels
            .entry(session_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Publish one event to the session's listeners (no-op without any)
    pub async fn publish(&self, event: AgentEvent) {
        let sender = self.sender(event.session_id).await;
        let _ = sender.send(event);
    }

    /// Close a session's channel once it reaches a terminal state so
    /// attached streams end instead of idling on heartbeats forever.
    pub async fn close_session(&self, session_id: Uuid) {
        let mut channels = self.channels.write().await;
        channels.remove(&session_id);
    }

    /// Subscribe to a session's events from this point onward.
    ///
    /// The returned stream opens with a heartbeat, then carries every
    /// substantive event, interleaving a heartbeat whenever nothing has
    /// been emitted for the configured interval. It ends when the session
    /// is closed or the listener is dropped.
    pub async fn subscribe(&self, session_id: Uuid) -> ReceiverStream<AgentEvent> {
        let mut rx = self.sender(session_id).await.subscribe();
        let heartbeat_interval = self.heartbeat_interval;
        let (tx, out) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut phase = Phase::Supervisor;

            if tx
                .send(AgentEvent::heartbeat(session_id, phase))
                .await
                .is_err()
            {
                return;
            }

            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Ok(event) => {
                            phase = event.phase;
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            log::warn!(
                                "Listener on session {} lagged, dropped {} events",
                                session_id,
                                missed
                            );
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = tokio::time::sleep(heartbeat_interval) => {
                        if tx
                            .send(AgentEvent::heartbeat(session_id, phase))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                }
            }
        });

        ReceiverStream::new(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_subscriber_gets_immediate_heartbeat() {
        let broadcaster = ProgressBroadcaster::new(Duration::from_secs(60));
        let session = Uuid::new_v4();

        let mut stream = broadcaster.subscribe(session).await;
        let first = stream.next().await.unwrap();
        assert_eq!(first.kind, ProgressKind::Heartbeat);
    }

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let broadcaster = ProgressBroadcaster::new(Duration::from_secs(60));
        let session = Uuid::new_v4();

        let mut stream = broadcaster.subscribe(session).await;
        // Consume the opening heartbeat
        let _ = stream.next().await.unwrap();

        broadcaster
            .publish(AgentEvent::new(
                ProgressKind::AgentStarted,
                session,
                Phase::RuleAnalyzer,
                "analyzing",
            ))
            .await;
        broadcaster
            .publish(AgentEvent::new(
                ProgressKind::AgentCompleted,
                session,
                Phase::RuleAnalyzer,
                "analyzed",
            ))
            .await;

        let first = stream.next().await.unwrap();
        let second = stream.next().await.unwrap();
        assert_eq!(first.kind, ProgressKind::AgentStarted);
        assert_eq!(second.kind, ProgressKind::AgentCompleted);
    }

    #[tokio::test]
    async fn test_heartbeat_on_idle_session() {
        let broadcaster = ProgressBroadcaster::new(Duration::from_millis(20));
        let session = Uuid::new_v4();

        let mut stream = broadcaster.subscribe(session).await;
        let _ = stream.next().await.unwrap();

        // No substantive events published; the idle interval elapses
        let next = tokio::time::timeout(Duration::from_millis(200), stream.next())
            .await
            .expect("expected a heartbeat before the timeout")
            .unwrap();
        assert_eq!(next.kind, ProgressKind::Heartbeat);
    }

    #[tokio::test]
    async fn test_stream_ends_when_session_closes() {
        let broadcaster = ProgressBroadcaster::new(Duration::from_secs(60));
        let session = Uuid::new_v4();

        let mut stream = broadcaster.subscribe(session).await;
        let _ = stream.next().await.unwrap();

        broadcaster.close_session(session).await;

        let next = tokio::time::timeout(Duration::from_millis(200), stream.next())
            .await
            .expect("stream should end promptly");
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn test_listener_sees_only_events_after_subscription() {
        let broadcaster = ProgressBroadcaster::new(Duration::from_secs(60));
        let session = Uuid::new_v4();

        broadcaster
            .publish(AgentEvent::new(
                ProgressKind::AgentStarted,
                session,
                Phase::RuleAnalyzer,
                "before subscription",
            ))
            .await;

        let mut stream = broadcaster.subscribe(session).await;
        let _ = stream.next().await.unwrap();

        broadcaster
            .publish(AgentEvent::new(
                ProgressKind::AgentCompleted,
                session,
                Phase::RuleAnalyzer,
                "after subscription",
            ))
            .await;

        let event = stream.next().await.unwrap();
        assert_eq!(event.message, "after subscription");
    }
}
