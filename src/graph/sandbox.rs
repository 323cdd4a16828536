// SPDX-License-Identifier: MIT

//! Disposable sandbox namespaces for query validation
//!
//! Generated queries are exercised in an isolated per-session graph
//! before anything touches the production rule set.

use super::{GraphClient, QueryResult};
use crate::error::WeaverError;
use std::sync::Arc;
use uuid::Uuid;

/// A session-scoped sandbox over the shared graph client
pub struct SandboxGraph {
    client: Arc<dyn GraphClient>,
    namespace: String,
}

impl SandboxGraph {
    pub fn new(client: Arc<dyn GraphClient>, session_id: Uuid) -> Self {
        Self {
            client,
            namespace: format!("wizard_sandbox_{}", session_id.simple()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Run one query inside the sandbox namespace
    pub async fn execute(&self, query: &str) -> Result<QueryResult, WeaverError> {
        self.client.execute(&self.namespace, query).await
    }

    /// Tear the sandbox down. Failures are logged, not propagated; a
    /// leaked namespace never blocks workflow completion.
    pub async fn teardown(&self) {
        if let Err(e) = self.client.drop_graph(&self.namespace).await {
            log::warn!("Failed to drop sandbox '{}': {}", self.namespace, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingClient {
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl GraphClient for RecordingClient {
        async fn execute(&self, graph: &str, query: &str) -> Result<QueryResult, WeaverError> {
            self.calls
                .lock()
                .unwrap()
                .push((graph.to_string(), query.to_string()));
            Ok(QueryResult::default())
        }

        async fn drop_graph(&self, _graph: &str) -> Result<(), WeaverError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sandbox_prefixes_namespace() {
        let client = Arc::new(RecordingClient {
            calls: Mutex::new(Vec::new()),
        });
        let session = Uuid::new_v4();
        let sandbox = SandboxGraph::new(client.clone(), session);

        sandbox.execute("MATCH (n) RETURN n").await.unwrap();

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.starts_with("wizard_sandbox_"));
        assert!(calls[0].0.contains(&session.simple().to_string()));
    }

    #[test]
    fn test_distinct_sessions_get_distinct_namespaces() {
        let client = Arc::new(RecordingClient {
            calls: Mutex::new(Vec::new()),
        });
        let a = SandboxGraph::new(client.clone(), Uuid::new_v4());
        let b = SandboxGraph::new(client, Uuid::new_v4());
        assert_ne!(a.namespace(), b.namespace());
    }
}
