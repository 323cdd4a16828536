// SPDX-License-Identifier: MIT

//! Graph-database boundary
//!
//! The engine consults the graph store through one narrow interface:
//! execute a query, get rows or an error. Database internals (schema,
//! drivers, the production rule set) live behind the gateway.

pub mod http;
pub mod sandbox;

use crate::error::WeaverError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Rows returned by a graph query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Narrow query-execution interface to the graph database.
///
/// Errors from this boundary are validation failures for the workflow,
/// never engine faults.
#[async_trait]
pub trait GraphClient: Send + Sync {
    /// Execute one query against the named graph namespace
    async fn execute(&self, graph: &str, query: &str) -> Result<QueryResult, WeaverError>;

    /// Drop an entire graph namespace (used for sandbox teardown)
    async fn drop_graph(&self, graph: &str) -> Result<(), WeaverError>;
}

/// The production graph namespace that promoted rules live in
pub const PRODUCTION_GRAPH: &str = "compliance_rules";
