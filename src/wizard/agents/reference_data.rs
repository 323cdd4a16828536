// SPDX-License-Identifier: MIT

//! Reference-data synthesis - country groupings the rule depends on

use super::request_context;
use crate::graph::{GraphClient, PRODUCTION_GRAPH};
use crate::llm::{structured, CompletionRequest, Reasoner};
use crate::wizard::executor::{Executor, ExecutorOutcome};
use crate::wizard::state::{AgentRole, ReferenceData, RoleOutput, WorkflowState};
use async_trait::async_trait;
use std::fmt::Write;
use std::sync::Arc;

const INSTRUCTION: &str = "You maintain reference data for a compliance graph. Given the \
named country groupings a rule refers to, list their member jurisdictions. Answer with a \
single JSON object: {\"groups\": [{\"name\": \"...\", \"members\": [\"...\"]}]}.";

pub struct ReferenceDataAgent {
    reasoner: Arc<dyn Reasoner>,
    graph: Arc<dyn GraphClient>,
}

impl ReferenceDataAgent {
    pub fn new(reasoner: Arc<dyn Reasoner>, graph: Arc<dyn GraphClient>) -> Self {
        Self { reasoner, graph }
    }

    fn build_request(&self, state: &WorkflowState) -> CompletionRequest {
        let mut prompt = request_context(state);
        if let Some(analysis) = &state.analysis {
            let _ = writeln!(
                prompt,
                "\nGroupings referenced by the rule: {}",
                analysis.referenced_groups.join(", ")
            );
        }
        CompletionRequest::new(INSTRUCTION, prompt)
    }

    fn merge_query(group_name: &str, member: &str) -> String {
        format!(
            "MERGE (g:CountryGroup {{name: '{}'}}) MERGE (c:Jurisdiction {{code: '{}'}}) \
             MERGE (c)-[:MEMBER_OF]->(g)",
            group_name.replace('\'', "\\'"),
            member.replace('\'', "\\'")
        )
    }
}

#[async_trait]
impl Executor for ReferenceDataAgent {
    fn role(&self) -> AgentRole {
        AgentRole::ReferenceData
    }

    async fn execute(&self, state: &WorkflowState) -> ExecutorOutcome {
        let request = self.build_request(state);
        let raw = match self.reasoner.complete(&request).await {
            Ok(raw) => raw,
            Err(e) => return ExecutorOutcome::failure(e.to_string()),
        };

        let Some(reference) = structured::extract_as::<ReferenceData>(&raw) else {
            return ExecutorOutcome::failure("Structured-output failure: no JSON in response");
        };

        for group in &reference.groups {
            for member in &group.members {
                let query = Self::merge_query(&group.name, member);
                if let Err(e) = self.graph.execute(PRODUCTION_GRAPH, &query).await {
                    return ExecutorOutcome::failure(format!(
                        "Failed to store group '{}': {}",
                        group.name, e
                    ));
                }
            }
        }

        ExecutorOutcome::Success(RoleOutput::Reference(reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WeaverError;
    use crate::graph::QueryResult;
    use crate::wizard::agents::testing::ScriptedReasoner;
    use crate::wizard::state::{RuleAnalysis, WizardRequest};
    use std::sync::Mutex;

    struct RecordingGraph {
        queries: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl GraphClient for RecordingGraph {
        async fn execute(&self, graph: &str, query: &str) -> Result<QueryResult, WeaverError> {
            assert_eq!(graph, PRODUCTION_GRAPH);
            if self.fail {
                return Err(WeaverError::graph("write refused"));
            }
            self.queries.lock().unwrap().push(query.to_string());
            Ok(QueryResult::default())
        }

        async fn drop_graph(&self, _graph: &str) -> Result<(), WeaverError> {
            Ok(())
        }
    }

    fn state() -> WorkflowState {
        let mut state = WorkflowState::new(
            WizardRequest {
                origin_jurisdiction: "CountryA".to_string(),
                scenario_type: "transfer".to_string(),
                receiving_jurisdictions: vec!["CountryB".to_string()],
                rule_text: "transfers to adequacy countries are permitted".to_string(),
                data_categories: vec![],
                pii_involved: true,
                max_iterations: None,
            },
            3,
        )
        .unwrap();
        state.analysis = Some(RuleAnalysis {
            rule_name: "adequacy_transfers".to_string(),
            summary: "adequacy countries allowed".to_string(),
            attribute_based: false,
            attributes: vec![],
            requires_reference_data: true,
            referenced_groups: vec!["adequacy_list".to_string()],
            conditions: vec![],
        });
        state
    }

    const GROUPS_JSON: &str =
        r#"{"groups": [{"name": "adequacy_list", "members": ["CountryB", "CountryC"]}]}"#;

    #[tokio::test]
    async fn test_groups_are_merged_into_production_graph() {
        let graph = Arc::new(RecordingGraph {
            queries: Mutex::new(Vec::new()),
            fail: false,
        });
        let agent = ReferenceDataAgent::new(Arc::new(ScriptedReasoner::always(GROUPS_JSON)), graph.clone());

        match agent.execute(&state()).await {
            ExecutorOutcome::Success(RoleOutput::Reference(reference)) => {
                assert_eq!(reference.groups.len(), 1);
                assert_eq!(reference.groups[0].members.len(), 2);
            }
            other => panic!("expected reference data, got {:?}", other),
        }

        let queries = graph.queries.lock().unwrap();
        assert_eq!(queries.len(), 2);
        assert!(queries[0].contains("adequacy_list"));
        assert!(queries[0].contains("MEMBER_OF"));
    }

    #[tokio::test]
    async fn test_graph_write_error_is_transient_failure() {
        let graph = Arc::new(RecordingGraph {
            queries: Mutex::new(Vec::new()),
            fail: true,
        });
        let agent = ReferenceDataAgent::new(Arc::new(ScriptedReasoner::always(GROUPS_JSON)), graph);

        match agent.execute(&state()).await {
            ExecutorOutcome::Failure { reason, fatal } => {
                assert!(reason.contains("adequacy_list"));
                assert!(!fatal);
            }
            other => panic!("expected Failure, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_query_escapes_quotes() {
        let query = ReferenceDataAgent::merge_query("o'group", "C'A");
        assert!(query.contains("o\\'group"));
        assert!(query.contains("C\\'A"));
    }
}
