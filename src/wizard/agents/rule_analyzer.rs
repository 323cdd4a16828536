// SPDX-License-Identifier: MIT

//! Rule analyzer - reads the natural-language rule into a structured analysis

use super::request_context;
use crate::llm::{structured, CompletionRequest, Reasoner};
use crate::wizard::executor::{Executor, ExecutorOutcome};
use crate::wizard::state::{AgentRole, RoleOutput, RuleAnalysis, WorkflowState};
use async_trait::async_trait;
use std::sync::Arc;

const INSTRUCTION: &str = "You are a compliance analyst for cross-border personal-data \
transfers. Read the rule and answer with a single JSON object with fields: rule_name, \
summary, attribute_based (bool), attributes (array of strings), requires_reference_data \
(bool), referenced_groups (array of strings), conditions (array of {attribute, operator, \
value}). If the rule is too ambiguous to analyze, answer instead with \
{\"ambiguous\": true, \"question\": \"<what you need to know>\"}.";

pub struct RuleAnalyzerAgent {
    reasoner: Arc<dyn Reasoner>,
}

impl RuleAnalyzerAgent {
    pub fn new(reasoner: Arc<dyn Reasoner>) -> Self {
        Self { reasoner }
    }

    fn build_request(&self, state: &WorkflowState) -> CompletionRequest {
        CompletionRequest::new(INSTRUCTION, request_context(state))
    }
}

#[async_trait]
impl Executor for RuleAnalyzerAgent {
    fn role(&self) -> AgentRole {
        AgentRole::RuleAnalyzer
    }

    async fn execute(&self, state: &WorkflowState) -> ExecutorOutcome {
        let request = self.build_request(state);
        let raw = match self.reasoner.complete(&request).await {
            Ok(raw) => raw,
            Err(e) => return ExecutorOutcome::failure(e.to_string()),
        };

        let Some(value) = structured::extract_json(&raw) else {
            return ExecutorOutcome::failure("Structured-output failure: no JSON in response");
        };

        if value["ambiguous"].as_bool().unwrap_or(false) {
            let question = value["question"]
                .as_str()
                .unwrap_or("The rule text is underspecified")
                .to_string();
            return ExecutorOutcome::NeedsHuman { question };
        }

        match serde_json::from_value::<RuleAnalysis>(value) {
            Ok(analysis) => ExecutorOutcome::Success(RoleOutput::Analysis(analysis)),
            Err(e) => ExecutorOutcome::failure(format!("Structured-output failure: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::agents::testing::ScriptedReasoner;
    use crate::wizard::state::WizardRequest;

    fn state() -> WorkflowState {
        WorkflowState::new(
            WizardRequest {
                origin_jurisdiction: "CountryA".to_string(),
                scenario_type: "transfer".to_string(),
                receiving_jurisdictions: vec!["CountryB".to_string()],
                rule_text: "transfers require explicit consent".to_string(),
                data_categories: vec!["health".to_string()],
                pii_involved: true,
                max_iterations: None,
            },
            3,
        )
        .unwrap()
    }

    const ANALYSIS_JSON: &str = r#"```json
{
  "rule_name": "explicit_consent_transfer",
  "summary": "Transfers out of CountryA require explicit consent",
  "attribute_based": false,
  "attributes": [],
  "requires_reference_data": false,
  "referenced_groups": [],
  "conditions": [{"attribute": "consent", "operator": "equals", "value": "explicit"}]
}
```"#;

    #[tokio::test]
    async fn test_parses_fenced_analysis() {
        let reasoner = Arc::new(ScriptedReasoner::always(ANALYSIS_JSON));
        let agent = RuleAnalyzerAgent::new(reasoner.clone());

        let outcome = agent.execute(&state()).await;
        match outcome {
            ExecutorOutcome::Success(RoleOutput::Analysis(analysis)) => {
                assert_eq!(analysis.rule_name, "explicit_consent_transfer");
                assert_eq!(analysis.conditions.len(), 1);
            }
            other => panic!("expected analysis, got {:?}", other),
        }
        assert_eq!(reasoner.calls(), 1);
    }

    #[tokio::test]
    async fn test_ambiguous_rule_escalates_to_human() {
        let reasoner = Arc::new(ScriptedReasoner::always(
            r#"{"ambiguous": true, "question": "Which consent standard applies?"}"#,
        ));
        let agent = RuleAnalyzerAgent::new(reasoner);

        match agent.execute(&state()).await {
            ExecutorOutcome::NeedsHuman { question } => {
                assert_eq!(question, "Which consent standard applies?");
            }
            other => panic!("expected NeedsHuman, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_garbage_response_is_structured_failure() {
        let reasoner = Arc::new(ScriptedReasoner::always("I cannot help with that."));
        let agent = RuleAnalyzerAgent::new(reasoner);

        match agent.execute(&state()).await {
            ExecutorOutcome::Failure { reason, fatal } => {
                assert!(reason.contains("Structured-output failure"));
                assert!(!fatal);
            }
            other => panic!("expected Failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_service_error_is_transient_failure() {
        let reasoner = Arc::new(ScriptedReasoner::new(vec![Err("503".to_string())]));
        let agent = RuleAnalyzerAgent::new(reasoner);

        match agent.execute(&state()).await {
            ExecutorOutcome::Failure { fatal, .. } => assert!(!fatal),
            other => panic!("expected Failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_prompt_carries_clarification() {
        let reasoner = Arc::new(ScriptedReasoner::always(ANALYSIS_JSON));
        let agent = RuleAnalyzerAgent::new(reasoner.clone());

        let mut state = state();
        state.clarification = Some("Use the strictest standard".to_string());
        let _ = agent.execute(&state).await;

        let prompts = reasoner.prompts.lock().unwrap();
        assert!(prompts[0].prompt.contains("Use the strictest standard"));
    }
}
