// SPDX-License-Identifier: MIT

//! Workflow state for one wizard session
//!
//! A single `WorkflowState` is threaded through every step of a session.
//! The engine owns it exclusively; executors see a read-only borrow and
//! hand back partial updates as [`RoleOutput`] values.

use crate::error::WorkflowError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Named stage of the workflow, also the engine's state-machine state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Supervisor,
    RuleAnalyzer,
    DataDictionary,
    CypherGenerator,
    Validator,
    ReferenceData,
    HumanReview,
    Complete,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Complete | Phase::Failed)
    }
}

/// The agent roles the supervisor can dispatch to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    RuleAnalyzer,
    DataDictionary,
    CypherGenerator,
    Validator,
    ReferenceData,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::RuleAnalyzer => "rule_analyzer",
            AgentRole::DataDictionary => "data_dictionary",
            AgentRole::CypherGenerator => "cypher_generator",
            AgentRole::Validator => "validator",
            AgentRole::ReferenceData => "reference_data",
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            AgentRole::RuleAnalyzer => Phase::RuleAnalyzer,
            AgentRole::DataDictionary => Phase::DataDictionary,
            AgentRole::CypherGenerator => Phase::CypherGenerator,
            AgentRole::Validator => Phase::Validator,
            AgentRole::ReferenceData => Phase::ReferenceData,
        }
    }
}

/// Immutable inputs for one wizard session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardRequest {
    pub origin_jurisdiction: String,
    pub scenario_type: String,
    pub receiving_jurisdictions: Vec<String>,
    pub rule_text: String,
    #[serde(default)]
    pub data_categories: Vec<String>,
    #[serde(default)]
    pub pii_involved: bool,
    /// Per-request override of the configured retry budget
    pub max_iterations: Option<u32>,
}

impl WizardRequest {
    /// Reject invalid invocations before any workflow state exists
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.rule_text.trim().is_empty() {
            return Err(WorkflowError::EmptyRuleText);
        }
        if self.receiving_jurisdictions.is_empty() {
            return Err(WorkflowError::NoReceivingJurisdictions);
        }
        if self.max_iterations == Some(0) {
            return Err(WorkflowError::ZeroIterations);
        }
        Ok(())
    }
}

/// One condition extracted from the rule text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCondition {
    pub attribute: String,
    pub operator: String,
    pub value: serde_json::Value,
}

/// Structured reading of the natural-language rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleAnalysis {
    pub rule_name: String,
    pub summary: String,
    /// Whether the rule matches on data attributes (drives dictionary generation)
    #[serde(default)]
    pub attribute_based: bool,
    #[serde(default)]
    pub attributes: Vec<String>,
    /// Whether new reference data (e.g. country groupings) must be created
    #[serde(default)]
    pub requires_reference_data: bool,
    #[serde(default)]
    pub referenced_groups: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
}

/// Keyword taxonomy entry for one data attribute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub attribute: String,
    pub keywords: Vec<String>,
}

/// Attribute-keyword dictionary backing attribute-based rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataDictionary {
    pub entries: Vec<DictionaryEntry>,
}

/// One generated graph query with its stated purpose
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CypherQuery {
    pub purpose: String,
    pub cypher: String,
}

/// The generated query set for the rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQueries {
    pub queries: Vec<CypherQuery>,
}

/// Outcome of sandbox validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    /// Feedback handed to the failing role on retry
    pub feedback: Option<String>,
    /// Which role the failure is attributed to
    pub failing_role: Option<AgentRole>,
}

/// A named country grouping synthesized as reference data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryGroup {
    pub name: String,
    pub members: Vec<String>,
}

/// Reference data created alongside the rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceData {
    pub groups: Vec<CountryGroup>,
}

/// Tagged partial update produced by one executor invocation.
///
/// One variant per role keeps the supervisor's decision logic statically
/// checked against which fields can exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RoleOutput {
    Analysis(RuleAnalysis),
    Dictionary(DataDictionary),
    Queries(GeneratedQueries),
    Validation(ValidationResult),
    Reference(ReferenceData),
}

impl RoleOutput {
    pub fn role(&self) -> AgentRole {
        match self {
            RoleOutput::Analysis(_) => AgentRole::RuleAnalyzer,
            RoleOutput::Dictionary(_) => AgentRole::DataDictionary,
            RoleOutput::Queries(_) => AgentRole::CypherGenerator,
            RoleOutput::Validation(_) => AgentRole::Validator,
            RoleOutput::Reference(_) => AgentRole::ReferenceData,
        }
    }
}

/// A transient or fatal failure reported by an executor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentFailure {
    pub role: AgentRole,
    pub reason: String,
    pub fatal: bool,
}

/// One entry of the ordered communication log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommRecord {
    pub agent: String,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
}

/// The single mutable record threaded through every step of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub session_id: Uuid,
    pub request: WizardRequest,
    pub phase: Phase,
    /// Count of validation-failure retries, bounded by `max_iterations`
    pub iteration: u32,
    pub max_iterations: u32,
    pub analysis: Option<RuleAnalysis>,
    pub dictionary: Option<DataDictionary>,
    pub queries: Option<GeneratedQueries>,
    pub validation: Option<ValidationResult>,
    pub reference: Option<ReferenceData>,
    /// Validator/supervisor feedback for the next retried role
    pub retry_feedback: Option<String>,
    /// Question raised by an executor that needs a human answer
    pub pending_question: Option<String>,
    /// Human answer supplied on resumption
    pub clarification: Option<String>,
    pub log: Vec<CommRecord>,
    pub last_failure: Option<AgentFailure>,
    pub succeeded: bool,
    pub error: Option<String>,
}

impl WorkflowState {
    /// Validate the request and open a fresh session
    pub fn new(
        mut request: WizardRequest,
        default_max_iterations: u32,
    ) -> Result<Self, WorkflowError> {
        request.validate()?;
        // Receiving jurisdictions are an ordered set
        let mut seen = std::collections::HashSet::new();
        request
            .receiving_jurisdictions
            .retain(|j| seen.insert(j.clone()));
        let max_iterations = request.max_iterations.unwrap_or(default_max_iterations);

        Ok(Self {
            session_id: Uuid::new_v4(),
            request,
            phase: Phase::Supervisor,
            iteration: 0,
            max_iterations,
            analysis: None,
            dictionary: None,
            queries: None,
            validation: None,
            reference: None,
            retry_feedback: None,
            pending_question: None,
            clarification: None,
            log: Vec::new(),
            last_failure: None,
            succeeded: false,
            error: None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Merge one role's output, invalidating everything derived from it.
    ///
    /// A regenerated analysis obsoletes the dictionary, queries and
    /// verdict built on the old one; a regenerated dictionary obsoletes
    /// queries and verdict; regenerated queries obsolete the verdict.
    pub fn apply(&mut self, output: RoleOutput) {
        match output {
            RoleOutput::Analysis(analysis) => {
                self.analysis = Some(analysis);
                self.dictionary = None;
                self.queries = None;
                self.validation = None;
            }
            RoleOutput::Dictionary(dictionary) => {
                self.dictionary = Some(dictionary);
                self.queries = None;
                self.validation = None;
            }
            RoleOutput::Queries(queries) => {
                self.queries = Some(queries);
                self.validation = None;
            }
            RoleOutput::Validation(validation) => {
                self.validation = Some(validation);
            }
            RoleOutput::Reference(reference) => {
                self.reference = Some(reference);
            }
        }
        self.last_failure = None;
    }

    /// Append to the ordered communication log
    pub fn record(&mut self, agent: &str, summary: impl Into<String>) {
        self.log.push(CommRecord {
            agent: agent.to_string(),
            summary: summary.into(),
            timestamp: Utc::now(),
        });
    }
}
