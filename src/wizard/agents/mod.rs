// SPDX-License-Identifier: MIT

//! Agent executors
//!
//! One module per role:
//! - [`rule_analyzer`] - reads the rule text into a structured analysis
//! - [`data_dictionary`] - keyword dictionaries for attribute-based rules
//! - [`cypher_generator`] - graph queries implementing the rule
//! - [`validator`] - sandbox execution of the generated queries
//! - [`reference_data`] - country groupings the rule depends on

mod cypher_generator;
mod data_dictionary;
mod reference_data;
mod rule_analyzer;
mod validator;

pub use cypher_generator::CypherGeneratorAgent;
pub use data_dictionary::DataDictionaryAgent;
pub use reference_data::ReferenceDataAgent;
pub use rule_analyzer::RuleAnalyzerAgent;
pub use validator::ValidatorAgent;

use crate::wizard::state::WorkflowState;
use std::fmt::Write;

/// Shared request context included in every reasoning prompt
pub(crate) fn request_context(state: &WorkflowState) -> String {
    let request = &state.request;
    let mut context = String::new();

    let _ = writeln!(context, "Rule text: {}", request.rule_text);
    let _ = writeln!(context, "Origin jurisdiction: {}", request.origin_jurisdiction);
    let _ = writeln!(
        context,
        "Receiving jurisdictions: {}",
        request.receiving_jurisdictions.join(", ")
    );
    let _ = writeln!(context, "Scenario type: {}", request.scenario_type);
    if !request.data_categories.is_empty() {
        let _ = writeln!(
            context,
            "Data categories: {}",
            request.data_categories.join(", ")
        );
    }
    let _ = writeln!(context, "Involves PII: {}", request.pii_involved);

    if let Some(clarification) = &state.clarification {
        let _ = writeln!(context, "\nHuman clarification: {}", clarification);
    }
    if let Some(feedback) = &state.retry_feedback {
        let _ = writeln!(
            context,
            "\nA previous attempt failed validation. Feedback: {}",
            feedback
        );
    }

    context
}
