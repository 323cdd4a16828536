// SPDX-License-Identifier: MIT

//! Supervisor router
//!
//! A pure function of the workflow state: given identical relevant
//! fields it returns the identical decision. The engine applies the
//! decision; nothing here mutates state.

use super::state::{AgentRole, WorkflowState};

/// The next step the engine must take
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Dispatch the named role
    Run(AgentRole),
    /// Increment the iteration counter, then dispatch the failing role
    /// with feedback describing what went wrong
    Retry { role: AgentRole, feedback: String },
    /// Suspend until a human answers the pending question
    HumanReview,
    /// Terminal success
    Complete,
    /// Terminal failure with an explanatory message
    Fail(String),
}

/// Decide the next step. Fixed precedence:
/// ambiguity, then pending failures, then the build order
/// (analysis, dictionary, queries, validation, reference data).
pub fn route(state: &WorkflowState) -> Decision {
    // Ambiguity suspends regardless of where the workflow stands
    if state.pending_question.is_some() {
        return Decision::HumanReview;
    }

    // A reported executor failure is eligible for the same
    // iteration-bounded retry as a validation failure
    if let Some(failure) = &state.last_failure {
        if failure.fatal {
            return Decision::Fail(format!(
                "{} failed fatally: {}",
                failure.role.as_str(),
                failure.reason
            ));
        }
        if state.iteration < state.max_iterations {
            return Decision::Retry {
                role: failure.role,
                feedback: failure.reason.clone(),
            };
        }
        return Decision::Fail(format!(
            "{} still failing after {} iterations: {}",
            failure.role.as_str(),
            state.max_iterations,
            failure.reason
        ));
    }

    let Some(analysis) = &state.analysis else {
        return Decision::Run(AgentRole::RuleAnalyzer);
    };

    if analysis.attribute_based && state.dictionary.is_none() {
        return Decision::Run(AgentRole::DataDictionary);
    }

    if state.queries.is_none() {
        return Decision::Run(AgentRole::CypherGenerator);
    }

    match &state.validation {
        None => Decision::Run(AgentRole::Validator),
        Some(verdict) if !verdict.passed => {
            let role = verdict.failing_role.unwrap_or(AgentRole::CypherGenerator);
            let feedback = verdict
                .feedback
                .clone()
                .unwrap_or_else(|| "validation failed".to_string());
            if state.iteration < state.max_iterations {
                Decision::Retry { role, feedback }
            } else {
                Decision::Fail(format!(
                    "Validation did not succeed within {} iterations: {}",
                    state.max_iterations, feedback
                ))
            }
        }
        Some(_) => {
            if analysis.requires_reference_data && state.reference.is_none() {
                Decision::Run(AgentRole::ReferenceData)
            } else {
                Decision::Complete
            }
        }
    }
}
