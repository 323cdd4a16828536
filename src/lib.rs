// SPDX-License-Identifier: MIT

//! ruleweaver - multi-agent wizard engine for cross-border
//! data-transfer compliance rules
//!
//! A supervisor-directed state machine turns a natural-language
//! compliance rule into a structured rule definition and validated
//! graph queries, streaming progress to attached listeners along the
//! way. See the [`wizard`] module for the orchestration core and
//! [`llm`]/[`graph`] for the external service boundaries.

pub mod config;
pub mod error;
pub mod graph;
pub mod llm;
pub mod wizard;
