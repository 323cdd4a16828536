// SPDX-License-Identifier: MIT

//! Structured-output extraction from free-text reasoning responses
//!
//! Responses usually arrive as a fenced ```json block, sometimes as bare
//! JSON, sometimes as JSON buried in prose. Extraction tries each shape
//! in turn and returns `None` on garbage rather than raising.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Recover a JSON value from a raw reasoning-service response.
///
/// Order of attempts: direct parse, fenced code block, first-`{` to
/// last-`}` span. Returns `None` when no attempt yields valid JSON.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    if let Some(block) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str(block.trim()) {
            return Some(value);
        }
    }

    brace_span(trimmed).and_then(|span| serde_json::from_str(span).ok())
}

/// Recover and deserialize into a concrete type in one step
pub fn extract_as<T: DeserializeOwned>(text: &str) -> Option<T> {
    extract_json(text).and_then(|value| serde_json::from_value(value).ok())
}

/// Contents of the first fenced code block, tolerating a language tag
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    // Skip the optional language tag on the opening fence line
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

/// The first-`{` to last-`}` span, if both braces exist in order
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
