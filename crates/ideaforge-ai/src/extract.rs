//! Pulls a JSON object out of free-text model output.
//!
//! Models frequently wrap the requested object in prose or markdown code
//! fences. The outermost `{ ... }` span is taken as the payload, parsed,
//! and then checked against the structure the prompt asked for. Anything
//! that does not match is rejected.

use crate::error::{AiError, Result};
use ideaforge_common::analysis::{ANALYSIS_SECTIONS, ONE_PAGER_SECTIONS, PITCH_DECK_SLIDES};
use serde_json::{Map, Value};

/// Expected structure of a model reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// The seven-section idea analysis.
    Analysis,
    /// `{ "slides": [ ...10 slides with a title... ] }`
    PitchDeck,
    /// Ten non-empty string sections.
    OnePager,
}

/// Returns the span from the first `{` to the last `}` inclusive, or the
/// trimmed input when no such pair exists.
///
/// # Examples
///
/// ```
/// use ideaforge_ai::extract::extract_json_block;
///
/// let reply = "Sure! Here it is:\n```json\n{\"a\": 1}\n```\nLet me know.";
/// assert_eq!(extract_json_block(reply), "{\"a\": 1}");
/// assert_eq!(extract_json_block("  no json here "), "no json here");
/// ```
pub fn extract_json_block(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text.trim(),
    }
}

/// Extracts, parses and shape-checks a JSON object from model output.
pub fn parse_json_object(text: &str, shape: Shape) -> Result<Value> {
    let candidate = extract_json_block(text);
    let value: Value = serde_json::from_str(candidate)?;
    let Value::Object(map) = &value else {
        return Err(AiError::UnexpectedShape(
            "top-level value is not an object".to_string(),
        ));
    };
    check_shape(map, shape).map_err(AiError::UnexpectedShape)?;
    Ok(value)
}

fn check_shape(map: &Map<String, Value>, shape: Shape) -> std::result::Result<(), String> {
    match shape {
        Shape::Analysis => check_analysis(map),
        Shape::PitchDeck => check_pitch_deck(map),
        Shape::OnePager => check_one_pager(map),
    }
}

fn check_analysis(map: &Map<String, Value>) -> std::result::Result<(), String> {
    for key in ANALYSIS_SECTIONS {
        let section = map
            .get(key)
            .ok_or_else(|| format!("missing key '{key}'"))?;
        let ok = if key == "risks" {
            section.is_array()
        } else {
            section.is_object()
        };
        if !ok {
            let expected = if key == "risks" { "an array" } else { "an object" };
            return Err(format!("'{key}' must be {expected}"));
        }
    }
    Ok(())
}

fn check_pitch_deck(map: &Map<String, Value>) -> std::result::Result<(), String> {
    let slides = map
        .get("slides")
        .and_then(Value::as_array)
        .ok_or_else(|| "missing 'slides' array".to_string())?;
    if slides.len() != PITCH_DECK_SLIDES.len() {
        return Err(format!(
            "expected {} slides, got {}",
            PITCH_DECK_SLIDES.len(),
            slides.len()
        ));
    }
    for (idx, slide) in slides.iter().enumerate() {
        let has_title = slide
            .get("title")
            .and_then(Value::as_str)
            .is_some_and(|t| !t.trim().is_empty());
        if !has_title {
            return Err(format!("slide {} has no title", idx + 1));
        }
    }
    Ok(())
}

fn check_one_pager(map: &Map<String, Value>) -> std::result::Result<(), String> {
    for key in ONE_PAGER_SECTIONS {
        let filled = map
            .get(key)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty());
        if !filled {
            return Err(format!("section '{key}' is missing or empty"));
        }
    }
    Ok(())
}
