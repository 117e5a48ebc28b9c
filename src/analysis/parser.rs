//! Parse analyzer replies into analysis results
//!
//! Analyzer backends are often LLM-fronted: the JSON may arrive wrapped in
//! prose or markdown fences. We cut out the outermost object and hand it to
//! the tolerant field reader in `result`.

use crate::analysis::result::AnalysisResult;
use crate::core::error::{ArenaError, Result};

/// Parse a raw analyzer reply
pub fn parse_analysis(response: &str, markers: &[String]) -> Result<AnalysisResult> {
    let json_str = extract_json(response)?;
    let value: serde_json::Value = serde_json::from_str(json_str).map_err(|e| {
        ArenaError::MalformedAnalysis(format!("Failed to parse analysis: {} - Response: {}", e, response))
    })?;
    AnalysisResult::from_json(&value, markers)
}

/// Extract JSON object from an analyzer reply (handles surrounding text)
pub fn extract_json(response: &str) -> Result<&str> {
    let start = response
        .find('{')
        .ok_or_else(|| ArenaError::MalformedAnalysis("No JSON found in response".into()))?;
    let end = response
        .rfind('}')
        .ok_or_else(|| ArenaError::MalformedAnalysis("No closing brace found in response".into()))?;
    if end < start {
        return Err(ArenaError::MalformedAnalysis("Closing brace before opening brace".into()));
    }
    Ok(&response[start..=end])
}
