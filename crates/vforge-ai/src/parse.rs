//! Fail-closed parsing of analyzer output.

use vforge_models::ContentAnalysis;

use crate::error::{AiError, AiResult};

/// Strip a markdown code fence some models wrap JSON in.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Parse and check the analyzer's JSON payload.
///
/// A missing `scenes` array or any malformed scene is an error, never an
/// empty result.
pub fn parse_analysis(content: &str) -> AiResult<ContentAnalysis> {
    let body = strip_code_fence(content);
    if body.is_empty() {
        return Err(AiError::invalid_response("analysis response was empty"));
    }

    let analysis: ContentAnalysis = serde_json::from_str(body)
        .map_err(|e| AiError::invalid_response(format!("analysis JSON did not match: {}", e)))?;

    for (i, scene) in analysis.scenes.iter().enumerate() {
        scene
            .check()
            .map_err(|reason| AiError::invalid_response(format!("scene {}: {}", i, reason)))?;
    }

    Ok(analysis)
}
