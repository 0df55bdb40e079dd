pub mod ollama;
pub mod openai;

use crate::llm::LlmError;
use tracing::debug;

/// Parses a model reply as JSON, tolerating a surrounding Markdown code fence
/// or leading prose before the first brace.
pub fn parse_json_reply(content: &str) -> Result<serde_json::Value, LlmError> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    // Try to extract JSON from between ```json and ``` markers
    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            let candidate = body[..end].trim();
            debug!("Extracted fenced JSON: {}", candidate);
            if let Ok(value) = serde_json::from_str(candidate) {
                return Ok(value);
            }
        }
    }

    // Last resort: outermost braces
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(LlmError::ResponseError(format!(
        "Model reply is not valid JSON: {}",
        content
    )))
}
