use serde_json::Value;

use crate::model::error::{ModelError, retryable, unavailable};

pub fn map_http_error(status: u16, body: &str) -> ModelError {
    let normalized_body = body.chars().take(240).collect::<String>();

    let mut err = match status {
        408 | 429 | 500 | 502 | 503 | 504 => {
            retryable(format!("model service returned status {}", status))
        }
        401 => unavailable("model service rejected the credential"),
        403 => unavailable("model service denied access"),
        _ => unavailable(format!("model service returned status {}", status)),
    }
    .with_provider_http_status(status);

    if !normalized_body.is_empty() {
        err.message = format!("{}: {}", err.message, normalized_body);
    }

    err
}

/// Pulls the assistant text out of a chat-completions payload.
pub fn extract_message_content(payload: &Value) -> Result<String, ModelError> {
    let message = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| unavailable("model response missing choices"))?;

    if let Some(refusal) = message.get("refusal").and_then(Value::as_str)
        && !refusal.trim().is_empty()
    {
        return Err(unavailable(format!("model refused: {}", refusal.trim())));
    }

    let content = match message.get("content") {
        Some(Value::String(text)) => text.clone(),
        // Some compatible servers return content parts instead of a string.
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    };

    if content.trim().is_empty() {
        return Err(unavailable("model response has no content"));
    }
    Ok(content)
}

pub fn strip_code_fence(text: &str) -> Option<String> {
    let text = text.trim();
    if !text.starts_with("```") {
        return None;
    }

    let mut lines = text.lines();
    let _first = lines.next()?;
    let mut body = Vec::new();
    for line in lines {
        if line.trim_start().starts_with("```") {
            break;
        }
        body.push(line);
    }
    Some(body.join("\n"))
}
