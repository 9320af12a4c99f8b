use super::{bearer, ChatRequest, ParsedReply};
use crate::transport::HttpRequest;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Messages API body; the system prompt travels outside the message list.
pub fn build_request(endpoint: &str, token: &str, request: &ChatRequest<'_>) -> HttpRequest {
    let s = request.settings;
    let mut body = serde_json::json!({
        "model": request.model,
        "max_tokens": s.max_tokens,
        "messages": [{"role": "user", "content": request.prompt}],
        "temperature": s.temperature,
        "top_p": s.top_p,
        "top_k": s.top_k,
    });
    if !request.system_prompt.is_empty() {
        body["system"] = serde_json::json!(request.system_prompt);
    }
    if !s.stop.is_empty() {
        body["stop_sequences"] = serde_json::json!(s.stop);
    }

    HttpRequest::new(endpoint, body)
        .header("Authorization", bearer(token))
        .header("x-api-key", token)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .header("Content-Type", "application/json")
}

/// Concatenate every `text` block of `content`.
pub fn parse_response(body: &serde_json::Value) -> ParsedReply {
    let Some(blocks) = body["content"].as_array() else {
        return ParsedReply::Unrecognized;
    };
    let text: String = blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect();
    ParsedReply::from_text(text)
}
