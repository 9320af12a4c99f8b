use super::{bearer, ChatRequest, ParsedReply};
use crate::transport::HttpRequest;

/// Text-generation inference request. The system prompt is prepended to the
/// input because the endpoint takes a single string.
pub fn build_request(endpoint: &str, token: &str, request: &ChatRequest<'_>) -> HttpRequest {
    let s = request.settings;
    let inputs = if request.system_prompt.is_empty() {
        request.prompt.to_string()
    } else {
        format!("{}\n\n{}", request.system_prompt, request.prompt)
    };
    let body = serde_json::json!({
        "inputs": inputs,
        "parameters": {
            "max_new_tokens": s.max_tokens,
            "temperature": s.temperature,
            "top_p": s.top_p,
            "top_k": s.top_k,
            "return_full_text": false,
        },
    });

    HttpRequest::new(format!("{endpoint}{}", request.model), body)
        .header("Authorization", bearer(token))
        .header("Content-Type", "application/json")
}

/// Extract `[0].generated_text`.
pub fn parse_response(body: &serde_json::Value) -> ParsedReply {
    match body.get(0).and_then(|first| first.get("generated_text")) {
        Some(serde_json::Value::String(text)) => ParsedReply::from_text(text.clone()),
        _ => ParsedReply::Unrecognized,
    }
}
