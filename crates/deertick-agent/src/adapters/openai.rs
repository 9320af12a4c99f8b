use super::{bearer, ChatRequest, ParsedReply};
use crate::transport::HttpRequest;

/// Attribution headers sent to OpenRouter.
pub const OPENROUTER_REFERER: &str = "https://github.com/deertick/deertick";
pub const OPENROUTER_TITLE: &str = "DeerTick";

fn build_messages(request: &ChatRequest<'_>) -> serde_json::Value {
    serde_json::json!([
        {"role": "system", "content": request.system_prompt},
        {"role": "user", "content": request.prompt},
    ])
}

/// Chat completions body for OpenAI and compatible servers.
pub fn build_request(endpoint: &str, token: &str, request: &ChatRequest<'_>) -> HttpRequest {
    let s = request.settings;
    let mut body = serde_json::json!({
        "model": request.model,
        "messages": build_messages(request),
        "temperature": s.temperature,
        "top_p": s.top_p,
        "max_tokens": s.max_tokens,
        "presence_penalty": s.presence_penalty,
        "frequency_penalty": s.frequency_penalty,
    });

    if !s.stop.is_empty() {
        body["stop"] = serde_json::json!(s.stop);
    }
    if !s.logit_bias.is_empty() {
        body["logit_bias"] = serde_json::json!(s.logit_bias);
    }
    if !s.tools.is_empty() {
        body["tools"] = serde_json::json!(s.tools);
    }
    if let Some(format) = &s.response_format {
        body["response_format"] = format.clone();
    }

    HttpRequest::new(endpoint, body)
        .header("Authorization", bearer(token))
        .header("Content-Type", "application/json")
}

/// OpenRouter accepts the OpenAI shape, but only the common sampling knobs are forwarded.
pub fn build_openrouter_request(
    endpoint: &str,
    token: &str,
    request: &ChatRequest<'_>,
) -> HttpRequest {
    let s = request.settings;
    let body = serde_json::json!({
        "model": request.model,
        "messages": build_messages(request),
        "max_tokens": s.max_tokens,
        "temperature": s.temperature,
        "top_p": s.top_p,
        "presence_penalty": s.presence_penalty,
        "frequency_penalty": s.frequency_penalty,
    });

    HttpRequest::new(endpoint, body)
        .header("Authorization", bearer(token))
        .header("Content-Type", "application/json")
        .header("HTTP-Referer", OPENROUTER_REFERER)
        .header("X-Title", OPENROUTER_TITLE)
}

/// Extract `choices[0].message.content`.
pub fn parse_response(body: &serde_json::Value) -> ParsedReply {
    let Some(message) = body["choices"].get(0).and_then(|c| c.get("message")) else {
        return ParsedReply::Unrecognized;
    };
    match message.get("content") {
        Some(serde_json::Value::String(text)) => ParsedReply::from_text(text.clone()),
        // Tool-call replies carry a null content.
        Some(serde_json::Value::Null) | None => ParsedReply::Empty,
        Some(_) => ParsedReply::Unrecognized,
    }
}
