use super::{bearer, ChatRequest, ParsedReply};
use crate::transport::HttpRequest;

/// Predictions body. The model reference travels as `version`, and the
/// prompt template lets the backend assemble the chat turns itself.
pub fn build_request(endpoint: &str, token: &str, request: &ChatRequest<'_>) -> HttpRequest {
    let s = request.settings;
    let body = serde_json::json!({
        "version": request.model,
        "input": {
            "prompt": request.prompt,
            "system_prompt": request.system_prompt,
            "max_tokens": s.max_tokens,
            "min_tokens": s.min_tokens,
            "temperature": s.temperature,
            "top_p": s.top_p,
            "top_k": s.top_k,
            "presence_penalty": s.presence_penalty,
            "frequency_penalty": s.frequency_penalty,
            "prompt_template": s.prompt_template,
        },
    });

    HttpRequest::new(endpoint, body)
        .header("Authorization", bearer(token))
        .header("Content-Type", "application/json")
        .header("Prefer", "wait")
}

/// `output` is either a string or a list of streamed string fragments.
pub fn parse_response(body: &serde_json::Value) -> ParsedReply {
    match body.get("output") {
        Some(serde_json::Value::String(text)) => ParsedReply::from_text(text.clone()),
        Some(serde_json::Value::Array(parts)) => {
            let text: String = parts.iter().filter_map(|p| p.as_str()).collect();
            ParsedReply::from_text(text)
        }
        Some(serde_json::Value::Null) => ParsedReply::Empty,
        _ => ParsedReply::Unrecognized,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::GenerationSettings;

    #[test]
    fn test_build_request() {
        let settings = GenerationSettings::default();
        let req = build_request(
            "https://api.replicate.com/v1/predictions",
            "r8_x",
            &ChatRequest {
                model: "meta/meta-llama-3-8b-instruct",
                system_prompt: "sys",
                prompt: "hello",
                settings: &settings,
            },
        );
        assert_eq!(req.header_value("prefer"), Some("wait"));
        assert_eq!(req.header_value("authorization"), Some("Bearer r8_x"));
        assert_eq!(req.body["version"], "meta/meta-llama-3-8b-instruct");
        assert_eq!(req.body["input"]["prompt"], "hello");
        assert_eq!(req.body["input"]["min_tokens"], 0);
        assert!(req.body["input"]["prompt_template"]
            .as_str()
            .unwrap()
            .contains("{system_prompt}"));
        // Not understood by the predictions API.
        assert!(req.body["input"].get("stop").is_none());
        assert!(req.body["input"].get("logit_bias").is_none());
    }

    #[test]
    fn test_parse_response() {
        let joined = serde_json::json!({"status": "succeeded", "output": ["Hel", "lo", "!"]});
        assert_eq!(parse_response(&joined), ParsedReply::Content("Hello!".into()));

        let single = serde_json::json!({"output": "done"});
        assert_eq!(parse_response(&single), ParsedReply::Content("done".into()));

        assert_eq!(parse_response(&serde_json::json!({"output": []})), ParsedReply::Empty);
        assert_eq!(parse_response(&serde_json::json!({"output": null})), ParsedReply::Empty);
        assert_eq!(
            parse_response(&serde_json::json!({"detail": "not found"})),
            ParsedReply::Unrecognized
        );
    }
}
