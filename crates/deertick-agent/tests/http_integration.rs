//! End-to-end agent calls against a mock HTTP server.

use deertick_agent::{
    Agent, AgentOptions, HttpRequest, HttpTransport, MediaGenerator, ModelCatalog,
    ReplicateMedia, ReqwestTransport,
};
use deertick_core::ModelKind;
use deertick_security::Credentials;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport() -> Arc<ReqwestTransport> {
    Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap())
}

fn options(server: &MockServer) -> AgentOptions {
    AgentOptions {
        rate_limit_ms: 0,
        api_base_url: Some(server.uri()),
        ..AgentOptions::default()
    }
}

fn credentials() -> Arc<Credentials> {
    Arc::new(
        Credentials::new()
            .with_token("openai", "sk-test")
            .with_token("anthropic", "ak-test")
            .with_token("replicate", "r8-test")
            .with_token("huggingface", "hf-test"),
    )
}

#[tokio::test]
async fn test_openai_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({"model": "gpt-4o"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Hello from mock"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut agent = Agent::builder("gpt-4o")
        .provider("openai")
        .options(options(&server))
        .build(&ModelCatalog::builtin(), credentials(), transport());

    let reply = agent.respond("sys", "hi").await.unwrap();
    assert_eq!(reply, "Hello from mock");
    assert_eq!(agent.conversation().turn_count(), 1);
}

#[tokio::test]
async fn test_anthropic_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "ak-test"))
        .and(header("authorization", "Bearer ak-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [{"type": "text", "text": "Claude says hi"}]
        })))
        .mount(&server)
        .await;

    let mut agent = Agent::builder("claude-3.5-sonnet")
        .options(options(&server))
        .build(&ModelCatalog::builtin(), credentials(), transport());

    assert_eq!(agent.provider_name(), "anthropic");
    assert_eq!(agent.respond("", "hi").await.unwrap(), "Claude says hi");
}

#[tokio::test]
async fn test_server_error_is_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let mut agent = Agent::builder("gpt-4o")
        .provider("openai")
        .options(options(&server))
        .build(&ModelCatalog::builtin(), credentials(), transport());

    let err = agent.respond("", "hi").await.unwrap_err();
    assert!(err.is_provider());
    assert!(err.to_string().contains("503"));
    assert!(agent.conversation().is_empty());
}

#[tokio::test]
async fn test_non_json_body_is_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let request = HttpRequest::new(format!("{}/anything", server.uri()), serde_json::json!({}));
    let err = transport().post_json(&request).await.unwrap_err();
    assert!(err.is_provider());
}

#[tokio::test]
async fn test_transport_timeout_is_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let slow = ReqwestTransport::new(Duration::from_millis(200)).unwrap();
    let request = HttpRequest::new(server.uri(), serde_json::json!({}));
    let err = slow.post_json(&request).await.unwrap_err();
    assert!(err.is_provider());
}

#[tokio::test]
async fn test_huggingface_model_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/mistralai/Mistral-7B-Instruct-v0.3"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{"generated_text": "hf reply"}])),
        )
        .mount(&server)
        .await;

    let mut agent = Agent::builder("mistral-7b-hf")
        .options(options(&server))
        .build(&ModelCatalog::builtin(), credentials(), transport());

    assert_eq!(agent.respond("", "hi").await.unwrap(), "hf reply");
}

#[tokio::test]
async fn test_replicate_image_download() {
    let server = MockServer::start().await;
    let image_url = format!("{}/files/out.webp", server.uri());
    Mock::given(method("POST"))
        .and(path("/v1/predictions"))
        .and(header("prefer", "wait"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "status": "succeeded",
            "output": [image_url]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/out.webp"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFwebp".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let media = ReplicateMedia::new(
        transport(),
        credentials(),
        dir.path().join("img"),
        dir.path().join("tts"),
    )
    .with_base_url(&server.uri());

    let saved = media
        .generate_visual(ModelKind::Image, "black-forest-labs/flux-schnell", "a deer")
        .await
        .unwrap();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].starts_with(dir.path().join("img")));
    assert_eq!(saved[0].extension().unwrap(), "webp");
    assert_eq!(std::fs::read(&saved[0]).unwrap(), b"RIFFwebp");
}

#[tokio::test]
async fn test_replicate_voice_through_agent() {
    let server = MockServer::start().await;
    let audio_url = format!("{}/files/speech.wav", server.uri());
    Mock::given(method("POST"))
        .and(path("/v1/predictions"))
        .and(body_partial_json(serde_json::json!({
            "input": {"speaker": "https://voices.example/doe.wav", "text": "hello"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"output": audio_url})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/speech.wav"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFF".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let media = ReplicateMedia::new(transport(), credentials(), dir.path().join("img"), dir.path().join("tts"))
        .with_base_url(&server.uri());

    let mut agent = Agent::builder("xtts-v2")
        .voice_sample("https://voices.example/doe.wav")
        .options(options(&server))
        .build(&ModelCatalog::builtin(), credentials(), transport());

    let reply = agent.generate_media(&media, "hello").await.unwrap();
    assert!(reply.ends_with(".wav"));
    assert!(reply.contains("xtts-v2_"));
    assert_eq!(agent.last_reply(), Some(reply.as_str()));
}
