use crate::adapters::{ChatRequest, ParsedReply, ProviderAdapter};
use crate::catalog::ModelCatalog;
use crate::config::{AgentOptions, GenerationSettings, Provider, ToolDefinition};
use crate::context::ConversationState;
use crate::media::MediaGenerator;
use crate::transport::HttpTransport;
use deertick_core::{DeertickError, DeertickResult, ModelKind};
use deertick_security::{Credentials, RateLimiter};
use deertick_session::ConversationStore;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Construction parameters for an [`Agent`].
#[derive(Debug, Clone)]
pub struct AgentBuilder {
    model: String,
    nickname: Option<String>,
    provider: String,
    system_prompt: String,
    options: AgentOptions,
    voice_sample: Option<String>,
}

impl AgentBuilder {
    pub fn nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    /// Provider name, numeric index into the provider list, or empty for the
    /// model's preferred provider.
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn options(mut self, options: AgentOptions) -> Self {
        self.options = options;
        self
    }

    /// Reference audio URL for voice models.
    pub fn voice_sample(mut self, url: impl Into<String>) -> Self {
        self.voice_sample = Some(url.into());
        self
    }

    /// Resolve the model against the catalog and bind the provider.
    ///
    /// An unusable provider does not fail here; every later request reports
    /// it as a configuration error instead.
    pub fn build(
        self,
        catalog: &ModelCatalog,
        credentials: Arc<Credentials>,
        transport: Arc<dyn HttpTransport>,
    ) -> Agent {
        let info = catalog.find(&self.model);
        let model = info.map(|m| m.id.clone()).unwrap_or_else(|| self.model.clone());
        let kind = info.map(|m| m.kind).unwrap_or_default();
        let provider_name = catalog.resolve_provider(&self.provider, &self.model);
        let nickname = self.nickname.unwrap_or(self.model);
        let limiter = RateLimiter::from_millis(self.options.rate_limit_ms);

        let mut agent = Agent {
            model,
            nickname,
            kind,
            provider_name: String::new(),
            adapter: None,
            system_prompt: self.system_prompt,
            options: self.options,
            credentials,
            transport,
            limiter,
            conversation: ConversationState::new(),
            voice_sample: self.voice_sample,
        };
        agent.update_provider(&provider_name);
        agent
    }
}

/// One model binding with its own provider adapter, pacing and conversation.
pub struct Agent {
    model: String,
    nickname: String,
    kind: ModelKind,
    provider_name: String,
    adapter: Option<ProviderAdapter>,
    system_prompt: String,
    options: AgentOptions,
    credentials: Arc<Credentials>,
    transport: Arc<dyn HttpTransport>,
    limiter: RateLimiter,
    conversation: ConversationState,
    voice_sample: Option<String>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("model", &self.model)
            .field("nickname", &self.nickname)
            .field("kind", &self.kind)
            .field("provider", &self.provider_name)
            .field("history", &self.options.history)
            .field("rate_limit", &self.limiter.min_interval())
            .field("turns", &self.conversation.turn_count())
            .finish_non_exhaustive()
    }
}

impl Agent {
    pub fn builder(model: impl Into<String>) -> AgentBuilder {
        AgentBuilder {
            model: model.into(),
            nickname: None,
            provider: String::new(),
            system_prompt: String::new(),
            options: AgentOptions::default(),
            voice_sample: None,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// Whether the bound provider has a usable adapter.
    pub fn is_bound(&self) -> bool {
        self.adapter.is_some()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }

    pub fn history(&self) -> bool {
        self.options.history
    }

    pub fn set_history(&mut self, enabled: bool) {
        self.options.history = enabled;
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.options.settings
    }

    pub fn settings_mut(&mut self) -> &mut GenerationSettings {
        &mut self.options.settings
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    pub fn voice_sample(&self) -> Option<&str> {
        self.voice_sample.as_deref()
    }

    pub fn set_voice_sample(&mut self, url: impl Into<String>) {
        self.voice_sample = Some(url.into());
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn last_reply(&self) -> Option<&str> {
        self.conversation.last_reply()
    }

    /// Advertise an OpenAI-style function tool to backends that accept tools.
    pub fn create_tool(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) {
        self.options
            .settings
            .tools
            .push(ToolDefinition::function(name, description, parameters));
    }

    /// Rebind to another provider. Conversation history is kept.
    pub fn update_provider(&mut self, name: &str) {
        let name = name.trim();
        self.provider_name =
            Provider::from_name(name).map_or_else(|| name.to_string(), |p| p.name().to_string());
        self.adapter = match Provider::from_name(&self.provider_name) {
            Some(provider) => {
                match ProviderAdapter::for_provider(provider, self.options.api_base_url.as_deref()) {
                    Ok(adapter) => Some(adapter),
                    Err(e) => {
                        warn!(agent = %self.nickname, error = %e, "Provider has no endpoint");
                        None
                    }
                }
            }
            None => {
                warn!(agent = %self.nickname, provider = %self.provider_name, "Unknown provider");
                None
            }
        };
        debug!(agent = %self.nickname, provider = %self.provider_name, "Provider bound");
    }

    fn adapter(&self) -> DeertickResult<&ProviderAdapter> {
        self.adapter.as_ref().ok_or_else(|| {
            DeertickError::Configuration(format!(
                "agent '{}' is bound to unsupported provider '{}'",
                self.nickname, self.provider_name
            ))
        })
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.options.request_timeout_secs)
    }

    /// Await `call` under the request timeout, mapping expiry to a provider error.
    async fn timed<T>(&self, call: impl Future<Output = DeertickResult<T>>) -> DeertickResult<T> {
        let limit = self.timeout();
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(DeertickError::Provider(format!(
                "{} did not answer within {}s",
                self.provider_name,
                limit.as_secs()
            ))),
        }
    }

    /// Send `prompt` with `system_prompt` and return the reply text.
    ///
    /// On failure the conversation is left exactly as it was before the call.
    pub async fn respond(&mut self, system_prompt: &str, prompt: &str) -> DeertickResult<String> {
        let adapter = self.adapter()?.clone();
        let token = self.credentials.require(&self.provider_name)?.to_string();

        let effective = self
            .conversation
            .effective_prompt(prompt, self.options.history);

        let waited = self.limiter.acquire().await;
        if !waited.is_zero() {
            debug!(agent = %self.nickname, wait_ms = waited.as_millis() as u64, "Rate limited");
        }

        self.conversation.begin_turn(system_prompt, prompt);
        let request = adapter.build_request(
            &token,
            &ChatRequest {
                model: &self.model,
                system_prompt,
                prompt: &effective,
                settings: &self.options.settings,
            },
        );

        info!(agent = %self.nickname, provider = %self.provider_name, "Sending request");
        let body = match self.timed(self.transport.post_json(&request)).await {
            Ok(body) => body,
            Err(e) => {
                self.conversation.abandon_turn();
                return Err(e);
            }
        };

        let parsed = adapter.parse_response(&body);
        if parsed == ParsedReply::Empty {
            debug!(agent = %self.nickname, "Provider returned empty content");
        }
        let reply = parsed.into_result().unwrap_or_else(|e| {
            warn!(agent = %self.nickname, provider = %self.provider_name, error = %e, "Treating reply as empty");
            String::new()
        });

        self.conversation.complete_turn(&reply);
        Ok(reply)
    }

    /// [`respond`](Self::respond) with the agent's own system prompt.
    pub async fn poke(&mut self, prompt: &str) -> DeertickResult<String> {
        let system_prompt = self.system_prompt.clone();
        self.respond(&system_prompt, prompt).await
    }

    /// Produce media for a voice, image or video agent.
    ///
    /// The reply text is the list of saved files, one per line, and is
    /// recorded like a chat reply.
    pub async fn generate_media(
        &mut self,
        generator: &dyn MediaGenerator,
        prompt: &str,
    ) -> DeertickResult<String> {
        let voice_sample = match self.kind {
            ModelKind::Chat => {
                return Err(DeertickError::Configuration(format!(
                    "agent '{}' is a chat model",
                    self.nickname
                )))
            }
            ModelKind::Voice => Some(self.voice_sample.clone().ok_or_else(|| {
                DeertickError::Configuration(format!(
                    "voice agent '{}' has no voice sample",
                    self.nickname
                ))
            })?),
            ModelKind::Image | ModelKind::Video => None,
        };

        self.limiter.acquire().await;
        let system_prompt = self.system_prompt.clone();
        self.conversation.begin_turn(&system_prompt, prompt);

        let (kind, model) = (self.kind, self.model.as_str());
        let call = async move {
            match &voice_sample {
                Some(sample) => generator.synthesize_voice(model, prompt, sample).await,
                None => generator.generate_visual(kind, model, prompt).await,
            }
        };
        let paths = match self.timed(call).await {
            Ok(paths) => paths,
            Err(e) => {
                self.conversation.abandon_turn();
                return Err(e);
            }
        };

        let reply = paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        self.conversation.complete_turn(&reply);
        Ok(reply)
    }

    pub fn snapshot(&self) -> deertick_session::ConversationRecord {
        self.conversation.to_record(&self.model)
    }

    /// Replace the conversation with a saved one.
    pub fn restore(&mut self, record: deertick_session::ConversationRecord) -> DeertickResult<()> {
        self.conversation = ConversationState::from_record(record)?;
        Ok(())
    }

    pub async fn save_conversation(&self, store: &dyn ConversationStore) -> DeertickResult<PathBuf> {
        store.save(&self.snapshot()).await
    }

    pub async fn load_conversation(
        &mut self,
        store: &dyn ConversationStore,
        path: &Path,
    ) -> DeertickResult<()> {
        let record = store.load(path).await?;
        if !record.model.is_empty() && record.model != self.model {
            info!(agent = %self.nickname, saved_model = %record.model, "Loading a conversation saved by another model");
        }
        self.restore(record)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::transport::HttpRequest;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned results and records every request.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<VecDeque<DeertickResult<serde_json::Value>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn with(replies: Vec<DeertickResult<serde_json::Value>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::default(),
            })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn post_json(&self, request: &HttpRequest) -> DeertickResult<serde_json::Value> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(DeertickError::Provider("no scripted reply".into())))
        }

        async fn get_bytes(&self, _url: &str) -> DeertickResult<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    fn chat_reply(text: &str) -> DeertickResult<serde_json::Value> {
        Ok(serde_json::json!({"choices": [{"message": {"content": text}}]}))
    }

    fn fast_options() -> AgentOptions {
        AgentOptions {
            rate_limit_ms: 0,
            ..AgentOptions::default()
        }
    }

    fn agent(model: &str, provider: &str, transport: Arc<ScriptedTransport>) -> Agent {
        let creds = Credentials::new()
            .with_token("openai", "sk-test")
            .with_token("openrouter", "or-test");
        Agent::builder(model)
            .provider(provider)
            .options(fast_options())
            .build(&ModelCatalog::builtin(), Arc::new(creds), transport)
    }

    #[test]
    fn test_builder_resolves_catalog_entry() {
        let a = agent("gpt-4o-or", "", ScriptedTransport::with(vec![]));
        assert_eq!(a.model(), "openai/gpt-4o");
        assert_eq!(a.nickname(), "gpt-4o-or");
        assert_eq!(a.provider_name(), "openrouter");
        assert!(a.is_bound());

        let voice = agent("xtts-v2", "", ScriptedTransport::with(vec![]));
        assert_eq!(voice.kind(), ModelKind::Voice);
    }

    #[tokio::test]
    async fn test_respond_records_turn() {
        let transport = ScriptedTransport::with(vec![chat_reply("Hi there")]);
        let mut a = agent("gpt-4o", "openai", transport.clone());

        let reply = a.respond("be nice", "hello").await.unwrap();
        assert_eq!(reply, "Hi there");
        assert_eq!(a.conversation().user_prompts(), ["hello"]);
        assert_eq!(a.conversation().system_prompts(), ["be nice"]);
        assert_eq!(a.last_reply(), Some("Hi there"));

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body["messages"][1]["content"], "hello");
    }

    #[tokio::test]
    async fn test_history_mode_sends_flattened_prompt() {
        let transport = ScriptedTransport::with(vec![chat_reply("one"), chat_reply("two")]);
        let mut a = agent("gpt-4o", "openai", transport.clone());
        a.set_history(true);

        a.respond("", "first").await.unwrap();
        a.respond("", "second").await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].body["messages"][1]["content"], "first");
        assert_eq!(
            sent[1].body["messages"][1]["content"],
            "user: first\nassistant: one\nsecond"
        );
        // The raw prompt is what gets recorded.
        assert_eq!(a.conversation().user_prompts(), ["first", "second"]);
    }

    #[tokio::test]
    async fn test_provider_error_leaves_state_untouched() {
        let transport = ScriptedTransport::with(vec![
            chat_reply("ok"),
            Err(DeertickError::Provider("API error 500".into())),
        ]);
        let mut a = agent("gpt-4o", "openai", transport);
        a.respond("", "first").await.unwrap();
        let before = a.conversation().clone();

        let err = a.respond("", "second").await.unwrap_err();
        assert!(err.is_provider());
        assert_eq!(a.conversation(), &before);
    }

    #[tokio::test]
    async fn test_unknown_provider_is_configuration_error() {
        let transport = ScriptedTransport::with(vec![chat_reply("never")]);
        let mut a = agent("gpt-4o", "bedrock", transport.clone());
        assert!(!a.is_bound());

        let err = a.respond("", "hello").await.unwrap_err();
        assert!(err.is_configuration());
        assert!(transport.requests().is_empty());
        assert!(a.conversation().is_empty());
    }

    #[tokio::test]
    async fn test_google_and_missing_token_are_configuration_errors() {
        let mut google = agent("gemini-pro", "google", ScriptedTransport::with(vec![]));
        assert!(google.respond("", "x").await.unwrap_err().is_configuration());

        let mut anthropic = agent("claude-3.5-sonnet", "anthropic", ScriptedTransport::with(vec![]));
        let err = anthropic.respond("", "x").await.unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("anthropic"));
    }

    #[tokio::test]
    async fn test_unrecognized_shape_becomes_empty_reply() {
        let transport = ScriptedTransport::with(vec![Ok(serde_json::json!({"weird": true}))]);
        let mut a = agent("gpt-4o", "openai", transport);
        assert_eq!(a.respond("", "hi").await.unwrap(), "");
        assert_eq!(a.conversation().replies(), [""]);
    }

    #[tokio::test]
    async fn test_update_provider_keeps_history() {
        let transport = ScriptedTransport::with(vec![chat_reply("a"), chat_reply("b")]);
        let mut a = agent("gpt-4o", "openai", transport.clone());
        a.respond("", "x").await.unwrap();

        a.update_provider("openrouter");
        assert_eq!(a.provider_name(), "openrouter");
        a.respond("", "y").await.unwrap();

        assert_eq!(a.conversation().turn_count(), 2);
        let sent = transport.requests();
        assert!(sent[1].url.contains("openrouter.ai"));
        assert_eq!(sent[1].header_value("X-Title"), Some("DeerTick"));
    }

    #[tokio::test]
    async fn test_poke_uses_own_system_prompt() {
        let transport = ScriptedTransport::with(vec![chat_reply("ok")]);
        let mut a = agent("gpt-4o", "openai", transport.clone());
        a.set_system_prompt("You are a deer.");
        a.poke("hello").await.unwrap();
        assert_eq!(transport.requests()[0].body["messages"][0]["content"], "You are a deer.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_provider_error() {
        struct Hanging;

        #[async_trait]
        impl HttpTransport for Hanging {
            async fn post_json(&self, _r: &HttpRequest) -> DeertickResult<serde_json::Value> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(serde_json::Value::Null)
            }
            async fn get_bytes(&self, _url: &str) -> DeertickResult<Vec<u8>> {
                Ok(Vec::new())
            }
        }

        let creds = Credentials::new().with_token("openai", "sk");
        let mut a = Agent::builder("gpt-4o")
            .provider("openai")
            .options(AgentOptions {
                rate_limit_ms: 0,
                request_timeout_secs: 5,
                ..AgentOptions::default()
            })
            .build(&ModelCatalog::builtin(), Arc::new(creds), Arc::new(Hanging));

        let err = a.respond("", "hello").await.unwrap_err();
        assert!(err.is_provider());
        assert!(a.conversation().is_empty());
    }

    #[tokio::test]
    async fn test_create_tool_reaches_request() {
        let transport = ScriptedTransport::with(vec![chat_reply("ok")]);
        let mut a = agent("gpt-4o", "openai", transport.clone());
        a.create_tool("lookup", "Look something up", serde_json::json!({}));
        a.respond("", "q").await.unwrap();
        assert_eq!(transport.requests()[0].body["tools"][0]["function"]["name"], "lookup");
    }

    /// Reports fixed paths without touching the network.
    struct NoMedia;

    #[async_trait]
    impl MediaGenerator for NoMedia {
        async fn synthesize_voice(&self, _m: &str, _t: &str, _v: &str) -> DeertickResult<Vec<PathBuf>> {
            Ok(vec![PathBuf::from("tts/out.wav")])
        }
        async fn generate_visual(&self, _k: ModelKind, _m: &str, _p: &str) -> DeertickResult<Vec<PathBuf>> {
            Ok(vec![PathBuf::from("img/a.webp"), PathBuf::from("img/b.webp")])
        }
    }

    fn paced_agent(model: &str, transport: Arc<ScriptedTransport>) -> Agent {
        let creds = Credentials::new().with_token("openai", "sk-test");
        Agent::builder(model)
            .options(AgentOptions {
                rate_limit_ms: 500,
                ..AgentOptions::default()
            })
            .build(&ModelCatalog::builtin(), Arc::new(creds), transport)
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_requests_are_spaced() {
        let transport = ScriptedTransport::with(vec![chat_reply("a"), chat_reply("b")]);
        let mut a = paced_agent("gpt-4o", transport.clone());
        assert_eq!(a.provider_name(), "openai");

        let start = tokio::time::Instant::now();
        a.respond("", "one").await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(500));
        a.respond("", "two").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_media_requests_are_spaced() {
        let mut image = paced_agent("flux-schnell", ScriptedTransport::with(vec![]));

        let start = tokio::time::Instant::now();
        image.generate_media(&NoMedia, "a deer").await.unwrap();
        image.generate_media(&NoMedia, "a doe").await.unwrap();
        image.generate_media(&NoMedia, "a fawn").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert_eq!(image.conversation().turn_count(), 3);
    }

    #[tokio::test]
    async fn test_provider_name_is_canonical() {
        let transport = ScriptedTransport::with(vec![chat_reply("a"), chat_reply("b")]);
        let creds = Credentials::new().with_token("openai", "sk").with_token("openrouter", "or");
        let mut a = Agent::builder("gpt-4o")
            .provider("OpenAI")
            .options(fast_options())
            .build(&ModelCatalog::builtin(), Arc::new(creds), transport.clone());
        assert!(a.is_bound());
        assert_eq!(a.provider_name(), "openai");
        assert_eq!(a.respond("", "x").await.unwrap(), "a");

        a.update_provider(" OpenRouter ");
        assert_eq!(a.provider_name(), "openrouter");
        assert_eq!(a.respond("", "y").await.unwrap(), "b");
        assert_eq!(
            transport.requests()[1].header_value("authorization"),
            Some("Bearer or")
        );
    }

    #[tokio::test]
    async fn test_voice_agent_without_sample() {
        let mut voice = agent("xtts-v2", "", ScriptedTransport::with(vec![]));
        let err = voice.generate_media(&NoMedia, "say hi").await.unwrap_err();
        assert!(err.is_configuration());
        assert!(voice.conversation().is_empty());

        voice.set_voice_sample("https://example.com/sample.wav");
        assert_eq!(voice.generate_media(&NoMedia, "say hi").await.unwrap(), "tts/out.wav");

        let mut image = agent("flux-schnell", "", ScriptedTransport::with(vec![]));
        let reply = image.generate_media(&NoMedia, "a deer").await.unwrap();
        assert_eq!(reply, "img/a.webp\nimg/b.webp");
        assert_eq!(image.conversation().turn_count(), 1);

        let mut chat = agent("gpt-4o", "openai", ScriptedTransport::with(vec![]));
        assert!(chat.generate_media(&NoMedia, "x").await.is_err());
    }
}
