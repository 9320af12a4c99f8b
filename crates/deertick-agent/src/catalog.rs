//! Static model metadata used to pick default providers and response kinds.

use crate::config::{Provider, DEFAULT_PROVIDER, PROVIDERS};
use deertick_core::ModelKind;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Catalog entry for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Identifier sent to the provider.
    pub id: String,
    /// Display name or short alias.
    pub name: String,
    pub preferred_provider: String,
    #[serde(default)]
    pub kind: ModelKind,
    #[serde(default)]
    pub context_length: u32,
    /// Providers known not to serve this model.
    #[serde(default)]
    pub incompatible_providers: Vec<String>,
}

impl ModelInfo {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        preferred_provider: impl Into<String>,
        kind: ModelKind,
        context_length: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            preferred_provider: preferred_provider.into(),
            kind,
            context_length,
            incompatible_providers: Vec::new(),
        }
    }

    pub fn incompatible_with(mut self, providers: &[&str]) -> Self {
        self.incompatible_providers = providers.iter().map(|p| (*p).to_string()).collect();
        self
    }
}

/// Read-only table of known models.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    models: Vec<ModelInfo>,
}

// (id, name, preferred provider, kind, context length, incompatible providers)
type Row = (&'static str, &'static str, &'static str, ModelKind, u32, &'static [&'static str]);

const BUILTIN_MODELS: &[Row] = &[
    ("meta/meta-llama-3-8b-instruct", "I-8b", "replicate", ModelKind::Chat, 8192, &["openrouter"]),
    ("meta/meta-llama-3-70b-instruct", "I-70b", "replicate", ModelKind::Chat, 8192, &["openrouter"]),
    ("meta/meta-llama-3.1-405b-instruct", "I-405b", "replicate", ModelKind::Chat, 131072, &["openrouter"]),
    ("meta-llama/llama-3.1-405b", "Meta: Llama 3.1 405B (base)", "openrouter", ModelKind::Chat, 131072, &[]),
    ("black-forest-labs/flux-schnell", "flux-schnell", "replicate", ModelKind::Image, 0, &[]),
    ("lucataco/flux-dev-lora", "flux-dev-lora", "replicate", ModelKind::Image, 0, &[]),
    ("yorickvp/llava-13b", "llava-13b", "replicate", ModelKind::Image, 0, &[]),
    (
        "lucataco/xtts-v2:684bc3855b37866c0c65add2ff39c78f3dea3f4ff103a436465326e0f438d55e",
        "xtts-v2",
        "replicate",
        ModelKind::Voice,
        0,
        &[],
    ),
    (
        "lucataco/animate-diff:beecf59c4aee8d81bf04f0381033dfa10dc16e845b4ae00d281e2fa377e48a9f",
        "animate-diff",
        "replicate",
        ModelKind::Video,
        0,
        &[],
    ),
    ("gpt-4o", "gpt-4o", "openai", ModelKind::Chat, 128000, &[]),
    ("gpt-4o-mini", "gpt-4o-mini", "openai", ModelKind::Chat, 128000, &[]),
    ("gpt-4-turbo", "gpt-4-turbo", "openai", ModelKind::Chat, 128000, &[]),
    ("gpt-4", "gpt-4", "openai", ModelKind::Chat, 8192, &[]),
    ("gpt-3.5-turbo", "gpt-3.5-turbo", "openai", ModelKind::Chat, 16385, &[]),
    ("openai/gpt-4o", "gpt-4o-or", "openrouter", ModelKind::Chat, 128000, &[]),
    ("openai/gpt-4o-mini", "gpt-4o-mini-or", "openrouter", ModelKind::Chat, 128000, &[]),
    ("openai/gpt-4o:extended", "OpenAI: GPT-4o (extended)", "openrouter", ModelKind::Chat, 128000, &[]),
    ("openai/o1-mini", "OpenAI: o1-mini", "openrouter", ModelKind::Chat, 128000, &["openrouter"]),
    ("codestral-latest", "codestral", "mistral", ModelKind::Chat, 32000, &["openrouter"]),
    ("mistral-large-latest", "mistral-large", "mistral", ModelKind::Chat, 128000, &[]),
    ("mistralai/mistral-nemo", "Mistral: Mistral Nemo", "openrouter", ModelKind::Chat, 128000, &[]),
    ("mistralai/mistral-7b-instruct:nitro", "Mistral: Mistral 7B Instruct (nitro)", "openrouter", ModelKind::Chat, 32768, &[]),
    ("mistralai/pixtral-12b:free", "Mistral: Pixtral 12B (free)", "openrouter", ModelKind::Chat, 4096, &[]),
    ("claude-3-5-sonnet-20240620", "claude-3.5-sonnet", "anthropic", ModelKind::Chat, 200000, &[]),
    ("anthropic/claude-3.5-sonnet", "Anthropic: Claude 3.5 Sonnet", "openrouter", ModelKind::Chat, 200000, &[]),
    ("google/gemini-pro-1.5", "gemini-pro", "openrouter", ModelKind::Chat, 2000000, &[]),
    ("google/gemini-flash-1.5", "gemini-flash", "openrouter", ModelKind::Chat, 1000000, &[]),
    ("google/gemma-2-9b-it:free", "Google: Gemma 2 9B (free)", "openrouter", ModelKind::Chat, 8192, &[]),
    ("cohere/command-r-plus-08-2024", "Cohere: Command R+ (08-2024)", "openrouter", ModelKind::Chat, 128000, &[]),
    ("qwen/qwen-2-72b-instruct", "Qwen 2 72B Instruct", "openrouter", ModelKind::Chat, 32768, &[]),
    ("nousresearch/hermes-3-llama-3.1-405b:extended", "Nous: Hermes 3 405B Instruct (extended)", "openrouter", ModelKind::Chat, 128000, &[]),
    ("cognitivecomputations/dolphin-llama-3-70b", "dolphin", "openrouter", ModelKind::Chat, 8192, &["openrouter"]),
    ("deepseek/deepseek-chat", "DeepSeek V2.5", "openrouter", ModelKind::Chat, 128000, &[]),
    ("mistralai/Mistral-7B-Instruct-v0.3", "mistral-7b-hf", "huggingface", ModelKind::Chat, 32768, &[]),
];

impl ModelCatalog {
    /// The bundled model table.
    pub fn builtin() -> Self {
        let models = BUILTIN_MODELS
            .iter()
            .map(|(id, name, provider, kind, ctx, incompatible)| {
                ModelInfo::new(*id, *name, *provider, *kind, *ctx).incompatible_with(incompatible)
            })
            .collect();
        Self { models }
    }

    pub fn with_models(models: Vec<ModelInfo>) -> Self {
        Self { models }
    }

    pub fn push(&mut self, model: ModelInfo) {
        self.models.push(model);
    }

    pub fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    /// Find a model by identifier first, then by display name.
    pub fn find(&self, key: &str) -> Option<&ModelInfo> {
        self.models
            .iter()
            .find(|m| m.id == key)
            .or_else(|| self.models.iter().find(|m| m.name == key))
    }

    /// What the model produces; unknown models are treated as chat models.
    pub fn kind_of(&self, key: &str) -> ModelKind {
        self.find(key).map(|m| m.kind).unwrap_or_default()
    }

    /// Turn a user-supplied provider selector into a provider name.
    ///
    /// An empty selector falls back to the model's preferred provider (or the
    /// global default), a decimal selector indexes [`PROVIDERS`], and anything
    /// else is taken verbatim so it can be rejected at request time.
    pub fn resolve_provider(&self, requested: &str, model: &str) -> String {
        let requested = requested.trim();
        if requested.is_empty() {
            return self
                .find(model)
                .map(|m| m.preferred_provider.clone())
                .unwrap_or_else(|| DEFAULT_PROVIDER.name().to_string());
        }

        if let Ok(index) = requested.parse::<usize>() {
            if let Some(provider) = PROVIDERS.get(index) {
                return provider.name().to_string();
            }
        }

        let name = Provider::from_name(requested)
            .map_or_else(|| requested.to_string(), |p| p.name().to_string());
        if let Some(info) = self.find(model) {
            if info.incompatible_providers.iter().any(|p| *p == name) {
                warn!(model = %info.id, provider = %name, "Provider is listed as incompatible with this model");
            }
        }
        name
    }

    /// Usage-policy and endpoint notes shown when a model joins a chat.
    pub fn connect_notices(&self, model: &str) -> Vec<String> {
        let mut notices = Vec::new();

        let licence = if model.contains("cohere") {
            Some("Use of this model is subject to Cohere's Acceptable Use Policy: https://docs.cohere.com/docs/c4ai-acceptable-use-policy")
        } else if model.contains("gemma") {
            Some("Usage of Gemma is subject to Google's Gemma Terms of Use: https://ai.google.dev/gemma/terms")
        } else if model.contains("google/g") {
            Some("Usage of Gemini is subject to Google's Gemini Terms of Use: https://ai.google.dev/terms")
        } else if model.contains("llama") {
            Some("Usage of this model is subject to Meta's Acceptable Use Policy: https://www.llama.com/llama3/use-policy/")
        } else if model.contains("qwen/") {
            Some("Usage of this model is subject to Tongyi Qianwen LICENSE AGREEMENT: https://huggingface.co/Qwen/Qwen1.5-110B-Chat/blob/main/LICENSE")
        } else {
            None
        };
        if let Some(text) = licence {
            notices.push(format!("~ {text} ~"));
        }

        let variant = if model.contains("extended") {
            Some(("extended-context", true))
        } else if model.contains("free") {
            notices.push("Outputs may be cached. Read about rate limits in ./docs/limits.".to_string());
            Some(("free, rate-limited", false))
        } else if model.contains("nitro") {
            Some(("higher-throughput", true))
        } else {
            None
        };
        if let (Some((desc, pricy)), Some(info)) = (variant, self.find(model)) {
            let mut line = format!(
                "These are {desc} endpoints for {} (/models/{}).",
                info.name, info.id
            );
            if pricy {
                line.push_str(" They may have higher prices.");
            }
            notices.push(line);
        }

        notices
    }
}
