use deertick_core::{DeertickError, DeertickResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Supported model-serving backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    OpenRouter,
    Anthropic,
    Mistral,
    Replicate,
    HuggingFace,
    /// Credentials are accepted but no chat endpoint is wired up.
    Google,
}

/// Providers selectable by numeric index (`-p 0`, `-p 4`, ...).
pub const PROVIDERS: [Provider; 5] = [
    Provider::OpenRouter,
    Provider::Replicate,
    Provider::Mistral,
    Provider::HuggingFace,
    Provider::OpenAi,
];

/// Used when neither the caller nor the catalog names a provider.
pub const DEFAULT_PROVIDER: Provider = Provider::OpenRouter;

impl Provider {
    pub const ALL: [Provider; 7] = [
        Provider::OpenAi,
        Provider::OpenRouter,
        Provider::Anthropic,
        Provider::Mistral,
        Provider::Replicate,
        Provider::HuggingFace,
        Provider::Google,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::OpenRouter => "openrouter",
            Provider::Anthropic => "anthropic",
            Provider::Mistral => "mistral",
            Provider::Replicate => "replicate",
            Provider::HuggingFace => "huggingface",
            Provider::Google => "google",
        }
    }

    /// Case-insensitive lookup by provider name.
    pub fn from_name(name: &str) -> Option<Provider> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }

    fn default_base(self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some("https://api.openai.com"),
            Provider::OpenRouter => Some("https://openrouter.ai"),
            Provider::Anthropic => Some("https://api.anthropic.com"),
            Provider::Mistral => Some("https://api.mistral.ai"),
            Provider::Replicate => Some("https://api.replicate.com"),
            Provider::HuggingFace => Some("https://api-inference.huggingface.co"),
            Provider::Google => None,
        }
    }

    fn endpoint_path(self) -> Option<&'static str> {
        match self {
            Provider::OpenAi | Provider::Mistral => Some("/v1/chat/completions"),
            Provider::OpenRouter => Some("/api/v1/chat/completions"),
            Provider::Anthropic => Some("/v1/messages"),
            Provider::Replicate => Some("/v1/predictions"),
            Provider::HuggingFace => Some("/models/"),
            Provider::Google => None,
        }
    }

    /// The request endpoint, or `None` when this provider has no endpoint.
    ///
    /// `base_override` replaces the scheme and host while keeping the path.
    pub fn endpoint(self, base_override: Option<&str>) -> Option<String> {
        let path = self.endpoint_path()?;
        let base = match base_override {
            Some(base) => base.trim_end_matches('/'),
            None => self.default_base()?,
        };
        Some(format!("{base}{path}"))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An OpenAI-style function tool advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Build a function tool. Keys in `parameters` are laid over an empty
    /// object schema that forbids additional properties.
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        let mut schema = serde_json::json!({
            "type": "object",
            "properties": {},
            "required": [],
            "additionalProperties": false,
        });
        if let (Some(base), Some(extra)) = (schema.as_object_mut(), parameters.as_object()) {
            for (key, value) in extra {
                base.insert(key.clone(), value.clone());
            }
        }
        Self {
            kind: "function".to_string(),
            function: FunctionSpec {
                name: name.into(),
                description: description.into(),
                parameters: schema,
            },
        }
    }
}

/// Generation knobs. Adapters forward the subset their backend understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationSettings {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_tokens: u32,
    pub min_tokens: u32,
    pub presence_penalty: f64,
    pub frequency_penalty: f64,
    pub stop: Vec<String>,
    pub logit_bias: BTreeMap<String, f64>,
    pub tools: Vec<ToolDefinition>,
    pub response_format: Option<serde_json::Value>,
    pub prompt_template: String,
}

/// Llama 3 instruct template used by prompt-template backends.
pub const LLAMA3_PROMPT_TEMPLATE: &str = "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\n{system_prompt}<|eot_id|><|start_header_id|>user<|end_header_id|>\n\n{prompt}<|eot_id|><|start_header_id|>assistant<|end_header_id|>\n\n";

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.6,
            top_p: 0.9,
            top_k: 50,
            max_tokens: 256,
            min_tokens: 0,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            stop: Vec::new(),
            logit_bias: BTreeMap::new(),
            tools: Vec::new(),
            response_format: None,
            prompt_template: LLAMA3_PROMPT_TEMPLATE.to_string(),
        }
    }
}

impl GenerationSettings {
    /// Merge a JSON object of overrides into these settings.
    ///
    /// Unknown keys and mistyped values are rejected and leave the settings untouched.
    pub fn apply_overrides(&mut self, overrides: &serde_json::Value) -> DeertickResult<()> {
        let entries = overrides.as_object().ok_or_else(|| {
            DeertickError::Configuration("settings overrides must be a JSON object".into())
        })?;

        let mut merged = serde_json::to_value(&*self)?;
        if let Some(current) = merged.as_object_mut() {
            for (key, value) in entries {
                if !current.contains_key(key) {
                    return Err(DeertickError::Configuration(format!(
                        "unknown generation setting '{key}'"
                    )));
                }
                current.insert(key.clone(), value.clone());
            }
        }

        *self = serde_json::from_value(merged)
            .map_err(|e| DeertickError::Configuration(format!("invalid setting value: {e}")))?;
        Ok(())
    }
}

fn default_rate_limit_ms() -> u64 {
    2000
}

fn default_request_timeout_secs() -> u64 {
    120
}

/// Per-agent runtime options, resolved from configuration before construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOptions {
    /// Minimum spacing between two requests of the same agent.
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Resend prior turns as flattened text on every request.
    #[serde(default)]
    pub history: bool,
    #[serde(default)]
    pub settings: GenerationSettings,
    /// Replaces the provider host (self-hosted gateways, tests).
    #[serde(default)]
    pub api_base_url: Option<String>,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            rate_limit_ms: default_rate_limit_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            history: false,
            settings: GenerationSettings::default(),
            api_base_url: None,
        }
    }
}
