pub mod anthropic;
pub mod huggingface;
pub mod openai;
pub mod replicate;

use crate::config::{GenerationSettings, Provider};
use crate::transport::HttpRequest;
use deertick_core::{DeertickError, DeertickResult};

/// Generic chat request handed to an adapter.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub system_prompt: &'a str,
    /// Effective prompt, already flattened when history mode is on.
    pub prompt: &'a str,
    pub settings: &'a GenerationSettings,
}

/// Outcome of extracting reply text from a provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedReply {
    Content(String),
    /// The response had the expected shape but carried no text.
    Empty,
    /// The response did not have the expected shape.
    Unrecognized,
}

impl ParsedReply {
    pub(crate) fn from_text(text: String) -> Self {
        if text.is_empty() {
            ParsedReply::Empty
        } else {
            ParsedReply::Content(text)
        }
    }

    /// Reply text; an unrecognized shape is a [`DeertickError::Parse`].
    pub fn into_result(self) -> DeertickResult<String> {
        match self {
            ParsedReply::Content(text) => Ok(text),
            ParsedReply::Empty => Ok(String::new()),
            ParsedReply::Unrecognized => Err(DeertickError::Parse(
                "response did not contain reply text".to_string(),
            )),
        }
    }
}

/// Request shaping for each supported wire format.
///
/// Adapters are pure: they build [`HttpRequest`] values and read JSON bodies,
/// but never perform I/O themselves.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderAdapter {
    /// OpenAI chat completions and compatible servers (Mistral).
    OpenAiCompatible { provider: Provider, endpoint: String },
    OpenRouter { endpoint: String },
    Anthropic { endpoint: String },
    Replicate { endpoint: String },
    /// Text-generation inference; the model id is appended to the endpoint.
    HuggingFace { endpoint: String },
}

impl ProviderAdapter {
    /// Bind an adapter for `provider`, failing when the provider has no endpoint.
    pub fn for_provider(provider: Provider, base_override: Option<&str>) -> DeertickResult<Self> {
        let endpoint = provider.endpoint(base_override).ok_or_else(|| {
            DeertickError::Configuration(format!("provider '{provider}' has no chat endpoint"))
        })?;
        let adapter = match provider {
            Provider::OpenAi | Provider::Mistral => {
                ProviderAdapter::OpenAiCompatible { provider, endpoint }
            }
            Provider::OpenRouter => ProviderAdapter::OpenRouter { endpoint },
            Provider::Anthropic => ProviderAdapter::Anthropic { endpoint },
            Provider::Replicate => ProviderAdapter::Replicate { endpoint },
            Provider::HuggingFace => ProviderAdapter::HuggingFace { endpoint },
            Provider::Google => {
                return Err(DeertickError::Configuration(format!(
                    "provider '{provider}' has no chat endpoint"
                )))
            }
        };
        Ok(adapter)
    }

    pub fn provider(&self) -> Provider {
        match self {
            ProviderAdapter::OpenAiCompatible { provider, .. } => *provider,
            ProviderAdapter::OpenRouter { .. } => Provider::OpenRouter,
            ProviderAdapter::Anthropic { .. } => Provider::Anthropic,
            ProviderAdapter::Replicate { .. } => Provider::Replicate,
            ProviderAdapter::HuggingFace { .. } => Provider::HuggingFace,
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            ProviderAdapter::OpenAiCompatible { endpoint, .. }
            | ProviderAdapter::OpenRouter { endpoint }
            | ProviderAdapter::Anthropic { endpoint }
            | ProviderAdapter::Replicate { endpoint }
            | ProviderAdapter::HuggingFace { endpoint } => endpoint,
        }
    }

    pub fn build_request(&self, token: &str, request: &ChatRequest<'_>) -> HttpRequest {
        match self {
            ProviderAdapter::OpenAiCompatible { endpoint, .. } => {
                openai::build_request(endpoint, token, request)
            }
            ProviderAdapter::OpenRouter { endpoint } => {
                openai::build_openrouter_request(endpoint, token, request)
            }
            ProviderAdapter::Anthropic { endpoint } => {
                anthropic::build_request(endpoint, token, request)
            }
            ProviderAdapter::Replicate { endpoint } => {
                replicate::build_request(endpoint, token, request)
            }
            ProviderAdapter::HuggingFace { endpoint } => {
                huggingface::build_request(endpoint, token, request)
            }
        }
    }

    pub fn parse_response(&self, body: &serde_json::Value) -> ParsedReply {
        match self {
            ProviderAdapter::OpenAiCompatible { .. } | ProviderAdapter::OpenRouter { .. } => {
                openai::parse_response(body)
            }
            ProviderAdapter::Anthropic { .. } => anthropic::parse_response(body),
            ProviderAdapter::Replicate { .. } => replicate::parse_response(body),
            ProviderAdapter::HuggingFace { .. } => huggingface::parse_response(body),
        }
    }
}

pub(crate) fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
