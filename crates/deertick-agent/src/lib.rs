//! Provider-agnostic agents for DeerTick.
//!
//! An [`Agent`] binds one model to a provider. Each call goes through the
//! provider's [`ProviderAdapter`] for request shaping, the agent's own rate
//! limiter for pacing, and an [`HttpTransport`] for I/O. The agent keeps a
//! [`ConversationState`] that can be flattened into a single prompt for
//! backends without native multi-turn support.
//!
//! # Main types
//!
//! - [`Agent`] / [`AgentBuilder`] : A model binding with its conversation.
//! - [`ProviderAdapter`] : Closed set of wire formats (OpenAI-compatible,
//!   OpenRouter, Anthropic, Replicate, Hugging Face).
//! - [`ModelCatalog`] : Static model metadata and provider resolution.
//! - [`ReplicateMedia`] : Voice, image and video generation.

/// Per-provider request shaping and response parsing.
pub mod adapters;
/// The agent type.
pub mod agent;
/// Static model metadata.
pub mod catalog;
/// Providers, generation settings and agent options.
pub mod config;
/// Per-agent turn history.
pub mod context;
/// Media generation for non-chat agents.
pub mod media;
/// HTTP boundary.
pub mod transport;

pub use adapters::{ChatRequest, ParsedReply, ProviderAdapter};
pub use agent::{Agent, AgentBuilder};
pub use catalog::{ModelCatalog, ModelInfo};
pub use config::{
    AgentOptions, GenerationSettings, Provider, ToolDefinition, DEFAULT_PROVIDER, PROVIDERS,
};
pub use context::ConversationState;
pub use media::{MediaGenerator, ReplicateMedia, VisualSettings};
pub use transport::{HttpRequest, HttpTransport, ReqwestTransport};
