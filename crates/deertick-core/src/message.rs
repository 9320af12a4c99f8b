use serde::{Deserialize, Serialize};
use std::fmt;

/// The role of the participant that authored a line of conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A system-level instruction or prompt.
    System,
    /// A human end-user.
    User,
    /// The model's reply.
    Assistant,
}

impl Role {
    /// Literal label written in front of a flattened conversation line.
    pub fn label(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a model produces. Decides how the dispatch loop invokes an agent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Text chat completion.
    #[default]
    #[serde(alias = "llm")]
    Chat,
    /// Text-to-speech with a reference voice sample.
    #[serde(alias = "tts")]
    Voice,
    /// Image generation.
    Image,
    /// Short video generation (served through the image pipeline).
    Video,
}

impl ModelKind {
    /// Whether replies are media files rather than chat text.
    pub fn is_media(self) -> bool {
        !matches!(self, ModelKind::Chat)
    }
}
