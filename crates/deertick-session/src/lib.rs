//! Conversation persistence for DeerTick agents.
//!
//! An agent's history is three index-aligned sequences (system prompts, user
//! prompts, replies). [`ConversationRecord`] is their on-disk form and
//! [`ConversationStore`] saves and loads it.

pub mod record;
pub mod store;

pub use record::ConversationRecord;
pub use store::{ConversationStore, FileConversationStore};
