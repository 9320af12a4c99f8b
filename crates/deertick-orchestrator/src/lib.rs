//! Multi-agent chat orchestration for DeerTick.
//!
//! The [`Dispatcher`] decides, for every user utterance, which registered
//! agents answer, runs them one at a time in registration order and folds
//! each reply into a transcript that later agents in the same round see.
//! [`ChatSession`] wraps it with the `%command` state machine and a
//! [`ChatSurface`] for input and output.

/// Interactive chat session.
pub mod chat;
/// `%command` parsing.
pub mod command;
/// Agent selection and the per-round dispatch loop.
pub mod dispatch;
/// Mention and addressing tokens.
pub mod mentions;
/// Injectable randomness for selection.
pub mod random;

pub use chat::{AgentFactory, ChatSession, ChatSurface, Flow};
pub use command::Command;
pub use dispatch::{
    AgentOutcome, DispatchConfig, Dispatcher, NoopObserver, RoundObserver, RoundReport,
    Selection, SelectionReason,
};
pub use random::{RandomSource, ScriptedRandom, SeededRandom};
