//! Core types and error definitions for DeerTick.
//!
//! This crate provides the foundational types shared across all DeerTick crates.
//!
//! # Main types
//!
//! - [`DeertickError`] — Unified error enum for all DeerTick subsystems.
//! - [`DeertickResult`] — Convenience alias for `Result<T, DeertickError>`.
//! - [`Role`] — Speaker label used when a conversation is flattened into text.
//! - [`ModelKind`] — What a model produces (chat text, voice, image, video).

mod error;
mod message;

pub use error::{DeertickError, DeertickResult};
pub use message::{ModelKind, Role};
