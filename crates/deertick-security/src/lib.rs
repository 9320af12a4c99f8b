//! Request pacing and credential resolution for DeerTick agents.
//!
//! # Main types
//!
//! - [`RateLimiter`] — Minimum-interval gate owned by a single agent.
//! - [`Credentials`] — Provider name to bearer token map, passed explicitly
//!   into agent construction.

/// Provider credential resolution.
pub mod credentials;
/// Minimum-interval request pacing.
pub mod rate_limit;

pub use credentials::{Credentials, PROVIDER_ENV_VARS};
pub use rate_limit::RateLimiter;
