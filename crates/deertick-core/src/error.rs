use thiserror::Error;

/// A convenience `Result` alias using [`DeertickError`].
pub type DeertickResult<T> = Result<T, DeertickError>;

/// Top-level error type for DeerTick.
///
/// The first three variants form the request-time taxonomy: configuration
/// problems are fatal to a single call, provider failures are recovered by
/// skipping the agent for the round, and parse failures are downgraded to an
/// empty reply by the caller.
#[derive(Error, Debug)]
pub enum DeertickError {
    /// Unknown or unbound provider, missing endpoint or credential, bad settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transport failure, timeout, non-2xx status or a body that is not JSON.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The response was JSON but the reply text could not be extracted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Conversation persistence failed.
    #[error("Session error: {0}")]
    Session(String),

    /// An interactive command received malformed arguments.
    #[error("Command error: {0}")]
    Command(String),

    /// A JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeertickError {
    /// Whether this error came from the outbound call rather than local setup.
    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider(_))
    }

    /// Whether this error is a configuration problem.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
