use deertick_core::{DeertickError, DeertickResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// Environment variables consulted for providers that have no configured key.
pub const PROVIDER_ENV_VARS: &[(&str, &str)] = &[
    ("openai", "OPENAI_API_KEY"),
    ("openrouter", "OPENROUTER_API_KEY"),
    ("anthropic", "ANTHROPIC_API_KEY"),
    ("mistral", "MISTRAL_API_KEY"),
    ("replicate", "REPLICATE_API_TOKEN"),
    ("huggingface", "HUGGINGFACE_API_KEY"),
    ("google", "GOOGLE_API_KEY"),
];

/// Bearer tokens keyed by provider name.
///
/// A missing token is not an error until a request actually needs it.
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Credentials {
    tokens: HashMap<String, String>,
}

impl Credentials {
    /// An empty credential set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_token(mut self, provider: impl Into<String>, token: impl Into<String>) -> Self {
        self.insert(provider, token);
        self
    }

    /// Set the token for a provider, replacing any previous one.
    pub fn insert(&mut self, provider: impl Into<String>, token: impl Into<String>) {
        self.tokens.insert(provider.into(), token.into());
    }

    /// Fill providers that have no token using `lookup(env_var_name)`.
    pub fn fill_missing_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (provider, var) in PROVIDER_ENV_VARS {
            if self.token(provider).is_some() {
                continue;
            }
            if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
                self.tokens.insert((*provider).to_string(), value);
            }
        }
    }

    /// The token for `provider`, ignoring blank entries.
    pub fn token(&self, provider: &str) -> Option<&str> {
        self.tokens
            .get(provider)
            .map(String::as_str)
            .filter(|t| !t.trim().is_empty())
    }

    /// The token for `provider`, or a configuration error naming it.
    pub fn require(&self, provider: &str) -> DeertickResult<&str> {
        self.token(provider).ok_or_else(|| {
            DeertickError::Configuration(format!("no API key configured for provider '{provider}'"))
        })
    }

    /// Providers that currently have a usable token.
    pub fn providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .tokens
            .iter()
            .filter(|(_, t)| !t.trim().is_empty())
            .map(|(p, _)| p.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("providers", &self.providers())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_require_missing_is_configuration_error() {
        let creds = Credentials::new().with_token("openai", "sk-1");
        assert_eq!(creds.require("openai").unwrap(), "sk-1");
        let err = creds.require("mistral").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("mistral"));
    }

    #[test]
    fn test_blank_token_counts_as_missing() {
        let creds = Credentials::new().with_token("openrouter", "  ");
        assert!(creds.token("openrouter").is_none());
        assert!(creds.providers().is_empty());
    }

    #[test]
    fn test_env_fill_does_not_override_configured_keys() {
        let mut creds = Credentials::new().with_token("openai", "from-config");
        creds.fill_missing_from(|var| match var {
            "OPENAI_API_KEY" => Some("from-env".into()),
            "REPLICATE_API_TOKEN" => Some("r8_token".into()),
            _ => None,
        });
        assert_eq!(creds.token("openai"), Some("from-config"));
        assert_eq!(creds.token("replicate"), Some("r8_token"));
        assert_eq!(creds.providers(), vec!["openai", "replicate"]);
    }

    #[test]
    fn test_debug_output_hides_tokens() {
        let creds = Credentials::new().with_token("anthropic", "secret-value");
        let shown = format!("{creds:?}");
        assert!(shown.contains("anthropic"));
        assert!(!shown.contains("secret-value"));
    }

    #[test]
    fn test_deserializes_from_keys_table() {
        let creds: Credentials = toml::from_str(
            r#"
            openai = "sk-a"
            huggingface = "hf-b"
            "#,
        )
        .unwrap();
        assert_eq!(creds.token("huggingface"), Some("hf-b"));
    }
}
