use deertick_agent::{AgentOptions, VisualSettings};
use deertick_orchestrator::DispatchConfig;
use deertick_security::Credentials;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Contents of `deertick.toml`.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct DeertickConfig {
    /// Provider name to bearer token.
    pub keys: Credentials,
    pub agent: AgentOptions,
    pub chat: DispatchConfig,
    /// Image and video generation knobs.
    pub media: VisualSettings,
    pub paths: PathsConfig,
    /// Voice sample name to reference audio URL.
    pub voices: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub conversations: PathBuf,
    pub images: PathBuf,
    pub audio: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            conversations: PathBuf::from("conversations"),
            images: PathBuf::from("img"),
            audio: PathBuf::from("tts"),
        }
    }
}

impl DeertickConfig {
    /// Read the config file. A missing file yields the defaults.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Failed to read config file '{}': {e}",
                    path.display()
                ))
            }
        };
        Self::parse(&text)
            .map_err(|e| anyhow::anyhow!("Invalid config file '{}': {e}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Tokens from `[keys]`, completed from the environment.
    pub fn credentials(&self) -> Credentials {
        self.credentials_with(|var| std::env::var(var).ok())
    }

    fn credentials_with<F>(&self, lookup: F) -> Credentials
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut credentials = self.keys.clone();
        credentials.fill_missing_from(lookup);
        credentials
    }
}
