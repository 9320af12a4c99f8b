//! Voice, image and video generation for non-chat agents.

use crate::config::Provider;
use crate::transport::{HttpRequest, HttpTransport};
use async_trait::async_trait;
use deertick_core::{DeertickError, DeertickResult, ModelKind};
use deertick_security::Credentials;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Produces media files for voice and visual agents.
#[async_trait]
pub trait MediaGenerator: Send + Sync {
    /// Speak `text` in the voice of the reference clip at `voice_sample`.
    async fn synthesize_voice(
        &self,
        model: &str,
        text: &str,
        voice_sample: &str,
    ) -> DeertickResult<Vec<PathBuf>>;

    /// Render an image or video clip for `prompt`.
    async fn generate_visual(
        &self,
        kind: ModelKind,
        model: &str,
        prompt: &str,
    ) -> DeertickResult<Vec<PathBuf>>;
}

/// Knobs forwarded to image and video models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualSettings {
    pub output_format: String,
    pub num_outputs: u32,
    pub aspect_ratio: String,
    pub guidance_scale: f64,
    pub num_inference_steps: u32,
    pub seed: Option<u64>,
}

impl Default for VisualSettings {
    fn default() -> Self {
        Self {
            output_format: "webp".to_string(),
            num_outputs: 1,
            aspect_ratio: "1:1".to_string(),
            guidance_scale: 7.5,
            num_inference_steps: 50,
            seed: None,
        }
    }
}

/// [`MediaGenerator`] backed by Replicate predictions.
pub struct ReplicateMedia {
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<Credentials>,
    endpoint: String,
    images_dir: PathBuf,
    audio_dir: PathBuf,
    visual: VisualSettings,
}

impl ReplicateMedia {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<Credentials>,
        images_dir: impl Into<PathBuf>,
        audio_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transport,
            credentials,
            endpoint: Provider::Replicate
                .endpoint(None)
                .unwrap_or_else(|| "https://api.replicate.com/v1/predictions".to_string()),
            images_dir: images_dir.into(),
            audio_dir: audio_dir.into(),
            visual: VisualSettings::default(),
        }
    }

    /// Point predictions at another host (self-hosted gateways, tests).
    pub fn with_base_url(mut self, base: &str) -> Self {
        if let Some(endpoint) = Provider::Replicate.endpoint(Some(base)) {
            self.endpoint = endpoint;
        }
        self
    }

    pub fn with_visual_settings(mut self, visual: VisualSettings) -> Self {
        self.visual = visual;
        self
    }

    async fn predict(&self, model: &str, input: serde_json::Value) -> DeertickResult<Vec<String>> {
        let token = self.credentials.require(Provider::Replicate.name())?;
        let request = HttpRequest::new(
            self.endpoint.clone(),
            serde_json::json!({"version": model, "input": input}),
        )
        .header("Authorization", format!("Bearer {token}"))
        .header("Content-Type", "application/json")
        .header("Prefer", "wait");

        let body = self.transport.post_json(&request).await?;
        let urls = output_urls(&body);
        if urls.is_empty() {
            return Err(DeertickError::Provider(format!(
                "prediction for {model} returned no media URL"
            )));
        }
        Ok(urls)
    }

    async fn download_all(
        &self,
        urls: &[String],
        dir: &Path,
        model: &str,
        extension: &str,
    ) -> DeertickResult<Vec<PathBuf>> {
        tokio::fs::create_dir_all(dir).await?;
        let stamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S-%3f");
        let stem = file_stem(model);

        let mut saved = Vec::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            let bytes = self.transport.get_bytes(url).await?;
            let name = if urls.len() == 1 {
                format!("{stem}_{stamp}.{extension}")
            } else {
                format!("{stem}_{stamp}_{i}.{extension}")
            };
            let path = dir.join(name);
            tokio::fs::write(&path, &bytes).await?;
            info!(path = %path.display(), bytes = bytes.len(), "Media saved");
            saved.push(path);
        }
        Ok(saved)
    }
}

#[async_trait]
impl MediaGenerator for ReplicateMedia {
    async fn synthesize_voice(
        &self,
        model: &str,
        text: &str,
        voice_sample: &str,
    ) -> DeertickResult<Vec<PathBuf>> {
        let input = serde_json::json!({"speaker": voice_sample, "text": text});
        let urls = self.predict(model, input).await?;
        // One clip per request.
        self.download_all(&urls[..1], &self.audio_dir, model, "wav").await
    }

    async fn generate_visual(
        &self,
        kind: ModelKind,
        model: &str,
        prompt: &str,
    ) -> DeertickResult<Vec<PathBuf>> {
        let v = &self.visual;
        let (mut input, extension) = match kind {
            ModelKind::Video => (
                serde_json::json!({
                    "prompt": prompt,
                    "steps": v.num_inference_steps,
                    "guidance_scale": v.guidance_scale,
                }),
                "mp4",
            ),
            ModelKind::Image => (
                serde_json::json!({
                    "prompt": prompt,
                    "num_outputs": v.num_outputs,
                    "output_format": v.output_format,
                    "aspect_ratio": v.aspect_ratio,
                    "guidance_scale": v.guidance_scale,
                    "num_inference_steps": v.num_inference_steps,
                }),
                v.output_format.as_str(),
            ),
            ModelKind::Chat | ModelKind::Voice => {
                return Err(DeertickError::Configuration(format!(
                    "{model} is not an image or video model"
                )))
            }
        };
        if let Some(seed) = v.seed {
            input["seed"] = serde_json::json!(seed);
        }

        let urls = self.predict(model, input).await?;
        self.download_all(&urls, &self.images_dir, model, extension).await
    }
}

/// URLs found in a prediction's `output` (a string or a list of strings).
fn output_urls(body: &serde_json::Value) -> Vec<String> {
    match &body["output"] {
        serde_json::Value::String(url) if !url.is_empty() => vec![url.clone()],
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Model identifiers contain `/` and `:`; keep a filesystem-safe short name.
fn file_stem(model: &str) -> String {
    let base = model.split(':').next().unwrap_or(model);
    let base = base.rsplit('/').next().unwrap_or(base);
    base.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_output_urls() {
        assert_eq!(
            output_urls(&serde_json::json!({"output": "https://x/a.wav"})),
            vec!["https://x/a.wav".to_string()]
        );
        assert_eq!(
            output_urls(&serde_json::json!({"output": ["https://x/1.webp", "", "https://x/2.webp"]})),
            vec!["https://x/1.webp".to_string(), "https://x/2.webp".to_string()]
        );
        assert!(output_urls(&serde_json::json!({"output": null})).is_empty());
        assert!(output_urls(&serde_json::json!({"status": "failed"})).is_empty());
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("lucataco/xtts-v2:684bc3855b37"), "xtts-v2");
        assert_eq!(file_stem("black-forest-labs/flux-schnell"), "flux-schnell");
        assert_eq!(file_stem("weird name"), "weird_name");
    }

    #[test]
    fn test_visual_settings_defaults() {
        let v: VisualSettings = serde_json::from_str(r#"{"num_outputs": 2}"#).unwrap();
        assert_eq!(v.num_outputs, 2);
        assert_eq!(v.output_format, "webp");
        assert!(v.seed.is_none());
    }
}
