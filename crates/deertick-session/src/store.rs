use crate::record::ConversationRecord;
use deertick_core::{DeertickError, DeertickResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persist a record and return where it was written.
    async fn save(&self, record: &ConversationRecord) -> DeertickResult<PathBuf>;
    async fn load(&self, path: &Path) -> DeertickResult<ConversationRecord>;
    async fn list(&self) -> DeertickResult<Vec<PathBuf>>;
}

/// File-based conversation store (pretty-printed JSON, one file per save).
pub struct FileConversationStore {
    dir: PathBuf,
}

impl FileConversationStore {
    pub async fn new(dir: PathBuf) -> DeertickResult<Self> {
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, record: &ConversationRecord) -> PathBuf {
        let stamp = record.saved_at.format("%Y-%m-%dT%H-%M-%S-%3fZ");
        let short_id = &record.id.simple().to_string()[..8];
        self.dir
            .join(format!("conversation_{stamp}_{short_id}.json"))
    }

    /// Relative paths that do not exist as given are looked up in the store directory.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_relative() && !path.exists() {
            self.dir.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

#[async_trait]
impl ConversationStore for FileConversationStore {
    async fn save(&self, record: &ConversationRecord) -> DeertickResult<PathBuf> {
        record.validate()?;
        let path = self.record_path(record);
        let json = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&path, json).await?;
        info!(path = %path.display(), turns = record.turn_count(), "Conversation saved");
        Ok(path)
    }

    async fn load(&self, path: &Path) -> DeertickResult<ConversationRecord> {
        let path = self.resolve(path);
        let data = tokio::fs::read_to_string(&path).await.map_err(|e| {
            DeertickError::Session(format!("Failed to read {}: {e}", path.display()))
        })?;
        let record: ConversationRecord = serde_json::from_str(&data)
            .map_err(|e| DeertickError::Session(format!("Failed to parse conversation: {e}")))?;
        record.validate()?;
        info!(path = %path.display(), turns = record.turn_count(), "Conversation loaded");
        Ok(record)
    }

    async fn list(&self) -> DeertickResult<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with("conversation_") && name.ends_with(".json") {
                    paths.push(entry.path());
                }
            }
        }
        paths.sort();
        Ok(paths)
    }
}
