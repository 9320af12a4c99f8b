use chrono::{DateTime, Utc};
use deertick_core::{DeertickError, DeertickResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Serialized conversation of one agent.
///
/// `system[i]` and `user[i]` were sent together; `agent[i]` is the reply to
/// them, so `agent` may be at most as long as `user`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: Uuid,
    #[serde(default)]
    pub model: String,
    #[serde(default = "Utc::now")]
    pub saved_at: DateTime<Utc>,
    pub system: Vec<String>,
    pub user: Vec<String>,
    pub agent: Vec<String>,
}

impl ConversationRecord {
    pub fn new(
        model: impl Into<String>,
        system: Vec<String>,
        user: Vec<String>,
        agent: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            model: model.into(),
            saved_at: Utc::now(),
            system,
            user,
            agent,
        }
    }

    pub fn turn_count(&self) -> usize {
        self.user.len()
    }

    /// Reject records whose sequences cannot describe a real conversation.
    pub fn validate(&self) -> DeertickResult<()> {
        if self.system.len() != self.user.len() {
            return Err(DeertickError::Session(format!(
                "conversation {} has {} system prompts for {} user prompts",
                self.id,
                self.system.len(),
                self.user.len()
            )));
        }
        if self.agent.len() > self.user.len() {
            return Err(DeertickError::Session(format!(
                "conversation {} has {} replies for {} user prompts",
                self.id,
                self.agent.len(),
                self.user.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_pending_reply_is_valid() {
        let record = ConversationRecord::new(
            "gpt-4o",
            strings(&["sys", "sys"]),
            strings(&["hi", "again"]),
            strings(&["hello"]),
        );
        assert!(record.validate().is_ok());
        assert_eq!(record.turn_count(), 2);
    }

    #[test]
    fn test_more_replies_than_prompts_is_rejected() {
        let record = ConversationRecord::new(
            "gpt-4o",
            strings(&["sys"]),
            strings(&["hi"]),
            strings(&["a", "b"]),
        );
        let err = record.validate().unwrap_err();
        assert!(matches!(err, DeertickError::Session(_)));
    }

    #[test]
    fn test_reads_legacy_layout_without_metadata() {
        let json = r#"{
            "id": "7f0c7b4e-5a39-4a53-b8a4-6d0c9f1d2e3a",
            "system": [""],
            "user": ["hello"],
            "agent": [""]
        }"#;
        let record: ConversationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.model, "");
        assert_eq!(record.agent, vec![String::new()]);
        assert!(record.validate().is_ok());
    }
}
