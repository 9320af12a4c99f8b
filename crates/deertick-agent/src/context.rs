use deertick_core::{DeertickResult, Role};
use deertick_session::ConversationRecord;

/// Per-agent turn history as three index-aligned sequences.
///
/// A turn is opened with [`begin_turn`](Self::begin_turn) before the request
/// goes out and closed with either [`complete_turn`](Self::complete_turn) or
/// [`abandon_turn`](Self::abandon_turn), so `agent.len() <= user.len()` holds
/// at every point a caller can observe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    system: Vec<String>,
    user: Vec<String>,
    agent: Vec<String>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn system_prompts(&self) -> &[String] {
        &self.system
    }

    pub fn user_prompts(&self) -> &[String] {
        &self.user
    }

    pub fn replies(&self) -> &[String] {
        &self.agent
    }

    pub fn turn_count(&self) -> usize {
        self.user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_empty()
    }

    pub fn last_reply(&self) -> Option<&str> {
        self.agent.last().map(String::as_str)
    }

    /// Whether the newest prompt is still waiting for its reply.
    pub fn has_pending_turn(&self) -> bool {
        self.agent.len() < self.user.len()
    }

    /// Prior turns rendered as `user:`/`assistant:` lines, followed by `prompt`.
    ///
    /// A turn without a reply contributes only its user line.
    pub fn flatten(&self, prompt: &str) -> String {
        let mut out = String::new();
        for (i, user) in self.user.iter().enumerate() {
            out.push_str(&format!("{}: {user}\n", Role::User));
            if let Some(reply) = self.agent.get(i) {
                out.push_str(&format!("{}: {reply}\n", Role::Assistant));
            }
        }
        out.push_str(prompt);
        out
    }

    /// The text actually sent for `prompt` in the given mode.
    pub fn effective_prompt(&self, prompt: &str, history: bool) -> String {
        if history {
            self.flatten(prompt)
        } else {
            prompt.to_string()
        }
    }

    pub fn begin_turn(&mut self, system_prompt: &str, prompt: &str) {
        self.system.push(system_prompt.to_string());
        self.user.push(prompt.to_string());
    }

    /// Record the reply for the open turn. Ignored when no turn is open.
    pub fn complete_turn(&mut self, reply: &str) {
        if self.has_pending_turn() {
            self.agent.push(reply.to_string());
        }
    }

    /// Drop the open turn after a failed request.
    pub fn abandon_turn(&mut self) {
        if self.has_pending_turn() {
            self.system.pop();
            self.user.pop();
        }
    }

    pub fn to_record(&self, model: &str) -> ConversationRecord {
        ConversationRecord::new(
            model,
            self.system.clone(),
            self.user.clone(),
            self.agent.clone(),
        )
    }

    pub fn from_record(record: ConversationRecord) -> DeertickResult<Self> {
        record.validate()?;
        Ok(Self {
            system: record.system,
            user: record.user,
            agent: record.agent,
        })
    }
}
