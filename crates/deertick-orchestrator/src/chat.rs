use crate::command::{help_lines, Command};
use crate::dispatch::{AgentOutcome, Dispatcher, RoundObserver, RoundReport};
use async_trait::async_trait;
use deertick_agent::{Agent, AgentOptions, HttpTransport, ModelCatalog, PROVIDERS};
use deertick_core::{DeertickError, DeertickResult, ModelKind};
use deertick_security::Credentials;
use deertick_session::ConversationStore;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Line-oriented human interface the chat runs on.
#[async_trait]
pub trait ChatSurface: Send {
    /// Ask a question and read one line. `None` means the input is closed.
    async fn prompt(&mut self, question: &str) -> DeertickResult<Option<String>>;
    fn say(&mut self, line: &str);
    /// Session notices (joins, leaves, confirmations).
    fn notice(&mut self, line: &str);
    fn error(&mut self, line: &str);
    fn reply(&mut self, model: &str, text: &str);
}

/// Builds agents from the shared configuration.
#[derive(Clone)]
pub struct AgentFactory {
    catalog: Arc<ModelCatalog>,
    credentials: Arc<Credentials>,
    transport: Arc<dyn HttpTransport>,
    options: AgentOptions,
    voices: BTreeMap<String, String>,
}

impl AgentFactory {
    pub fn new(
        catalog: Arc<ModelCatalog>,
        credentials: Arc<Credentials>,
        transport: Arc<dyn HttpTransport>,
        options: AgentOptions,
    ) -> Self {
        Self {
            catalog,
            credentials,
            transport,
            options,
            voices: BTreeMap::new(),
        }
    }

    /// Named reference clips for voice models.
    pub fn with_voices(mut self, voices: BTreeMap<String, String>) -> Self {
        self.voices = voices;
        self
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn voices(&self) -> &BTreeMap<String, String> {
        &self.voices
    }

    pub fn build(&self, model: &str, provider: &str, system_prompt: &str) -> Agent {
        Agent::builder(model)
            .provider(provider)
            .system_prompt(system_prompt)
            .options(self.options.clone())
            .build(&self.catalog, self.credentials.clone(), self.transport.clone())
    }
}

/// Writes each agent's reply to the surface as soon as it arrives.
struct SurfaceObserver<'a> {
    surface: &'a mut dyn ChatSurface,
}

impl RoundObserver for SurfaceObserver<'_> {
    fn agent_started(&mut self, _model: &str) {
        self.surface.say("-----------------------");
    }

    fn agent_finished(&mut self, outcome: &AgentOutcome) {
        match &outcome.result {
            Ok(text) => self.surface.reply(&outcome.model, text),
            Err(e) => self.surface.error(&format!("Error from {}: {e}", outcome.model)),
        }
    }
}

/// Whether the session keeps reading input after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// The interactive chat: commands plus multi-agent rounds over a surface.
pub struct ChatSession<S: ChatSurface> {
    dispatcher: Dispatcher,
    factory: AgentFactory,
    store: Arc<dyn ConversationStore>,
    surface: S,
    user_name: String,
}

impl<S: ChatSurface> ChatSession<S> {
    pub fn new(
        dispatcher: Dispatcher,
        factory: AgentFactory,
        store: Arc<dyn ConversationStore>,
        surface: S,
    ) -> Self {
        Self {
            dispatcher,
            factory,
            store,
            surface,
            user_name: "user".to_string(),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Announce an agent joining along with its usage notices.
    fn connected(&mut self, index: usize) {
        let Some(agent) = self.dispatcher.agent(index) else {
            return;
        };
        let model = agent.model().to_string();
        self.surface.notice(&format!("*{model} connected to the chat*"));
        for line in self.factory.catalog().connect_notices(&model) {
            self.surface.notice(&line);
        }
    }

    /// Greet, then read and handle lines until `%exit` or end of input.
    pub async fn run(&mut self) -> DeertickResult<()> {
        if let Some(system) = self.surface.prompt("System Prompt (leave blank for default): ").await? {
            let system = system.trim();
            if !system.is_empty() {
                self.dispatcher.set_global_system_prompt(system);
            }
        }
        if let Some(name) = self.surface.prompt("Username: ").await? {
            let name = name.trim();
            if !name.is_empty() {
                self.user_name = name.to_string();
            }
        }
        for index in 0..self.dispatcher.len() {
            self.connected(index);
        }

        loop {
            let question = format!("{}: ", self.user_name);
            let Some(line) = self.surface.prompt(&question).await? else {
                break;
            };
            if self.handle_line(&line).await == Flow::Exit {
                break;
            }
        }
        info!("Chat ended");
        Ok(())
    }

    /// Handle one line of input. Command errors are reported on the surface.
    pub async fn handle_line(&mut self, line: &str) -> Flow {
        let Some(command) = Command::parse(line) else {
            if !line.trim().is_empty() {
                self.round(line, &[]).await;
            }
            return Flow::Continue;
        };

        match self.execute(command).await {
            Ok(flow) => flow,
            Err(e) => {
                warn!(%command, error = %e, "Command failed");
                self.surface.error(&e.to_string());
                Flow::Continue
            }
        }
    }

    async fn round(&mut self, utterance: &str, forced: &[usize]) -> RoundReport {
        let mut observer = SurfaceObserver {
            surface: &mut self.surface,
        };
        let report = self
            .dispatcher
            .run_round_with(utterance, forced, &mut observer)
            .await;
        if !report.outcomes.is_empty() {
            self.surface.say("-----------------------");
        }
        report
    }

    async fn ask(&mut self, question: &str) -> DeertickResult<String> {
        self.surface
            .prompt(question)
            .await?
            .map(|answer| answer.trim().to_string())
            .ok_or_else(|| DeertickError::Command("input closed".into()))
    }

    async fn ask_index(&mut self, question: &str) -> DeertickResult<usize> {
        let raw = self.ask(question).await?;
        let index: usize = raw
            .parse()
            .map_err(|_| DeertickError::Command(format!("'{raw}' is not an agent index")))?;
        if index >= self.dispatcher.len() {
            return Err(DeertickError::Command(format!(
                "no agent at index {index} ({} registered)",
                self.dispatcher.len()
            )));
        }
        Ok(index)
    }

    fn agent_mut(&mut self, index: usize) -> DeertickResult<&mut Agent> {
        self.dispatcher
            .agent_mut(index)
            .ok_or_else(|| DeertickError::Command(format!("no agent at index {index}")))
    }

    fn list_agents(&mut self) {
        let lines: Vec<String> = self
            .dispatcher
            .agents()
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let history = if a.history() { ", history on" } else { "" };
                format!("{i}. {} as {} via {}{history}", a.model(), a.nickname(), a.provider_name())
            })
            .collect();
        for line in lines {
            self.surface.say(&line);
        }
    }

    fn list_models(&mut self) {
        let lines: Vec<String> = self
            .factory
            .catalog()
            .models()
            .iter()
            .map(|m| format!("{} ({}) [{:?}] via {}", m.name, m.id, m.kind, m.preferred_provider))
            .collect();
        for line in lines {
            self.surface.say(&line);
        }
        let providers: Vec<String> = PROVIDERS
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{i}: {p}"))
            .collect();
        self.surface.say(&format!("Providers: {}", providers.join(", ")));
    }

    async fn execute(&mut self, command: Command) -> DeertickResult<Flow> {
        match command {
            Command::Exit => return Ok(Flow::Exit),
            Command::Help => {
                self.surface.notice("Available commands:");
                for line in help_lines() {
                    self.surface.say(&line);
                }
            }
            Command::Clear => {
                self.dispatcher.clear_transcript();
                self.surface.notice("*chat history cleared*");
            }
            Command::FileRead => {
                let path = self.ask("Input file name: ").await?;
                let mut target = self.ask("Agent to show file to (l to list agents): ").await?;
                if target == "l" {
                    self.list_agents();
                    target = self.ask("Agent: ").await?;
                }
                let index: usize = target
                    .parse()
                    .map_err(|_| DeertickError::Command(format!("'{target}' is not an agent index")))?;
                if index >= self.dispatcher.len() {
                    return Err(DeertickError::Command(format!("no agent at index {index}")));
                }
                let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
                    DeertickError::Command(format!("cannot read {path}: {e}"))
                })?;
                self.round(&contents, &[index]).await;
            }
            Command::NewAgent => self.new_agent().await?,
            Command::RemoveAgent => {
                let index = self.ask_index("Index: ").await?;
                let agent = self.dispatcher.remove_agent(index)?;
                self.surface
                    .notice(&format!("*{} disconnected from the chat*", agent.model()));
            }
            Command::ListAgents => self.list_agents(),
            Command::AgentSettings => {
                let index = self.ask_index("Index: ").await?;
                let raw = self.ask("Settings (JSON object): ").await?;
                let overrides: serde_json::Value = serde_json::from_str(&raw)
                    .map_err(|e| DeertickError::Command(format!("invalid settings JSON: {e}")))?;
                self.agent_mut(index)?.settings_mut().apply_overrides(&overrides)?;
                self.surface.notice("*settings updated*");
            }
            Command::SetGlobalSystemPrompt => {
                let prompt = self.ask("System Prompt: ").await?;
                self.dispatcher.set_global_system_prompt(prompt.clone());
                for index in 0..self.dispatcher.len() {
                    self.agent_mut(index)?.set_system_prompt(prompt.clone());
                }
            }
            Command::SetAgentSystemPrompt => {
                self.list_agents();
                let index = self.ask_index("Select Agent Index: ").await?;
                let prompt = self.ask("System Prompt: ").await?;
                self.agent_mut(index)?.set_system_prompt(prompt);
            }
            Command::History => {
                let index = self.ask_index("Index: ").await?;
                let agent = self.agent_mut(index)?;
                let enabled = !agent.history();
                agent.set_history(enabled);
                let model = agent.model().to_string();
                let state = if enabled { "on" } else { "off" };
                self.surface.notice(&format!("*history {state} for {model}*"));
            }
            Command::Save => {
                let index = self.ask_index("Index: ").await?;
                let store = self.store.clone();
                let path = self.agent_mut(index)?.save_conversation(store.as_ref()).await?;
                self.surface
                    .notice(&format!("*conversation saved to {}*", path.display()));
            }
            Command::Load => {
                let index = self.ask_index("Index: ").await?;
                let path = self.ask("Conversation file: ").await?;
                let store = self.store.clone();
                self.agent_mut(index)?
                    .load_conversation(store.as_ref(), Path::new(&path))
                    .await?;
                self.surface.notice(&format!("*conversation loaded from {path}*"));
            }
        }
        Ok(Flow::Continue)
    }

    async fn new_agent(&mut self) -> DeertickResult<()> {
        let mut model = self.ask("Model (l to list models): ").await?;
        if model == "l" {
            self.list_models();
            model = self.ask("Model: ").await?;
        }
        if model.is_empty() {
            return Err(DeertickError::Command("no model given".into()));
        }
        let provider = self
            .ask("Provider (blank for the model's default, name or number): ")
            .await?;

        let system_prompt = self.dispatcher.global_system_prompt().to_string();
        let mut agent = self.factory.build(&model, &provider, &system_prompt);

        if agent.kind() == ModelKind::Voice {
            let names: Vec<String> = self.factory.voices().keys().cloned().collect();
            self.surface.say(&format!("Available voices: {}", names.join(", ")));
            let name = self.ask("Select a voice sample by key name: ").await?;
            let url = self
                .factory
                .voices()
                .get(&name)
                .cloned()
                .ok_or_else(|| DeertickError::Command(format!("unknown voice sample '{name}'")))?;
            agent.set_voice_sample(url);
        }

        if !agent.is_bound() {
            self.surface.error(&format!(
                "provider '{}' is not supported; requests from this agent will fail",
                agent.provider_name()
            ));
        }
        let index = self.dispatcher.add_agent(agent);
        self.connected(index);
        Ok(())
    }
}
