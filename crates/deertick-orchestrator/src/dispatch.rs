use crate::mentions::{addresses_model, addresses_nickname, mentions};
use crate::random::{RandomSource, SeededRandom};
use deertick_agent::{Agent, MediaGenerator};
use deertick_core::{DeertickError, DeertickResult, ModelKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Selection probabilities for one chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Chance that an agent addressed with `nick>` or `<model` answers.
    pub name_mention: f64,
    /// Chance that any other agent chimes in.
    pub random_response: f64,
    /// Reserved for parallel dispatch. Rounds are always sequential.
    pub max_concurrent: usize,
    /// Seed for reproducible selection.
    pub seed: Option<u64>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            name_mention: 0.5,
            random_response: 0.1,
            max_concurrent: 5,
            seed: None,
        }
    }
}

/// Why an agent was picked for a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReason {
    /// Named with `@model` or `@nickname`.
    Mentioned,
    /// Chosen by the caller, e.g. the target of a shared file.
    Forced,
    /// Addressed with `nick>` or `<model` and won the `name_mention` draw.
    Addressed,
    /// Won the `random_response` draw.
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Registration index of the agent.
    pub index: usize,
    pub reason: SelectionReason,
}

/// Result of one agent's turn within a round.
#[derive(Debug)]
pub struct AgentOutcome {
    pub index: usize,
    pub model: String,
    pub nickname: String,
    pub reason: SelectionReason,
    pub result: DeertickResult<String>,
}

/// Everything that happened during one round.
#[derive(Debug, Default)]
pub struct RoundReport {
    pub outcomes: Vec<AgentOutcome>,
}

impl RoundReport {
    pub fn responders(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_ok())
            .map(|o| o.model.as_str())
            .collect()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }
}

/// Live notifications while a round runs, so each reply can be shown before
/// the next agent is invoked.
pub trait RoundObserver {
    fn agent_started(&mut self, _model: &str) {}
    fn agent_finished(&mut self, outcome: &AgentOutcome);
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl RoundObserver for NoopObserver {
    fn agent_finished(&mut self, _outcome: &AgentOutcome) {}
}

/// The multi-agent dispatch loop.
///
/// Holds the registered agents in registration order and the rolling
/// transcript shared by every agent that answers.
pub struct Dispatcher {
    agents: Vec<Agent>,
    transcript: String,
    config: DispatchConfig,
    rng: Box<dyn RandomSource>,
    media: Option<Arc<dyn MediaGenerator>>,
    global_system_prompt: String,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        let rng = Box::new(SeededRandom::new(config.seed));
        Self::with_random(config, rng)
    }

    /// Use an explicit randomness source (scripted draws in tests).
    pub fn with_random(config: DispatchConfig, rng: Box<dyn RandomSource>) -> Self {
        Self {
            agents: Vec::new(),
            transcript: String::new(),
            config,
            rng,
            media: None,
            global_system_prompt: String::new(),
        }
    }

    /// Generator used for voice, image and video agents.
    pub fn with_media(mut self, media: Arc<dyn MediaGenerator>) -> Self {
        self.media = Some(media);
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Register an agent and return its index.
    pub fn add_agent(&mut self, agent: Agent) -> usize {
        info!(model = %agent.model(), nickname = %agent.nickname(), provider = %agent.provider_name(), "Agent joined");
        self.agents.push(agent);
        self.agents.len() - 1
    }

    pub fn remove_agent(&mut self, index: usize) -> DeertickResult<Agent> {
        if index >= self.agents.len() {
            return Err(DeertickError::Command(format!(
                "no agent at index {index} ({} registered)",
                self.agents.len()
            )));
        }
        let agent = self.agents.remove(index);
        info!(model = %agent.model(), "Agent left");
        Ok(agent)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, index: usize) -> Option<&Agent> {
        self.agents.get(index)
    }

    pub fn agent_mut(&mut self, index: usize) -> Option<&mut Agent> {
        self.agents.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
    }

    pub fn global_system_prompt(&self) -> &str {
        &self.global_system_prompt
    }

    pub fn set_global_system_prompt(&mut self, prompt: impl Into<String>) {
        self.global_system_prompt = prompt.into();
    }

    /// Decide which agents answer `utterance`, in registration order.
    ///
    /// Explicit mentions and `forced` indices always select. Otherwise an
    /// addressed agent gets a `name_mention` draw, and an agent still not
    /// selected gets a `random_response` draw. No agent is selected twice.
    pub fn select(&mut self, utterance: &str, forced: &[usize]) -> Vec<Selection> {
        let mut selected = Vec::new();
        for (index, agent) in self.agents.iter().enumerate() {
            let reason = if mentions(utterance, agent.model()) || mentions(utterance, agent.nickname()) {
                Some(SelectionReason::Mentioned)
            } else if forced.contains(&index) {
                Some(SelectionReason::Forced)
            } else {
                let addressed = addresses_nickname(utterance, agent.nickname())
                    || addresses_model(utterance, agent.model());
                if addressed && self.rng.next_f64() < self.config.name_mention {
                    Some(SelectionReason::Addressed)
                } else if self.rng.next_f64() < self.config.random_response {
                    Some(SelectionReason::Random)
                } else {
                    None
                }
            };
            if let Some(reason) = reason {
                debug!(model = %agent.model(), ?reason, "Agent selected");
                selected.push(Selection { index, reason });
            }
        }
        selected
    }

    /// Process one utterance with the normal selection rules.
    pub async fn run_round(
        &mut self,
        utterance: &str,
        observer: &mut dyn RoundObserver,
    ) -> RoundReport {
        self.run_round_with(utterance, &[], observer).await
    }

    /// Process one utterance, additionally selecting the `forced` agents.
    ///
    /// Agents run one after another; each sees the transcript including the
    /// replies of the agents before it. A failing agent is reported and
    /// skipped without touching the transcript further.
    pub async fn run_round_with(
        &mut self,
        utterance: &str,
        forced: &[usize],
        observer: &mut dyn RoundObserver,
    ) -> RoundReport {
        let selection = self.select(utterance, forced);
        let mut report = RoundReport::default();

        for Selection { index, reason } in selection {
            let agent_prompt = format!("{}\n{}\n", self.transcript, utterance);
            self.transcript.clone_from(&agent_prompt);

            let Some(agent) = self.agents.get_mut(index) else {
                continue;
            };
            observer.agent_started(agent.model());

            let result = match agent.kind() {
                ModelKind::Chat => {
                    if agent.system_prompt().is_empty() && !self.global_system_prompt.is_empty() {
                        agent.set_system_prompt(self.global_system_prompt.clone());
                    }
                    let system_prompt = agent.system_prompt().to_string();
                    agent.respond(&system_prompt, &agent_prompt).await
                }
                ModelKind::Voice | ModelKind::Image | ModelKind::Video => match &self.media {
                    Some(media) => agent.generate_media(media.as_ref(), utterance).await,
                    None => Err(DeertickError::Configuration(
                        "no media generator configured".into(),
                    )),
                },
            };

            match &result {
                Ok(reply) => {
                    self.transcript
                        .push_str(&format!("\n{}: {}\n", agent.model(), reply));
                }
                Err(e) => {
                    warn!(model = %agent.model(), error = %e, "Agent failed, skipping for this round");
                }
            }

            let outcome = AgentOutcome {
                index,
                model: agent.model().to_string(),
                nickname: agent.nickname().to_string(),
                reason,
                result,
            };
            observer.agent_finished(&outcome);
            report.outcomes.push(outcome);
        }

        report
    }
}
