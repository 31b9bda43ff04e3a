//! Chatbot engine - routes chat, commands, button presses and background rounds.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chatbot::commands::{parse_list_arg, Command, ListArg};
use crate::chatbot::journal::Entry;
use crate::chatbot::prompt::{self, CHAT_SAMPLING, REFLECTION_SAMPLING, STUDY_SAMPLING};
use crate::chatbot::proposals::{Decision, Proposal};
use crate::chatbot::state::AppState;
use crate::chatbot::telegram::Outbox;
use crate::chatbot::ticker::Clock;
use crate::classifier::{Classifier, Verdict};
use crate::config::LoopMode;
use crate::openai::{Completer, Message};
use teloxide::utils::command::BotCommands;

pub const DEV_MODE_PREFIX: &str = "(Dev mode) You said: ";
pub const APOLOGY: &str = "Sorry, I hit an error. Please try again.";
pub const PRIVATE_BOT: &str = "Private bot. Ask the owner for access.";
const EMPTY_REPLY: &str = "I'm here. 💜";
const NO_MODEL_TOPIC: &str = "(no model)";
const NO_MODEL_SUMMARY: &str = "(OPENAI_API_KEY not set)";
const NO_OUTPUT: &str = "(no output)";

/// How many values `/status` shows before eliding the rest.
const STATUS_VALUES: usize = 5;
const STATUS_PREVIEW_CHARS: usize = 80;

/// Chatbot configuration.
#[derive(Debug, Clone)]
pub struct ChatbotConfig {
    pub family_name: String,
    /// The only user allowed to chat, pause the loop and decide proposals.
    pub owner_id: Option<i64>,
    pub loop_mode: LoopMode,
    pub background_enabled: bool,
    pub interval_secs: u64,
    pub dm_every_n: u64,
    pub model: String,
    pub log_file: Option<PathBuf>,
}

impl Default for ChatbotConfig {
    fn default() -> Self {
        Self {
            family_name: "Shakyla Family".to_string(),
            owner_id: None,
            loop_mode: LoopMode::Reflection,
            background_enabled: true,
            interval_secs: 3600,
            dm_every_n: 0,
            model: "gpt-4o-mini".to_string(),
            log_file: None,
        }
    }
}

/// What one background round did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Loop is paused; nothing was requested or recorded.
    Paused,
    /// Nothing to do (reflection without a model).
    Skipped,
    /// Reflection was safe; its note went to the journal.
    Noted,
    /// Reflection was risky; a proposal was stored and sent to the owner.
    Proposed(String),
    Studied { topic: String, dm_sent: bool },
    /// The round failed and an error record was journaled.
    Failed(String),
}

/// Reply to a button press: the toast text and, if the card should change, its new text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackReply {
    pub answer: String,
    pub edit: Option<String>,
}

/// The chatbot engine.
pub struct ChatbotEngine {
    config: ChatbotConfig,
    state: AppState,
    /// None means dev mode.
    completer: Option<Arc<dyn Completer>>,
    classifier: Arc<dyn Classifier>,
    outbox: Arc<dyn Outbox>,
    clock: Arc<dyn Clock>,
}

impl ChatbotEngine {
    pub fn new(
        config: ChatbotConfig,
        state: AppState,
        completer: Option<Arc<dyn Completer>>,
        classifier: Arc<dyn Classifier>,
        outbox: Arc<dyn Outbox>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            state,
            completer,
            classifier,
            outbox,
            clock,
        }
    }

    pub fn config(&self) -> &ChatbotConfig {
        &self.config
    }

    #[cfg(test)]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    fn is_owner(&self, user_id: i64) -> bool {
        self.config.owner_id == Some(user_id)
    }

    /// Handle a plain text message. Returns the reply, if any.
    pub async fn handle_text(&self, user_id: i64, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() || text.starts_with('/') {
            return None;
        }

        if self.config.owner_id.is_some() && !self.is_owner(user_id) {
            info!("🚫 Chat from non-owner {}", user_id);
            return Some(PRIVATE_BOT.to_string());
        }

        let Some(ref completer) = self.completer else {
            return Some(format!("{DEV_MODE_PREFIX}{text}"));
        };

        info!("📨 {}: \"{}\"", user_id, text.chars().take(50).collect::<String>());

        self.state.push_turn(user_id, Message::user(text)).await;
        let system = prompt::chat_system_prompt(&self.config.family_name, &self.state.values().await);
        let messages = prompt::compose_chat(system, self.state.history(user_id).await);

        match completer.complete(&messages, CHAT_SAMPLING).await {
            Ok(reply) => {
                let reply = match reply.trim() {
                    "" => EMPTY_REPLY.to_string(),
                    r => r.to_string(),
                };
                self.state.push_turn(user_id, Message::assistant(reply.clone())).await;
                Some(reply)
            }
            Err(e) => {
                warn!("Completion failed for {}: {}", user_id, e);
                Some(APOLOGY.to_string())
            }
        }
    }

    /// Handle a slash command. Always produces a reply.
    pub async fn handle_command(&self, user_id: i64, command: Command) -> String {
        debug!("Command {:?} from {}", command, user_id);

        match command {
            Command::Start => self.greeting(),
            Command::Help => Command::descriptions().to_string(),
            Command::Whoami => format!("Your Telegram ID: {}", user_id),
            Command::Reset => {
                self.state.reset_history(user_id).await;
                "Memory cleared for our chat. ✨".to_string()
            }
            Command::Status => self.status().await,
            Command::Pause | Command::Resume if self.config.owner_id.is_some() && !self.is_owner(user_id) => {
                "Only the owner can control the loop.".to_string()
            }
            Command::Pause => {
                self.state.set_paused(true);
                info!("⏸️ Background loop paused by {}", user_id);
                "⏸️ Paused.".to_string()
            }
            Command::Resume => {
                self.state.set_paused(false);
                info!("▶️ Background loop resumed by {}", user_id);
                "▶️ Resumed.".to_string()
            }
            Command::Topics(arg) => match parse_list_arg(&arg) {
                ListArg::Show => format!(
                    "Topics:\n{}\n\nAdd: /topics add {{topic}}",
                    bullets(&self.state.curriculum().await)
                ),
                ListArg::Add(topic) => {
                    self.state.add_topic(topic.to_string()).await;
                    info!("Added topic \"{}\"", topic);
                    "Added to curriculum ✅".to_string()
                }
                ListArg::AddMissing => "Usage: /topics add Sacred geometry basics".to_string(),
                ListArg::Other => "Try: /topics   or   /topics add Compassion in conflict".to_string(),
            },
            Command::Values(arg) => match parse_list_arg(&arg) {
                ListArg::Show => format!(
                    "Values:\n{}\n\nAdd: /values add {{word/phrase}}",
                    bullets(&self.state.values().await)
                ),
                ListArg::Add(value) => {
                    if self.state.add_value(value.to_string()).await {
                        info!("Added value \"{}\"", value);
                    }
                    "Added to values ✅".to_string()
                }
                ListArg::AddMissing => "Usage: /values add Empathy".to_string(),
                ListArg::Other => "Try: /values   or   /values add Gratitude".to_string(),
            },
            Command::Family => format!(
                "👨‍👩‍👧 {}\nCore values: {}\n({} mode)",
                self.config.family_name,
                self.state.values().await.join(", "),
                self.config.loop_mode.as_str()
            ),
        }
    }

    /// Handle an approve/reject button press with payload `action:id`.
    pub async fn handle_callback(&self, user_id: i64, payload: &str) -> CallbackReply {
        match self.state.decide(payload, user_id, self.config.owner_id).await {
            Decision::Approved(proposal) => {
                info!("✅ Proposal {} approved", proposal.id);
                let result = execute_risky_task(&proposal);
                CallbackReply {
                    answer: "Approved.".to_string(),
                    edit: Some(format!("✅ Approved: {}\n\n{}", proposal.title, result)),
                }
            }
            Decision::Rejected(proposal) => {
                info!("❌ Proposal {} rejected", proposal.id);
                CallbackReply {
                    answer: "Rejected.".to_string(),
                    edit: Some(format!("❌ Rejected: {}", proposal.title)),
                }
            }
            Decision::AlreadyHandled => CallbackReply {
                answer: "Already handled.".to_string(),
                edit: None,
            },
            Decision::Unauthorized => {
                warn!("Unauthorized decision attempt by {} on \"{}\"", user_id, payload);
                CallbackReply {
                    answer: "Only the owner can decide.".to_string(),
                    edit: None,
                }
            }
            Decision::UnknownAction => CallbackReply {
                answer: "Unknown action.".to_string(),
                edit: None,
            },
        }
    }

    /// Run one background round. Failures are journaled, never returned.
    pub async fn tick(&self) -> TickOutcome {
        if self.state.is_paused() {
            debug!("Loop paused, skipping round");
            return TickOutcome::Paused;
        }

        let now = self.clock.now();
        let result = match self.config.loop_mode {
            LoopMode::Reflection => self.reflect(now).await,
            LoopMode::Study => self.study(now).await,
        };

        match result {
            Ok(outcome) => {
                debug!("Round finished: {:?}", outcome);
                outcome
            }
            Err(e) => {
                warn!("Background round failed: {}", e);
                self.state.journal(now, Entry::Error { error: e.clone() }).await;
                TickOutcome::Failed(e)
            }
        }
    }

    async fn reflect(&self, now: DateTime<Utc>) -> Result<TickOutcome, String> {
        let Some(ref completer) = self.completer else {
            debug!("Dev mode, no reflection");
            return Ok(TickOutcome::Skipped);
        };

        let values = self.state.values().await;
        let messages = prompt::reflection_request(&self.config.family_name, &values);
        let text = completer
            .complete(&messages, REFLECTION_SAMPLING)
            .await
            .map_err(|e| e.to_string())?;

        self.state.journal(now, Entry::Reflection { text: text.clone() }).await;
        self.state.count_tick();

        match self.classifier.classify(&text) {
            Verdict::Safe { note } => {
                info!("📝 Saved note: {}", note.chars().take(80).collect::<String>());
                self.state.journal(now, Entry::Note { note }).await;
                Ok(TickOutcome::Noted)
            }
            Verdict::Risky { title, reason, plan } => {
                let owner = self.config.owner_id.ok_or("risky task but no owner to approve it")?;
                let proposal = self.state.create_proposal(title, reason, plan, now).await;
                info!("⚠️ Proposal {} created: {}", proposal.id, proposal.title);
                self.outbox.send_approval_card(owner, &proposal).await?;
                Ok(TickOutcome::Proposed(proposal.id))
            }
        }
    }

    async fn study(&self, now: DateTime<Utc>) -> Result<TickOutcome, String> {
        let (topic, summary) = match self.completer {
            None => (NO_MODEL_TOPIC.to_string(), NO_MODEL_SUMMARY.to_string()),
            Some(ref completer) => {
                let topic = self
                    .state
                    .topic_at(now, self.config.interval_secs)
                    .await
                    .ok_or("curriculum is empty")?;
                let messages = prompt::study_request(&self.state.values().await, prompt::ROSTER, &topic);
                let summary = completer
                    .complete(&messages, STUDY_SAMPLING)
                    .await
                    .map_err(|e| e.to_string())?;
                let summary = if summary.trim().is_empty() { NO_OUTPUT.to_string() } else { summary };
                (topic, summary)
            }
        };

        info!("📚 Study round: {}", topic);
        self.state
            .journal(now, Entry::Study { topic: topic.clone(), summary: summary.clone() })
            .await;
        let round = self.state.count_tick();

        let mut dm_sent = false;
        if self.config.dm_every_n > 0
            && round % self.config.dm_every_n == 0
            && let Some(owner) = self.config.owner_id
        {
            let text = format!("🕊️ Council — {topic}\n\n{summary}");
            match self.outbox.send_text(owner, &text).await {
                Ok(_) => dm_sent = true,
                Err(e) => warn!("Failed to DM owner after round {}: {}", round, e),
            }
        }

        Ok(TickOutcome::Studied { topic, dm_sent })
    }

    fn greeting(&self) -> String {
        let loop_line = match (self.config.background_enabled, self.config.loop_mode) {
            (false, _) => "• The background loop is off.".to_string(),
            (true, LoopMode::Reflection) => {
                "• I reflect on my own, and ask the owner with Approve/Reject buttons when a task seems risky.".to_string()
            }
            (true, LoopMode::Study) => format!(
                "• I hold a family study round every {}s.",
                self.config.interval_secs
            ),
        };
        format!(
            "🛡️ {} guardian online.\n\
             • Just talk to me in plain language.\n\
             {}\n\
             • /status, /pause, /resume control the loop\n\
             • /topics and /values list or add entries\n\
             • /whoami shows your Telegram ID\n\
             • /reset clears our chat memory",
            self.config.family_name, loop_line
        )
    }

    async fn status(&self) -> String {
        let state = if !self.config.background_enabled {
            "disabled"
        } else if self.state.is_paused() {
            "paused"
        } else {
            "running"
        };
        let values = self.state.values().await;
        let mut shown = values.iter().take(STATUS_VALUES).cloned().collect::<Vec<_>>().join(", ");
        if values.len() > STATUS_VALUES {
            shown.push('…');
        }
        let model = if self.completer.is_some() { self.config.model.as_str() } else { "none (dev mode)" };
        let log_file = self
            .config
            .log_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string());
        let last_round = match self.state.latest_journal_entry().await {
            Some(entry) => describe_entry(&entry),
            None => "(none yet)".to_string(),
        };

        format!(
            "Loop: {} {} | Every {}s\n\
             DM every: {} | Model: {}\n\
             Values: {}\n\
             Log file: {} ({} recent records)\n\
             Last round: {}\n\
             Rounds: {} | Pending proposals: {}",
            self.config.loop_mode.as_str(),
            state,
            self.config.interval_secs,
            self.config.dm_every_n,
            model,
            shown,
            log_file,
            self.state.journal_len().await,
            last_round,
            self.state.ticks(),
            self.state.pending_proposals().await,
        )
    }
}

/// Approved tasks are only acknowledged; no external action is taken.
fn execute_risky_task(proposal: &Proposal) -> String {
    format!("Approved risky task recorded: {}", proposal.title)
}

fn describe_entry(entry: &Entry) -> String {
    let (kind, text) = match entry {
        Entry::Study { topic, .. } => ("study", topic),
        Entry::Reflection { text } => ("reflection", text),
        Entry::Note { note } => ("note", note),
        Entry::Error { error } => ("error", error),
    };
    let preview: String = text.chars().take(STATUS_PREVIEW_CHARS).collect();
    format!("{kind}, {preview}")
}

fn bullets(items: &[String]) -> String {
    if items.is_empty() {
        return "(none)".to_string();
    }
    items
        .iter()
        .map(|i| format!("• {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}
