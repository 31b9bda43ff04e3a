//! Shared application state owned by the engine.
//!
//! Every piece of mutable state lives here behind a lock or an atomic, and
//! the caps (history length, journal size) are enforced by the accessors.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::chatbot::history::History;
use crate::chatbot::journal::{Entry, Journal};
use crate::chatbot::proposals::{Decision, Proposal, ProposalStore};
use crate::openai::Message;

pub struct AppState {
    history: Mutex<History>,
    proposals: Mutex<ProposalStore>,
    journal: Mutex<Journal>,
    values: Mutex<Vec<String>>,
    curriculum: Mutex<Vec<String>>,
    paused: AtomicBool,
    ticks: AtomicU64,
}

impl AppState {
    pub fn new(history_cap: usize, journal_path: Option<PathBuf>, values: Vec<String>, curriculum: Vec<String>) -> Self {
        Self {
            history: Mutex::new(History::new(history_cap)),
            proposals: Mutex::new(ProposalStore::new()),
            journal: Mutex::new(Journal::new(journal_path)),
            values: Mutex::new(values),
            curriculum: Mutex::new(curriculum),
            paused: AtomicBool::new(false),
            ticks: AtomicU64::new(0),
        }
    }

    // History

    pub async fn push_turn(&self, user_id: i64, message: Message) {
        self.history.lock().await.push(user_id, message);
    }

    pub async fn history(&self, user_id: i64) -> Vec<Message> {
        self.history.lock().await.get(user_id)
    }

    pub async fn reset_history(&self, user_id: i64) {
        self.history.lock().await.clear(user_id);
    }

    // Proposals

    pub async fn create_proposal(&self, title: String, reason: String, plan: String, now: DateTime<Utc>) -> Proposal {
        self.proposals.lock().await.create(title, reason, plan, now)
    }

    pub async fn decide(&self, payload: &str, actor: i64, owner: Option<i64>) -> Decision {
        self.proposals.lock().await.decide(payload, actor, owner)
    }

    #[cfg(test)]
    pub async fn proposal(&self, id: &str) -> Option<Proposal> {
        self.proposals.lock().await.get(id).cloned()
    }

    pub async fn pending_proposals(&self) -> usize {
        self.proposals.lock().await.len()
    }

    // Journal

    pub async fn journal(&self, ts: DateTime<Utc>, entry: Entry) {
        self.journal.lock().await.record(ts, entry).await;
    }

    pub async fn journal_len(&self) -> usize {
        self.journal.lock().await.len()
    }

    pub async fn latest_journal_entry(&self) -> Option<Entry> {
        self.journal.lock().await.recent().next().map(|r| r.entry.clone())
    }

    // Values and curriculum

    pub async fn values(&self) -> Vec<String> {
        self.values.lock().await.clone()
    }

    /// Returns false if the value was already present.
    pub async fn add_value(&self, value: String) -> bool {
        let mut values = self.values.lock().await;
        if values.contains(&value) {
            return false;
        }
        values.push(value);
        true
    }

    pub async fn curriculum(&self) -> Vec<String> {
        self.curriculum.lock().await.clone()
    }

    pub async fn add_topic(&self, topic: String) {
        self.curriculum.lock().await.push(topic);
    }

    /// Topic for a moment in time: `(now_ms / interval_ms) mod len`.
    pub async fn topic_at(&self, now: DateTime<Utc>, interval_secs: u64) -> Option<String> {
        let curriculum = self.curriculum.lock().await;
        pick_topic(&curriculum, now, interval_secs).map(str::to_string)
    }

    // Loop control

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    /// Count a completed round and return the new total.
    pub fn count_tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }
}

pub fn pick_topic(curriculum: &[String], now: DateTime<Utc>, interval_secs: u64) -> Option<&str> {
    if curriculum.is_empty() {
        return None;
    }
    let interval_ms = i64::try_from(interval_secs.max(1).saturating_mul(1000)).unwrap_or(i64::MAX);
    let slot = now.timestamp_millis().div_euclid(interval_ms);
    let idx = slot.rem_euclid(curriculum.len() as i64) as usize;
    curriculum.get(idx).map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics() -> Vec<String> {
        vec!["a".into(), "b".into(), "c".into()]
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_pick_topic_rotates_per_interval() {
        let topics = topics();
        assert_eq!(pick_topic(&topics, at(0), 60), Some("a"));
        assert_eq!(pick_topic(&topics, at(59), 60), Some("a"));
        assert_eq!(pick_topic(&topics, at(60), 60), Some("b"));
        assert_eq!(pick_topic(&topics, at(120), 60), Some("c"));
        assert_eq!(pick_topic(&topics, at(180), 60), Some("a"));
    }

    #[test]
    fn test_pick_topic_huge_interval() {
        let topics = topics();
        assert_eq!(pick_topic(&topics, at(1_700_000_000), u64::MAX), Some("a"));
    }

    #[test]
    fn test_pick_topic_empty() {
        assert_eq!(pick_topic(&[], at(0), 60), None);
    }

    #[tokio::test]
    async fn test_add_value_ignores_duplicates() {
        let state = AppState::new(8, None, vec!["love".into()], vec![]);
        assert!(!state.add_value("love".into()).await);
        assert!(state.add_value("patience".into()).await);
        assert_eq!(state.values().await, vec!["love", "patience"]);
    }

    #[tokio::test]
    async fn test_topics_may_repeat() {
        let state = AppState::new(8, None, vec![], vec!["a".into()]);
        state.add_topic("a".into()).await;
        assert_eq!(state.curriculum().await.len(), 2);
    }

    #[tokio::test]
    async fn test_pause_and_tick_counter() {
        let state = AppState::new(8, None, vec![], vec![]);
        assert!(!state.is_paused());
        state.set_paused(true);
        assert!(state.is_paused());

        assert_eq!(state.count_tick(), 1);
        assert_eq!(state.count_tick(), 2);
        assert_eq!(state.ticks(), 2);
    }
}
