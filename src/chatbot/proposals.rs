//! Pending risky tasks awaiting the owner's decision.
//!
//! A proposal is either pending (in the store) or gone. Approve and reject
//! both remove it, so whichever decision lands first wins and every later
//! press on the same card sees "already handled".

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use std::collections::HashMap;

const ID_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub id: String,
    pub title: String,
    pub reason: String,
    pub plan: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Approve,
    Reject,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Approve => "approve",
            Action::Reject => "reject",
        }
    }

    /// Callback payload for this action on a proposal: `approve:{id}`.
    pub fn payload(&self, id: &str) -> String {
        format!("{}:{}", self.as_str(), id)
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(Action::Approve),
            "reject" => Some(Action::Reject),
            _ => None,
        }
    }
}

/// Outcome of a button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approved(Proposal),
    Rejected(Proposal),
    /// No pending proposal under that id (decided earlier, never existed, or a malformed payload).
    AlreadyHandled,
    /// Someone other than the owner pressed the button. Nothing changed.
    Unauthorized,
    /// Known proposal, unrecognized action. Nothing changed.
    UnknownAction,
}

#[derive(Default)]
pub struct ProposalStore {
    pending: HashMap<String, Proposal>,
}

impl ProposalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new pending proposal under a fresh random id.
    pub fn create(&mut self, title: String, reason: String, plan: String, now: DateTime<Utc>) -> Proposal {
        let proposal = Proposal {
            id: new_id(),
            title,
            reason,
            plan,
            created_at: now,
        };
        self.pending.insert(proposal.id.clone(), proposal.clone());
        proposal
    }

    #[cfg(test)]
    pub fn get(&self, id: &str) -> Option<&Proposal> {
        self.pending.get(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Apply a callback payload (`action:id`) pressed by `actor`.
    ///
    /// Checks run in order: the proposal must exist, the actor must be the
    /// owner, the action must be known. Only the last step mutates.
    pub fn decide(&mut self, payload: &str, actor: i64, owner: Option<i64>) -> Decision {
        let (action, id) = payload.split_once(':').unwrap_or((payload, ""));

        if !self.pending.contains_key(id) {
            return Decision::AlreadyHandled;
        }
        if owner != Some(actor) {
            return Decision::Unauthorized;
        }
        let Some(action) = Action::parse(action) else {
            return Decision::UnknownAction;
        };

        match self.pending.remove(id) {
            Some(p) if action == Action::Approve => Decision::Approved(p),
            Some(p) => Decision::Rejected(p),
            None => Decision::AlreadyHandled,
        }
    }
}

fn new_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: i64 = 42;

    fn store_with_one() -> (ProposalStore, String) {
        let mut store = ProposalStore::new();
        let p = store.create(
            "Call grandma".into(),
            "Involves someone outside".into(),
            "Ask first".into(),
            Utc::now(),
        );
        (store, p.id)
    }

    #[test]
    fn test_id_shape() {
        let (store, id) = store_with_one();
        assert_eq!(id.len(), ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert!(store.get(&id).is_some());
    }

    #[test]
    fn test_unknown_id_is_already_handled() {
        let (mut store, _) = store_with_one();
        for payload in ["approve:nope", "reject:", "garbage", "", ":"] {
            assert_eq!(store.decide(payload, OWNER, Some(OWNER)), Decision::AlreadyHandled);
        }
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_non_owner_cannot_decide() {
        let (mut store, id) = store_with_one();
        let before = store.get(&id).cloned();

        assert_eq!(store.decide(&Action::Approve.payload(&id), 7, Some(OWNER)), Decision::Unauthorized);
        assert_eq!(store.decide(&Action::Reject.payload(&id), 7, Some(OWNER)), Decision::Unauthorized);
        assert_eq!(store.get(&id).cloned(), before);
    }

    #[test]
    fn test_no_owner_means_nobody_decides() {
        let (mut store, id) = store_with_one();
        assert_eq!(store.decide(&Action::Approve.payload(&id), OWNER, None), Decision::Unauthorized);
        assert!(store.get(&id).is_some());
    }

    #[test]
    fn test_approve_consumes_once() {
        let (mut store, id) = store_with_one();
        let payload = Action::Approve.payload(&id);

        match store.decide(&payload, OWNER, Some(OWNER)) {
            Decision::Approved(p) => assert_eq!(p.title, "Call grandma"),
            other => panic!("expected approval, got {other:?}"),
        }
        assert!(store.get(&id).is_none());
        assert_eq!(store.decide(&payload, OWNER, Some(OWNER)), Decision::AlreadyHandled);
        assert_eq!(store.decide(&Action::Reject.payload(&id), OWNER, Some(OWNER)), Decision::AlreadyHandled);
    }

    #[test]
    fn test_reject_removes() {
        let (mut store, id) = store_with_one();
        assert!(matches!(
            store.decide(&Action::Reject.payload(&id), OWNER, Some(OWNER)),
            Decision::Rejected(_)
        ));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_unknown_action_keeps_pending() {
        let (mut store, id) = store_with_one();
        assert_eq!(store.decide(&format!("maybe:{id}"), OWNER, Some(OWNER)), Decision::UnknownAction);
        assert!(store.get(&id).is_some());
    }
}
