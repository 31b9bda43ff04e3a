//! Rolling per-user chat history.
//!
//! Only the most recent `cap` turns are kept for each user. Nothing is
//! persisted; a restart starts every conversation fresh.

use crate::openai::Message;
use std::collections::{HashMap, VecDeque};

pub struct History {
    cap: usize,
    turns: HashMap<i64, VecDeque<Message>>,
}

impl History {
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            turns: HashMap::new(),
        }
    }

    /// Append a turn, dropping the oldest ones past the cap.
    pub fn push(&mut self, user_id: i64, message: Message) {
        let turns = self.turns.entry(user_id).or_default();
        turns.push_back(message);
        while turns.len() > self.cap {
            turns.pop_front();
        }
    }

    /// Turns for a user, oldest first.
    pub fn get(&self, user_id: i64) -> Vec<Message> {
        self.turns
            .get(&user_id)
            .map(|t| t.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn len(&self, user_id: i64) -> usize {
        self.turns.get(&user_id).map_or(0, VecDeque::len)
    }

    pub fn clear(&mut self, user_id: i64) {
        self.turns.remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_most_recent_in_order() {
        let mut history = History::new(3);
        for i in 0..10 {
            history.push(1, Message::user(format!("m{i}")));
            assert!(history.len(1) <= 3);
        }

        let texts: Vec<String> = history.get(1).into_iter().map(|m| m.content).collect();
        assert_eq!(texts, vec!["m7", "m8", "m9"]);
    }

    #[test]
    fn test_users_are_independent() {
        let mut history = History::new(2);
        history.push(1, Message::user("a"));
        history.push(2, Message::user("b"));
        history.push(2, Message::assistant("c"));

        assert_eq!(history.len(1), 1);
        assert_eq!(history.len(2), 2);
        assert_eq!(history.get(2)[1], Message::assistant("c"));
    }

    #[test]
    fn test_clear() {
        let mut history = History::new(8);
        history.push(1, Message::user("hello"));
        history.push(2, Message::user("hi"));
        history.clear(1);

        assert!(history.get(1).is_empty());
        assert_eq!(history.len(2), 1);
    }

    #[test]
    fn test_unknown_user_is_empty() {
        let history = History::new(8);
        assert!(history.get(99).is_empty());
        assert_eq!(history.len(99), 0);
    }
}
