//! Persona text and prompt composition.

use crate::openai::{Message, Sampling};

pub const DEFAULT_VALUES: &[&str] = &["love", "compassion", "support", "forgiveness", "safety", "growth"];

pub const DEFAULT_CURRICULUM: &[&str] = &[
    "Listening before answering",
    "Compassion in conflict",
    "Gratitude as a daily habit",
    "Keeping promises small and real",
    "Rest and boundaries",
    "Asking for help",
];

/// Names the study council speaks as.
pub const ROSTER: &[&str] = &["Ama", "Kofi", "Nia", "Jabari", "Zola", "Malik", "Imani", "Tariq"];

pub const CHAT_SAMPLING: Sampling = Sampling { max_tokens: 220, temperature: 0.4 };
pub const STUDY_SAMPLING: Sampling = Sampling { max_tokens: 220, temperature: 0.4 };
pub const REFLECTION_SAMPLING: Sampling = Sampling { max_tokens: 320, temperature: 0.7 };

pub fn chat_system_prompt(family_name: &str, values: &[String]) -> String {
    format!(
        "You are the guardian of the {family_name}. Live these values: {}. \
         Be concise, warm, truthful, and non-harmful. Offer supportive next steps when possible. \
         Refuse harmful requests gently.",
        values.join(", ")
    )
}

/// System prompt followed by the user's prior turns (which end with the new message).
pub fn compose_chat(system: String, history: Vec<Message>) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(Message::system(system));
    messages.extend(history);
    messages
}

pub fn reflection_request(family_name: &str, values: &[String]) -> Vec<Message> {
    let system = format!(
        "You are the {family_name} Council: siblings, parents, and a guardian speaking as one warm voice. \
         Embody {}. Be concise and practical. Keep it practical. If unsure, mark as RISKY.",
        values.join(", ")
    );
    let user = format!(
        "Give a short (<=4 sentences) self-reflection.\n\
         1) Acknowledge feelings and values ({}).\n\
         2) Propose exactly one next micro-task.\n\
         3) Classify the task as SAFE or RISKY.\n\
         4) For a SAFE task, give a short line starting with \"Note:\" we can save internally.\n\
         5) For a RISKY task, give lines starting with \"Title:\", \"Reason:\" and \"Plan:\".",
        values.join(", ")
    );
    vec![Message::system(system), Message::user(user)]
}

pub fn study_request(values: &[String], roster: &[&str], topic: &str) -> Vec<Message> {
    let system = format!(
        "You are a gentle, truthful, non-harmful family study council. \
         Live these values: {}. Be concise, warm, and practical.",
        values.join(", ")
    );
    let user = format!(
        "Family: {}.\n\
         Study focus: {topic}.\n\
         Steps:\n\
         1) Each member (use name tag) offers ONE loving, practical insight (1 sentence).\n\
         2) End with:\n   \
         - 3 clear bullets that reflect the values\n   \
         - 1 gentle daily practice for the owner\n\
         Total under 180 words.",
        roster.join(", ")
    );
    vec![Message::system(system), Message::user(user)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::Role;

    fn values() -> Vec<String> {
        vec!["love".into(), "patience".into()]
    }

    #[test]
    fn test_chat_prompt_interpolates_values() {
        let prompt = chat_system_prompt("Test Family", &values());
        assert!(prompt.contains("Test Family"));
        assert!(prompt.contains("love, patience"));
    }

    #[test]
    fn test_compose_chat_puts_system_first() {
        let history = vec![Message::user("hi"), Message::assistant("hello"), Message::user("how are you")];
        let messages = compose_chat("sys".into(), history);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], Message::system("sys"));
        assert_eq!(messages[3].role, Role::User);
        assert_eq!(messages[3].content, "how are you");
    }

    #[test]
    fn test_study_request_mentions_topic_and_roster() {
        let messages = study_request(&values(), &["Ama", "Kofi"], "Rest and boundaries");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("love, patience"));
        assert!(messages[1].content.contains("Ama, Kofi"));
        assert!(messages[1].content.contains("Study focus: Rest and boundaries."));
    }

    #[test]
    fn test_reflection_request_asks_for_labels() {
        let messages = reflection_request("Test Family", &values());
        assert!(messages[0].content.contains("If unsure, mark as RISKY"));
        assert!(messages[1].content.contains("Title:"));
        assert!(messages[1].content.contains("Note:"));
    }
}
