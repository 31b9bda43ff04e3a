//! Splits free-form reflection text into a safe note or a risky proposal.

use regex::Regex;
use std::sync::LazyLock;

const MAX_NOTE_CHARS: usize = 400;
const MAX_TITLE_CHARS: usize = 120;
const MAX_BODY_CHARS: usize = 800;
const DEFAULT_TITLE: &str = "Proposed risky task";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Can be done internally; the note is saved to the journal.
    Safe { note: String },
    /// Needs the owner's approval before anything happens.
    Risky { title: String, reason: String, plan: String },
}

pub trait Classifier: Send + Sync {
    fn classify(&self, text: &str) -> Verdict;
}

// Labels may be wrapped in markdown bold, e.g. "**Title:** ..." or "Title**:**".
static RISKY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)risky").expect("valid regex"));
static NOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)note\**[:\-]\**\s*(.*)").expect("valid regex"));
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)title\**[:\-]\**\s*(.*)").expect("valid regex"));
static REASON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)reason\**[:\-]\**\s*(.*?)(?:\**plan\**[:\-]|\z)").expect("valid regex")
});
static PLAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)plan\**[:\-]\**\s*(.*)\z").expect("valid regex"));

/// Keyword heuristic: any mention of "RISKY" makes the whole text risky.
///
/// Field extraction is best effort. Missing fields fall back to the full text
/// (note), a generic title, or empty reason/plan.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl Classifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Verdict {
        if !RISKY.is_match(text) {
            let note = capture(&NOTE, text).unwrap_or(text);
            return Verdict::Safe {
                note: clip(note, MAX_NOTE_CHARS),
            };
        }

        let title = capture(&TITLE, text)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_TITLE);
        Verdict::Risky {
            title: clip(title, MAX_TITLE_CHARS),
            reason: clip(capture(&REASON, text).unwrap_or(""), MAX_BODY_CHARS),
            plan: clip(capture(&PLAN, text).unwrap_or(""), MAX_BODY_CHARS),
        }
    }
}

fn capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Trim and cap at `max` chars, never splitting a char.
fn clip(s: &str, max: usize) -> String {
    s.trim().chars().take(max).collect::<String>().trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Verdict {
        KeywordClassifier.classify(text)
    }

    #[test]
    fn test_safe_with_note() {
        let text = "I feel calm today.\nTask: tidy the shared notes.\nClass: SAFE\nNote: remember to breathe before replying";
        assert_eq!(
            classify(text),
            Verdict::Safe { note: "remember to breathe before replying".to_string() }
        );
    }

    #[test]
    fn test_safe_without_note_uses_whole_text() {
        let text = "  A quiet reflection with nothing labelled.  ";
        assert_eq!(
            classify(text),
            Verdict::Safe { note: "A quiet reflection with nothing labelled.".to_string() }
        );
    }

    #[test]
    fn test_note_is_capped() {
        let text = format!("Note: {}", "é".repeat(1000));
        match classify(&text) {
            Verdict::Safe { note } => assert_eq!(note.chars().count(), MAX_NOTE_CHARS),
            other => panic!("expected safe, got {other:?}"),
        }
    }

    #[test]
    fn test_risky_case_insensitive() {
        assert!(matches!(classify("this one is Risky"), Verdict::Risky { .. }));
        assert!(matches!(classify("RISKY"), Verdict::Risky { .. }));
    }

    #[test]
    fn test_risky_fields() {
        let text = "Feeling hopeful.\nClassification: RISKY\nTitle: Email the school\nReason: It contacts people outside the family\nand can't be undone.\nPlan: Draft the email, then wait for approval.";
        match classify(text) {
            Verdict::Risky { title, reason, plan } => {
                assert_eq!(title, "Email the school");
                assert_eq!(reason, "It contacts people outside the family\nand can't be undone.");
                assert_eq!(plan, "Draft the email, then wait for approval.");
            }
            other => panic!("expected risky, got {other:?}"),
        }
    }

    #[test]
    fn test_risky_markdown_labels() {
        let text = "RISKY\n**Title:** Post publicly\n**Reason:** Visible to strangers\n**Plan:** Ask first";
        match classify(text) {
            Verdict::Risky { title, reason, plan } => {
                assert_eq!(title, "Post publicly");
                assert_eq!(reason, "Visible to strangers");
                assert_eq!(plan, "Ask first");
            }
            other => panic!("expected risky, got {other:?}"),
        }
    }

    #[test]
    fn test_risky_without_fields_uses_defaults() {
        match classify("Marking this RISKY just in case.") {
            Verdict::Risky { title, reason, plan } => {
                assert_eq!(title, DEFAULT_TITLE);
                assert!(reason.is_empty());
                assert!(plan.is_empty());
            }
            other => panic!("expected risky, got {other:?}"),
        }
    }

    #[test]
    fn test_reason_runs_to_end_without_plan() {
        match classify("RISKY. Reason: nobody asked for it") {
            Verdict::Risky { reason, plan, .. } => {
                assert_eq!(reason, "nobody asked for it");
                assert!(plan.is_empty());
            }
            other => panic!("expected risky, got {other:?}"),
        }
    }

    #[test]
    fn test_title_is_capped() {
        let text = format!("RISKY\nTitle: {}", "x".repeat(500));
        match classify(&text) {
            Verdict::Risky { title, .. } => assert_eq!(title.len(), MAX_TITLE_CHARS),
            other => panic!("expected risky, got {other:?}"),
        }
    }
}
