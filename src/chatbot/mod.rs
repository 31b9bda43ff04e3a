//! Chatbot module - family guardian chat, approvals and background rounds.

pub mod commands;
pub mod engine;
pub mod history;
pub mod journal;
pub mod prompt;
pub mod proposals;
pub mod state;
pub mod telegram;
pub mod ticker;


pub use commands::Command;
pub use engine::{ChatbotConfig, ChatbotEngine};
pub use state::AppState;
pub use telegram::TelegramClient;
pub use ticker::SystemClock;
