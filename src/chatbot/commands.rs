//! Slash commands.

use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Debug, Clone, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "greeting and overview.")]
    Start,
    #[command(description = "show this list.")]
    Help,
    #[command(description = "your Telegram ID.")]
    Whoami,
    #[command(description = "clear our chat memory.")]
    Reset,
    #[command(description = "background loop state.")]
    Status,
    #[command(description = "pause the background loop.")]
    Pause,
    #[command(description = "resume the background loop.")]
    Resume,
    #[command(description = "list study topics, or /topics add <topic>.")]
    Topics(String),
    #[command(description = "list values, or /values add <value>.")]
    Values(String),
    #[command(description = "family name and core values.")]
    Family,
}

/// What a `/topics` or `/values` argument asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListArg<'a> {
    Show,
    Add(&'a str),
    /// `add` with nothing after it.
    AddMissing,
    Other,
}

pub fn parse_list_arg(arg: &str) -> ListArg<'_> {
    let arg = arg.trim();
    if arg.is_empty() {
        return ListArg::Show;
    }
    if arg.eq_ignore_ascii_case("add") {
        return ListArg::AddMissing;
    }
    match arg.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("add ") => ListArg::Add(arg[4..].trim()),
        _ => ListArg::Other,
    }
}
