use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use teloxide::types::UserId;

const DEFAULT_FAMILY_NAME: &str = "Shakyla Family";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LOG_FILE: &str = "family_log.jsonl";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_HISTORY_CAP: usize = 8;

/// Ticks closer together than this are clamped up to it.
pub const MIN_INTERVAL_SECS: u64 = 30;

/// One week. Longer intervals are rejected.
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    Missing(&'static str),
    /// A variable is set but can't be parsed.
    Invalid { var: &'static str, value: String, reason: String },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(var) => write!(f, "missing required environment variable {}", var),
            Self::Invalid { var, value, reason } => {
                write!(f, "invalid value '{}' for {}: {}", value, var, reason)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// What the background loop does on each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Self-reflection with owner approval for risky tasks.
    Reflection,
    /// Curriculum study rounds written to the journal.
    Study,
}

impl LoopMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopMode::Reflection => "reflection",
            LoopMode::Study => "study",
        }
    }

    fn default_interval_secs(&self) -> u64 {
        match self {
            LoopMode::Reflection => 60 * 60,
            LoopMode::Study => 5 * 60,
        }
    }
}

impl FromStr for LoopMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reflection" | "reflect" => Ok(LoopMode::Reflection),
            "study" => Ok(LoopMode::Study),
            other => Err(format!("unknown loop mode '{}' (expected reflection or study)", other)),
        }
    }
}

pub struct Config {
    pub telegram_bot_token: String,
    /// None puts the bot in dev mode: chat is echoed and no model calls are made.
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub model: String,
    pub owner_id: Option<UserId>,
    pub family_name: String,
    pub loop_mode: LoopMode,
    pub background_enabled: bool,
    /// Seconds between ticks, already clamped to `MIN_INTERVAL_SECS`.
    pub interval_secs: u64,
    /// DM the owner every N study rounds (0 = never).
    pub dm_every_n: u64,
    /// Append-only journal of background rounds.
    pub log_file: PathBuf,
    /// Directory for tracing log files.
    pub data_dir: PathBuf,
    /// Port of the liveness endpoint.
    pub port: u16,
    pub history_cap: usize,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let telegram_bot_token = get("TELEGRAM_TOKEN")
            .or_else(|| get("BOT_TOKEN"))
            .ok_or(ConfigError::Missing("TELEGRAM_TOKEN"))?;
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "TELEGRAM_TOKEN appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
            ));
        }

        let owner_id = match get("OWNER_ID").or_else(|| get("TELEGRAM_OWNER_ID")) {
            Some(raw) => Some(UserId(parse_var("OWNER_ID", &raw)?)),
            None => None,
        };

        let loop_mode = match get("LOOP_MODE") {
            Some(raw) => raw.parse::<LoopMode>().map_err(|reason| ConfigError::Invalid {
                var: "LOOP_MODE",
                value: raw,
                reason,
            })?,
            None => LoopMode::Reflection,
        };

        let background_enabled = match get("ENABLE_BACKGROUND") {
            Some(raw) => parse_bool("ENABLE_BACKGROUND", &raw)?,
            None => true,
        };

        if background_enabled && loop_mode == LoopMode::Reflection && owner_id.is_none() {
            return Err(ConfigError::Validation(
                "OWNER_ID is required when the reflection loop is enabled (risky tasks need an approver)".into(),
            ));
        }

        let interval_secs = match get("INTERVAL_SECS") {
            Some(raw) => {
                let secs: u64 = parse_var("INTERVAL_SECS", &raw)?;
                if secs > MAX_INTERVAL_SECS {
                    return Err(ConfigError::Invalid {
                        var: "INTERVAL_SECS",
                        value: raw,
                        reason: format!("must be at most {MAX_INTERVAL_SECS} (one week)"),
                    });
                }
                secs
            }
            None => loop_mode.default_interval_secs(),
        }
        .max(MIN_INTERVAL_SECS);

        let dm_every_n = match get("DM_EVERY_N") {
            Some(raw) => parse_var("DM_EVERY_N", &raw)?,
            None => 0,
        };

        let port = match get("PORT") {
            Some(raw) => parse_var("PORT", &raw)?,
            None => DEFAULT_PORT,
        };

        let history_cap = match get("HISTORY_CAP") {
            Some(raw) => parse_var("HISTORY_CAP", &raw)?,
            None => DEFAULT_HISTORY_CAP,
        };
        if history_cap == 0 {
            return Err(ConfigError::Validation("HISTORY_CAP must be at least 1".into()));
        }

        Ok(Self {
            telegram_bot_token,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: get("MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            owner_id,
            family_name: get("FAMILY_NAME").unwrap_or_else(|| DEFAULT_FAMILY_NAME.to_string()),
            loop_mode,
            background_enabled,
            interval_secs,
            dm_every_n,
            log_file: PathBuf::from(get("LOG_FILE").unwrap_or_else(|| DEFAULT_LOG_FILE.to_string())),
            data_dir: PathBuf::from(get("DATA_DIR").unwrap_or_else(|| ".".to_string())),
            port,
            history_cap,
        })
    }

    pub fn dev_mode(&self) -> bool {
        self.openai_api_key.is_none()
    }
}

fn parse_var<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
            reason: "expected true or false".into(),
        }),
    }
}
