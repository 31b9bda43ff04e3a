//! Journal of background rounds.
//!
//! Records go to the front of an in-memory ring buffer and, when a path is
//! configured, are appended to a newline-delimited JSON file. The file is
//! never read back. Write failures are logged and otherwise ignored.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::warn;

pub const JOURNAL_CAPACITY: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Entry {
    Study { topic: String, summary: String },
    Reflection { text: String },
    Note { note: String },
    Error { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub entry: Entry,
}

pub struct Journal {
    path: Option<PathBuf>,
    capacity: usize,
    recent: VecDeque<Record>,
}

impl Journal {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self::with_capacity(path, JOURNAL_CAPACITY)
    }

    pub fn with_capacity(path: Option<PathBuf>, capacity: usize) -> Self {
        Self {
            path,
            capacity,
            recent: VecDeque::new(),
        }
    }

    pub async fn record(&mut self, ts: DateTime<Utc>, entry: Entry) {
        let record = Record { ts, entry };
        if let Some(ref path) = self.path
            && let Err(e) = append_line(path, &record).await
        {
            warn!("Failed to append to journal {}: {}", path.display(), e);
        }

        self.recent.push_front(record);
        self.recent.truncate(self.capacity);
    }

    /// Newest first.
    pub fn recent(&self) -> impl Iterator<Item = &Record> {
        self.recent.iter()
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }
}

async fn append_line(path: &Path, record: &Record) -> Result<(), String> {
    let mut line = serde_json::to_string(record).map_err(|e| format!("Failed to serialize: {e}"))?;
    line.push('\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| format!("Failed to open: {e}"))?;
    file.write_all(line.as_bytes())
        .await
        .map_err(|e| format!("Failed to write: {e}"))?;
    file.flush().await.map_err(|e| format!("Failed to flush: {e}"))
}
