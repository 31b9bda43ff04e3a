//! Background loop that runs one engine round per interval.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::chatbot::engine::ChatbotEngine;

/// Wall-clock source, swappable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Spawn the loop. The first round runs one full `period` after start.
///
/// Rounds are awaited inline, so a slow round delays the next one instead of
/// overlapping it. Cancelling `shutdown` stops the loop between rounds; it
/// does not abort a round already waiting on the model.
pub fn spawn(engine: Arc<ChatbotEngine>, period: Duration, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(start) = Instant::now().checked_add(period) else {
            error!("Background loop period {}s is out of range, loop not started", period.as_secs());
            return;
        };
        info!("🔁 Background loop running every {}s", period.as_secs());

        let mut interval = interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    engine.tick().await;
                }
            }
        }

        info!("Background loop stopped");
    })
}
