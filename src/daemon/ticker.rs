//! One-second driver for the timer engine.
//!
//! The ticker follows the engine's tick-loop generation. Each new generation
//! gets a fresh interval whose first tick fires one period after arming, so
//! a resumed or freshly started interval always waits a full second before
//! its first decrement.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};
use tracing::debug;

use super::timer::TimerEngine;

/// Tick period.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

enum Wake {
    Changed,
    Closed,
    Tick,
}

/// Drives `engine` until the engine's loop channel closes.
pub async fn run_ticker(engine: Arc<Mutex<TimerEngine>>, mut loop_rx: watch::Receiver<Option<u64>>) {
    let mut current = *loop_rx.borrow_and_update();
    let mut ticker = new_interval();

    loop {
        let wake = if current.is_some() {
            tokio::select! {
                changed = loop_rx.changed() => match changed {
                    Ok(()) => Wake::Changed,
                    Err(_) => Wake::Closed,
                },
                _ = ticker.tick() => Wake::Tick,
            }
        } else {
            match loop_rx.changed().await {
                Ok(()) => Wake::Changed,
                Err(_) => Wake::Closed,
            }
        };

        match wake {
            Wake::Changed => {
                let next = *loop_rx.borrow_and_update();
                if next != current {
                    debug!(?next, "Tick loop changed");
                    current = next;
                    ticker = new_interval();
                }
            }
            Wake::Tick => {
                if let Some(generation) = current {
                    engine.lock().await.tick(generation);
                }
            }
            Wake::Closed => break,
        }
    }
    debug!("Ticker stopped");
}

fn new_interval() -> Interval {
    let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}
