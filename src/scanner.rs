// Periodic sweep that finds events whose raffle should start in the
// current window and hands each to the orchestrator in its own task. The
// scanner is constructed once by the composition root and started/stopped
// explicitly; there is no hidden global init flag.

use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::config::RaffleConfig;
use crate::error::RaffleError;
use crate::orchestrator::RaffleOrchestrator;
use crate::state::RafflePhase;
use crate::store::RaffleStore;

pub struct RaffleScanner {
    store: Arc<dyn RaffleStore>,
    orchestrator: Arc<RaffleOrchestrator>,
    interval: Duration,
    /// Event ids with a spawned run still going. An event stays
    /// NOT_STARTED until its start time arrives, so the phase guard alone
    /// cannot stop a second sweep of the same window from launching it
    /// again; this set can.
    in_flight: Arc<Mutex<HashSet<String>>>,
}

/// Running scanner; dropping it or calling [`ScannerHandle::stop`] ends
/// the sweep loop. In-flight raffle runs are independent tasks and keep
/// going.
pub struct ScannerHandle {
    handle: JoinHandle<()>,
}

impl ScannerHandle {
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for ScannerHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl RaffleScanner {
    pub fn new(
        store: Arc<dyn RaffleStore>,
        orchestrator: Arc<RaffleOrchestrator>,
        config: RaffleConfig,
    ) -> Self {
        Self {
            store,
            orchestrator,
            interval: config.scan_interval,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Start the periodic sweep.
    pub fn start(self: Arc<Self>) -> ScannerHandle {
        let scanner = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scanner.interval);
            // A stalled loop must not replay the missed ticks back to back
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let window_start = start_of_minute(Utc::now());
                let window_end = window_start + ChronoDuration::minutes(1);
                if let Err(err) = scanner.sweep_window(window_start, window_end).await {
                    error!(%err, "raffle sweep failed");
                }
            }
        });
        ScannerHandle { handle }
    }

    /// One sweep over `[window_start, window_end)`. Every due event gets
    /// its own spawned orchestrator run; one run's failure never blocks
    /// the others, and an event already past NOT_STARTED or with a run
    /// still in flight is never re-launched.
    pub async fn sweep_window(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<(), RaffleError> {
        let due = self.store.find_due_events(window_start, window_end)?;
        for event in due {
            if event.raffle_status != RafflePhase::NotStarted {
                continue;
            }
            if !self
                .in_flight
                .lock()
                .map_err(|e| RaffleError::Store(e.to_string()))?
                .insert(event.id.clone())
            {
                continue;
            }
            info!(event_id = %event.id, "launching raffle run");
            let orchestrator = Arc::clone(&self.orchestrator);
            let in_flight = Arc::clone(&self.in_flight);
            tokio::spawn(async move {
                // The start may be slightly in the future within this
                // window; the orchestrator waits out the remaining delta.
                if let Err(err) = orchestrator.run_raffle(&event.id).await {
                    error!(event_id = %event.id, %err, "raffle run aborted");
                }
                if let Ok(mut set) = in_flight.lock() {
                    set.remove(&event.id);
                }
            });
        }
        Ok(())
    }
}

fn start_of_minute(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}
