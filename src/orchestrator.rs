// Drives one event's raffle through its forward-only phases:
// NOT_STARTED -> REGISTRATION_OPEN -> SIMULATING -> COMPLETED.
// Each phase write is persisted before the matching broadcast fires, so a
// client reacting to the broadcast and re-querying always sees the new
// phase. The long waits are timer suspensions; concurrent runs for other
// events are unaffected.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::broadcast::{raffle_channel, Broadcaster};
use crate::config::{RaffleConfig, SimulationConfig};
use crate::error::RaffleError;
use crate::mailer::{Mailer, MessageData, Recipient, TemplateKind};
use crate::physics::simulate;
use crate::seed::{derive_seed, SeedEntry};
use crate::state::{
    EventPatch, Participant, RafflePhase, SignupFilter, SignupPatch, SignupRecord, SignupStatus,
};
use crate::store::RaffleStore;

pub struct RaffleOrchestrator {
    store: Arc<dyn RaffleStore>,
    broadcaster: Arc<dyn Broadcaster>,
    mailer: Arc<dyn Mailer>,
    sim_config: SimulationConfig,
    raffle_config: RaffleConfig,
}

impl RaffleOrchestrator {
    pub fn new(
        store: Arc<dyn RaffleStore>,
        broadcaster: Arc<dyn Broadcaster>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self::with_configs(
            store,
            broadcaster,
            mailer,
            SimulationConfig::default(),
            RaffleConfig::default(),
        )
    }

    pub fn with_configs(
        store: Arc<dyn RaffleStore>,
        broadcaster: Arc<dyn Broadcaster>,
        mailer: Arc<dyn Mailer>,
        sim_config: SimulationConfig,
        raffle_config: RaffleConfig,
    ) -> Self {
        Self {
            store,
            broadcaster,
            mailer,
            sim_config,
            raffle_config,
        }
    }

    /// Run one event's raffle end to end. Long-running: suspends until the
    /// registration window opens, again until it closes, and once more for
    /// the reveal delay. Store and configuration errors are fatal to this
    /// run; callers log them with the event id, nothing retries.
    pub async fn run_raffle(&self, event_id: &str) -> Result<(), RaffleError> {
        let event = self
            .store
            .find_event(event_id)?
            .ok_or_else(|| RaffleError::EventNotFound(event_id.to_string()))?;

        let (start, end) = match (event.raffle_start_time, event.raffle_end_time) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(RaffleError::ScheduleMissing(event_id.to_string())),
        };
        if event.raffle_status != RafflePhase::NotStarted {
            return Err(RaffleError::AlreadyStarted(event_id.to_string()));
        }

        wait_until(start).await;
        self.advance_phase(event_id, RafflePhase::RegistrationOpen)?;

        wait_until(end).await;
        self.advance_phase(event_id, RafflePhase::Simulating)?;

        // Re-read the field now that the window is closed; only declared
        // intents count. Sorted so the simulation input order never depends
        // on store iteration order.
        let mut signups = self
            .store
            .find_signups(&event.quota_id, SignupFilter::WithIntent)?;
        signups.sort_by(|a, b| {
            a.registration_intent
                .cmp(&b.registration_intent)
                .then_with(|| a.id.cmp(&b.id))
        });

        let entries: Vec<SeedEntry> = signups
            .iter()
            .map(SeedEntry::try_from)
            .collect::<Result<_, _>>()?;
        let seed = derive_seed(&entries);

        let participants: Vec<Participant> = signups
            .iter()
            .map(|s| Participant {
                id: s.id.clone(),
                name: s.display_name.clone(),
            })
            .collect();
        let canvas_width = self
            .sim_config
            .default_canvas_width
            .max(participants.len() as f64 * self.sim_config.peg_spacing);

        info!(
            event_id,
            participants = participants.len(),
            %seed,
            "running drop simulation"
        );
        let outcome = simulate(&participants, &seed, canvas_width, &self.sim_config);

        // Let clients play the drop animation against the already-decided
        // outcome before results are revealed.
        tokio::time::sleep(self.raffle_config.reveal_delay).await;

        let completed_at = Utc::now();
        for final_position in &outcome.final_positions {
            let signup = signups
                .iter()
                .find(|s| s.id == final_position.id)
                .ok_or_else(|| {
                    RaffleError::Store(format!(
                        "simulation returned unknown signup `{}`",
                        final_position.id
                    ))
                })?;
            self.apply_outcome(&event.name, signup, final_position.position, event.quota_capacity, completed_at)?;
        }

        self.advance_phase(event_id, RafflePhase::Completed)?;
        Ok(())
    }

    /// Persist the phase, then broadcast it.
    fn advance_phase(&self, event_id: &str, phase: RafflePhase) -> Result<(), RaffleError> {
        self.store.update_event(
            event_id,
            EventPatch {
                raffle_status: Some(phase),
            },
        )?;
        self.broadcaster.publish(
            &raffle_channel(event_id),
            "status-update",
            json!({ "status": phase.as_str() }),
        );
        info!(event_id, phase = phase.as_str(), "raffle phase advanced");
        Ok(())
    }

    /// Write one signup's outcome and send its message. A delivery failure
    /// is logged and swallowed so the remaining participants still get
    /// theirs; a store failure is fatal.
    fn apply_outcome(
        &self,
        event_name: &str,
        signup: &SignupRecord,
        rank: usize,
        capacity: Option<usize>,
        completed_at: DateTime<Utc>,
    ) -> Result<(), RaffleError> {
        let status = outcome_for(rank, capacity);
        // Rank-offset timestamp keeps later listings deterministically
        // ordered even when outcomes were written in the same instant.
        let stamp = completed_at + ChronoDuration::milliseconds(rank as i64);
        self.store.update_signup(
            &signup.id,
            SignupPatch {
                status: Some(status),
                confirmed_at: Some(stamp),
            },
        )?;

        let kind = match status {
            SignupStatus::Confirmed => TemplateKind::EventSignup,
            _ => TemplateKind::EventQueue,
        };
        let data = MessageData {
            event_name: event_name.to_string(),
            edit_url: signup.edit_url.clone(),
        };
        let to = Recipient {
            display_name: signup.display_name.clone(),
            address: signup.email.clone(),
        };
        if let Err(err) = self.mailer.render_and_send(kind, &data, &to) {
            warn!(signup_id = %signup.id, address = %to.address, %err, "outcome message failed");
        }
        Ok(())
    }
}

/// Confirmed when the rank fits the capacity; an unbounded quota confirms
/// every rank.
pub(crate) fn outcome_for(rank: usize, capacity: Option<usize>) -> SignupStatus {
    match capacity {
        Some(cap) if rank >= cap => SignupStatus::Rejected,
        _ => SignupStatus::Confirmed,
    }
}

/// Suspend until `deadline`; returns immediately if it already passed.
pub(crate) async fn wait_until(deadline: DateTime<Utc>) {
    if let Ok(remaining) = (deadline - Utc::now()).to_std() {
        tokio::time::sleep(remaining).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_below_capacity_confirms() {
        assert_eq!(outcome_for(0, Some(3)), SignupStatus::Confirmed);
        assert_eq!(outcome_for(2, Some(3)), SignupStatus::Confirmed);
        assert_eq!(outcome_for(3, Some(3)), SignupStatus::Rejected);
        assert_eq!(outcome_for(10, Some(3)), SignupStatus::Rejected);
    }

    #[test]
    fn unbounded_capacity_confirms_everything() {
        for rank in [0usize, 5, 5000] {
            assert_eq!(outcome_for(rank, None), SignupStatus::Confirmed);
        }
    }

    #[tokio::test]
    async fn past_deadline_does_not_wait() {
        let before = std::time::Instant::now();
        wait_until(Utc::now() - ChronoDuration::seconds(5)).await;
        assert!(before.elapsed() < std::time::Duration::from_millis(100));
    }
}
