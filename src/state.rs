use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// Lifecycle phase of an event's raffle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RafflePhase {
    /// Raffle is configured but the registration window has not opened
    #[serde(rename = "NOT_STARTED")]
    NotStarted,
    /// Registration window is open for intent declarations
    #[serde(rename = "REGISTRATION_OPEN")]
    RegistrationOpen,
    /// Window closed, drop simulation and reveal in progress
    #[serde(rename = "SIMULATING")]
    Simulating,
    /// Outcomes applied and participants notified
    #[serde(rename = "COMPLETED")]
    Completed,
}

impl RafflePhase {
    /// Wire-stable phase name as broadcast to clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            RafflePhase::NotStarted => "NOT_STARTED",
            RafflePhase::RegistrationOpen => "REGISTRATION_OPEN",
            RafflePhase::Simulating => "SIMULATING",
            RafflePhase::Completed => "COMPLETED",
        }
    }
}

impl TryFrom<u8> for RafflePhase {
    type Error = &'static str;

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0 => Ok(RafflePhase::NotStarted),
            1 => Ok(RafflePhase::RegistrationOpen),
            2 => Ok(RafflePhase::Simulating),
            3 => Ok(RafflePhase::Completed),
            _ => Err("Invalid raffle phase"),
        }
    }
}

impl From<RafflePhase> for u8 {
    fn from(phase: RafflePhase) -> Self {
        match phase {
            RafflePhase::NotStarted => 0,
            RafflePhase::RegistrationOpen => 1,
            RafflePhase::Simulating => 2,
            RafflePhase::Completed => 3,
        }
    }
}

/// Status of a single signup record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignupStatus {
    /// Awaiting raffle outcome
    #[serde(rename = "PENDING")]
    Pending,
    /// Won a slot within the quota capacity
    #[serde(rename = "CONFIRMED")]
    Confirmed,
    /// Ranked past the quota capacity
    #[serde(rename = "REJECTED")]
    Rejected,
}

/// One contestant in a simulation run, correlated back to a signup by id
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Opaque identity, matches the signup record id
    pub id: String,
    /// Display name carried through to the final ranking
    pub name: String,
}

/// Persisted event record carrying the raffle configuration and phase
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event identity
    pub id: String,
    /// Human-readable event name, used in outcome messages
    pub name: String,
    /// Whether a raffle gates this event's quota
    pub raffle_enabled: bool,
    /// Instant the registration window opens
    pub raffle_start_time: Option<DateTime<Utc>>,
    /// Instant the registration window closes
    pub raffle_end_time: Option<DateTime<Utc>>,
    /// Current lifecycle phase, mutated only by the orchestrator
    pub raffle_status: RafflePhase,
    /// Quota bucket the raffle decides
    pub quota_id: String,
    /// Capacity of the quota; `None` means unbounded
    pub quota_capacity: Option<usize>,
}

/// Persisted signup record for one participant
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignupRecord {
    /// Signup identity
    pub id: String,
    /// Quota bucket this signup competes for
    pub quota_id: String,
    /// Recipient address for outcome messages
    pub email: String,
    /// Name shown in messages and rankings
    pub display_name: String,
    /// Outcome status, PENDING until the raffle completes
    pub status: SignupStatus,
    /// Instant the participant declared intent to enter; `None` until declared
    pub registration_intent: Option<DateTime<Utc>>,
    /// Synthetic rank-offset timestamp written when the raffle completes
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Link to the participant's personal signup-management page
    pub edit_url: String,
}

/// Partial update applied to an event record
#[derive(Clone, Debug, Default)]
pub struct EventPatch {
    pub raffle_status: Option<RafflePhase>,
}

/// Partial update applied to a signup record
#[derive(Clone, Debug, Default)]
pub struct SignupPatch {
    pub status: Option<SignupStatus>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Signup query filter used when re-reading the participant field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignupFilter {
    /// Every signup in the quota
    All,
    /// Only signups that declared a registration intent
    WithIntent,
}

/// Pose of one ball in one frame; `angle` is cosmetic only
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BallPose {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
}

/// One simulated tick sample, positions in participant order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationFrame {
    /// Simulated time in milliseconds from drop start
    pub time: f64,
    pub positions: Vec<BallPose>,
}

/// Final rank of one participant; rank 0 landed first
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalPosition {
    pub id: String,
    pub name: String,
    pub position: usize,
}

/// Complete result of one simulation run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    /// Full replayable frame sequence, computed eagerly
    pub frames: Vec<SimulationFrame>,
    /// Participants ranked by landing time
    pub final_positions: Vec<FinalPosition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_round_trips_through_u8() {
        for raw in 0u8..4 {
            let phase = RafflePhase::try_from(raw).unwrap();
            assert_eq!(u8::from(phase), raw);
        }
        assert!(RafflePhase::try_from(4).is_err());
    }

    #[test]
    fn phase_wire_names_are_stable() {
        assert_eq!(RafflePhase::NotStarted.as_str(), "NOT_STARTED");
        assert_eq!(RafflePhase::RegistrationOpen.as_str(), "REGISTRATION_OPEN");
        assert_eq!(RafflePhase::Simulating.as_str(), "SIMULATING");
        assert_eq!(RafflePhase::Completed.as_str(), "COMPLETED");
        let json = serde_json::to_string(&RafflePhase::Simulating).unwrap();
        assert_eq!(json, "\"SIMULATING\"");
    }
}
