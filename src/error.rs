use thiserror::Error;

/// Errors that may be returned by the raffle subsystem
#[derive(Error, Debug, Clone)]
pub enum RaffleError {
    /// The event record does not exist in the store
    #[error("event `{0}` not found")]
    EventNotFound(String),

    /// The event has no raffle start/end time configured
    #[error("event `{0}` has no raffle schedule configured")]
    ScheduleMissing(String),

    /// The event's raffle already advanced past NOT_STARTED
    #[error("raffle for event `{0}` has already started")]
    AlreadyStarted(String),

    /// Record store read or write failed
    #[error("storage failure: {0}")]
    Store(String),

    /// Outbound message delivery failed for one recipient
    #[error("message delivery failed for `{address}`: {reason}")]
    Mail { address: String, reason: String },

    /// Seed derivation was asked to hash a signup without a declared intent
    #[error("signup `{0}` has no registration intent, cannot derive seed")]
    MissingIntent(String),
}
