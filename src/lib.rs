// Deterministic, seeded raffle core for quota-gated event signups:
// a Plinko-style drop simulation decides the finishing order, an
// orchestrator walks each raffle through its lifecycle, and a scanner
// launches raffles as their start time comes due.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod mailer;
pub mod orchestrator;
pub mod physics;
pub mod rng;
pub mod scanner;
pub mod seed;
pub mod state;
pub mod store;

pub use broadcast::{raffle_channel, Broadcaster, ChannelBroadcaster, Notice};
pub use config::{RaffleConfig, SimulationConfig};
pub use error::RaffleError;
pub use mailer::{Mailer, MessageData, Recipient, RecordingMailer, SendReceipt, TemplateKind};
pub use orchestrator::RaffleOrchestrator;
pub use physics::{peg_field, simulate, simulate_with_rng, Peg};
pub use rng::{FixedSequenceRng, PcgSeededRng, SeededRng};
pub use scanner::{RaffleScanner, ScannerHandle};
pub use seed::{derive_seed, SeedEntry};
pub use state::{
    BallPose, EventPatch, EventRecord, FinalPosition, Participant, RafflePhase, SignupFilter,
    SignupPatch, SignupRecord, SignupStatus, SimulationFrame, SimulationOutcome,
};
pub use store::{MemoryStore, RaffleStore};
