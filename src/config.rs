use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Physics and layout constants for the drop simulation.
///
/// Every value that affects the outcome lives here so a run can be
/// reproduced from (participants, seed, canvas width, config) alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Simulated ticks per second
    pub tick_rate: f64,
    /// Total simulated duration in milliseconds
    pub duration_ms: f64,
    /// Downward acceleration per tick, px/tick^2
    pub gravity: f64,
    /// Restitution of ball-peg impacts
    pub peg_restitution: f64,
    /// Restitution of ball-wall impacts
    pub wall_restitution: f64,
    /// Horizontal perturbation magnitude added on peg impact
    pub peg_nudge: f64,
    /// Distance from canvas edge to each wall, px
    pub wall_margin: f64,
    /// Floor line; a ball crossing it freezes permanently
    pub floor_y: f64,
    /// Number of peg rows
    pub peg_rows: u32,
    /// Top of the peg band
    pub peg_band_top: f64,
    /// Vertical extent of the peg band
    pub peg_band_height: f64,
    /// Nominal horizontal peg spacing, px
    pub peg_spacing: f64,
    /// Column count never drops below this regardless of canvas width
    pub min_peg_columns: u32,
    pub peg_radius: f64,
    pub ball_radius: f64,
    /// Fixed starting y for every ball
    pub drop_y: f64,
    /// Canvas width used when none is supplied
    pub default_canvas_width: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            duration_ms: 10_000.0,
            gravity: 0.2,
            peg_restitution: 0.5,
            wall_restitution: 0.6,
            peg_nudge: 0.5,
            wall_margin: 20.0,
            floor_y: 760.0,
            peg_rows: 12,
            peg_band_top: 100.0,
            peg_band_height: 600.0,
            peg_spacing: 80.0,
            min_peg_columns: 15,
            peg_radius: 5.0,
            ball_radius: 10.0,
            drop_y: 20.0,
            default_canvas_width: 1200.0,
        }
    }
}

impl SimulationConfig {
    /// Number of lock-step ticks in one run.
    pub fn total_ticks(&self) -> u32 {
        (self.duration_ms / 1000.0 * self.tick_rate).round() as u32
    }

    /// Milliseconds of simulated time per tick.
    pub fn tick_ms(&self) -> f64 {
        1000.0 / self.tick_rate
    }
}

/// Wall-clock pacing of the raffle lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RaffleConfig {
    /// Pause between simulating and revealing results, so clients can
    /// play the animation in sync with the server's authoritative outcome
    pub reveal_delay: Duration,
    /// Scanner sweep interval
    pub scan_interval: Duration,
}

impl Default for RaffleConfig {
    fn default() -> Self {
        Self {
            reveal_delay: Duration::from_secs(20),
            scan_interval: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_run_is_600_ticks() {
        let cfg = SimulationConfig::default();
        assert_eq!(cfg.total_ticks(), 600);
        assert!((cfg.tick_ms() - 16.666_666).abs() < 1e-3);
    }
}
