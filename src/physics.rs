// Lock-step tick simulation: every ball advances once per tick for a fixed
// number of ticks, landed balls stay frozen but keep contributing their
// final pose to every later frame. All randomness flows through the
// injected generator, so a (participants, seed, width) triple always maps
// to the same finishing order.

use crate::config::SimulationConfig;
use crate::rng::{PcgSeededRng, SeededRng};
use crate::state::{BallPose, FinalPosition, Participant, SimulationFrame, SimulationOutcome};

/// Static obstacle in the drop field
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peg {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

struct Ball {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
    angle: f64,
    radius: f64,
    launched: bool,
    stopped: bool,
    /// Simulated ms at which the ball froze; infinite while falling
    stopped_at: f64,
}

/// Build the staggered peg grid for the given canvas width.
///
/// Row count and band geometry are fixed; column count scales with the
/// width but never drops below the configured minimum. Even rows are
/// shifted by half a column.
pub fn peg_field(canvas_width: f64, cfg: &SimulationConfig) -> Vec<Peg> {
    let columns = ((canvas_width / cfg.peg_spacing).floor() as u32).max(cfg.min_peg_columns);
    let row_gap = cfg.peg_band_height / cfg.peg_rows as f64;

    let mut pegs = Vec::with_capacity((cfg.peg_rows * columns) as usize);
    for row in 0..cfg.peg_rows {
        let y = cfg.peg_band_top + row as f64 * row_gap;
        let offset = if row % 2 == 0 { cfg.peg_spacing / 2.0 } else { 0.0 };
        for col in 0..columns {
            pegs.push(Peg {
                x: offset + col as f64 * cfg.peg_spacing,
                y,
                radius: cfg.peg_radius,
            });
        }
    }
    pegs
}

/// Run the drop with the default generator keyed by `seed`.
pub fn simulate(
    participants: &[Participant],
    seed: &str,
    canvas_width: f64,
    cfg: &SimulationConfig,
) -> SimulationOutcome {
    let mut rng = PcgSeededRng::from_seed_str(seed);
    simulate_with_rng(participants, &mut rng, canvas_width, cfg)
}

/// Run the drop with an injected generator.
pub fn simulate_with_rng(
    participants: &[Participant],
    rng: &mut dyn SeededRng,
    canvas_width: f64,
    cfg: &SimulationConfig,
) -> SimulationOutcome {
    let pegs = peg_field(canvas_width, cfg);
    let mut balls = spawn_balls(participants.len(), canvas_width, cfg);

    let total_ticks = cfg.total_ticks();
    let tick_ms = cfg.tick_ms();
    let mut frames = Vec::with_capacity(total_ticks as usize);

    for tick in 0..total_ticks {
        let now_ms = tick as f64 * tick_ms;

        for ball in balls.iter_mut() {
            if ball.stopped {
                continue;
            }
            step_ball(ball, &pegs, canvas_width, now_ms, rng, cfg);
        }

        frames.push(SimulationFrame {
            time: now_ms,
            positions: balls
                .iter()
                .map(|b| BallPose {
                    x: b.x,
                    y: b.y,
                    angle: b.angle,
                })
                .collect(),
        });
    }

    let landing_times: Vec<f64> = balls.iter().map(|b| b.stopped_at).collect();
    let ranks = rank_landings(&landing_times);
    let final_positions = participants
        .iter()
        .zip(ranks)
        .map(|(p, rank)| FinalPosition {
            id: p.id.clone(),
            name: p.name.clone(),
            position: rank,
        })
        .collect();

    SimulationOutcome {
        frames,
        final_positions,
    }
}

fn spawn_balls(count: usize, canvas_width: f64, cfg: &SimulationConfig) -> Vec<Ball> {
    let usable = canvas_width - 2.0 * cfg.wall_margin;
    (0..count)
        .map(|i| {
            let lane = usable / count as f64;
            Ball {
                x: cfg.wall_margin + lane * (i as f64 + 0.5),
                y: cfg.drop_y,
                vx: 0.0,
                vy: 0.0,
                angle: 0.0,
                radius: cfg.ball_radius,
                launched: false,
                stopped: false,
                stopped_at: f64::INFINITY,
            }
        })
        .collect()
}

fn step_ball(
    ball: &mut Ball,
    pegs: &[Peg],
    canvas_width: f64,
    now_ms: f64,
    rng: &mut dyn SeededRng,
    cfg: &SimulationConfig,
) {
    // First active tick: seeded kick in [-1, 1)
    if !ball.launched {
        ball.vx = rng.next() * 2.0 - 1.0;
        ball.launched = true;
    }

    ball.vy += cfg.gravity;
    ball.x += ball.vx;
    ball.y += ball.vy;

    for peg in pegs {
        let dx = ball.x - peg.x;
        let dy = ball.y - peg.y;
        let min_dist = ball.radius + peg.radius;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist >= min_dist || dist == 0.0 {
            continue;
        }

        // Push the ball back to the contact boundary along the normal
        let nx = dx / dist;
        let ny = dy / dist;
        ball.x = peg.x + nx * min_dist;
        ball.y = peg.y + ny * min_dist;

        // Partially elastic bounce; only when moving into the peg
        let approach = ball.vx * nx + ball.vy * ny;
        if approach < 0.0 {
            let impulse = -(1.0 + cfg.peg_restitution) * approach;
            ball.vx += impulse * nx;
            ball.vy += impulse * ny;
        }

        // Seeded horizontal nudge so identical stacks split apart
        ball.vx += (rng.next() - 0.5) * cfg.peg_nudge;
    }

    let left = cfg.wall_margin + ball.radius;
    let right = canvas_width - cfg.wall_margin - ball.radius;
    if ball.x < left {
        ball.x = left;
        ball.vx = -ball.vx * cfg.wall_restitution;
    } else if ball.x > right {
        ball.x = right;
        ball.vx = -ball.vx * cfg.wall_restitution;
    }

    // Floor crossing is terminal
    if ball.y + ball.radius >= cfg.floor_y {
        ball.y = cfg.floor_y - ball.radius;
        ball.vx = 0.0;
        ball.vy = 0.0;
        ball.stopped = true;
        ball.stopped_at = now_ms;
        return;
    }

    ball.angle += ball.vx * 0.1;
}

/// Rank landing times ascending: earliest lands gets rank 0, never-landed
/// balls (infinite time) sort last, ties broken by input order.
pub(crate) fn rank_landings(landing_times: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..landing_times.len()).collect();
    order.sort_by(|&a, &b| {
        landing_times[a]
            .partial_cmp(&landing_times[b])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut ranks = vec![0usize; landing_times.len()];
    for (rank, idx) in order.into_iter().enumerate() {
        ranks[idx] = rank;
    }
    ranks
}
