//! Time management: turn `go` parameters into a [`SearchControl`].

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use ember_core::Color;

use crate::search::control::SearchControl;

/// Moves assumed to remain when the GUI does not say.
pub const DEFAULT_MOVES_TO_GO: u32 = 30;

/// Reserved for communication latency.
const MOVE_OVERHEAD_MS: u64 = 10;

/// Never plan to spend more than this share of the remaining time on one move.
const MAX_FRACTION: f64 = 0.25;

/// Engine-side description of a `go` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchLimits {
    pub wtime: Option<Duration>,
    pub btime: Option<Duration>,
    pub winc: Option<Duration>,
    pub binc: Option<Duration>,
    pub movestogo: Option<u32>,
    pub movetime: Option<Duration>,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub infinite: bool,
    pub ponder: bool,
}

impl SearchLimits {
    /// Remaining time and increment for `side`, if a clock was given.
    pub fn clock_for(&self, side: Color) -> Option<(Duration, Duration)> {
        let (remaining, increment) = match side {
            Color::White => (self.wtime, self.winc),
            Color::Black => (self.btime, self.binc),
        };
        remaining.map(|r| (r, increment.unwrap_or(Duration::ZERO)))
    }
}

/// Time budget for one move.
///
/// `remaining / moves_to_go + 3/4 * increment`, after subtracting a small
/// overhead, capped at a quarter of the remaining time and never below 1 ms.
/// The driver stops starting new iterations after half the budget.
pub fn allocate_time(remaining: Duration, increment: Duration, moves_to_go: Option<u32>) -> Duration {
    let remaining_ms = remaining.as_millis() as u64;
    let usable = remaining_ms.saturating_sub(MOVE_OVERHEAD_MS).max(1) as f64;
    let mtg = moves_to_go.unwrap_or(DEFAULT_MOVES_TO_GO).max(1) as f64;
    let inc_ms = increment.as_millis() as f64;

    let budget = (usable / mtg + inc_ms * 0.75).min(usable * MAX_FRACTION).max(1.0);
    Duration::from_millis(budget as u64)
}

/// Build a [`SearchControl`] for `limits` with `side` to move.
///
/// Priority:
/// 1. `infinite` → unbounded until stopped
/// 2. `movetime` → fixed budget
/// 3. a clock for the side to move → [`allocate_time`]
/// 4. otherwise → bounded by depth only
///
/// `ponder` defers the clock until `ponderhit`. A node limit applies in every mode.
pub fn control_from_limits(limits: &SearchLimits, side: Color, stopped: Arc<AtomicBool>) -> SearchControl {
    let budget = if limits.infinite {
        None
    } else if let Some(movetime) = limits.movetime {
        Some(movetime)
    } else {
        limits
            .clock_for(side)
            .map(|(remaining, increment)| allocate_time(remaining, increment, limits.movestogo))
    };

    let control = if limits.ponder {
        SearchControl::new_ponder(stopped, budget)
    } else if limits.infinite {
        SearchControl::new_infinite(stopped)
    } else if let Some(budget) = budget {
        SearchControl::new_timed(stopped, budget)
    } else {
        SearchControl::new_depth_only(stopped)
    };

    match limits.nodes {
        Some(nodes) => control.with_node_limit(nodes),
        None => control,
    }
}
