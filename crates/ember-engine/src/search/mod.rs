//! Iterative-deepening search with aspiration windows.

pub mod control;
pub mod heuristics;
pub mod negamax;
pub mod ordering;
pub mod quiescence;
pub mod tt;

use std::time::Duration;

use ember_core::{Move, Position};
use tracing::debug;

use crate::eval::{Evaluator, MaterialEvaluator};
use control::SearchControl;
use heuristics::{HistoryTable, KillerTable};
use negamax::{INF, SearchContext, is_mate_score, principal_variation, search_root};
use tt::TranspositionTable;

/// Half-width of the aspiration window around the previous score.
pub const ASPIRATION_WINDOW: i32 = 25;

/// Depth ceiling for unbounded (infinite / ponder) searches.
pub const MAX_DEPTH: u32 = 128;

/// Default transposition table size.
pub const DEFAULT_HASH_MB: usize = 16;

/// Progress report for one accepted iteration.
#[derive(Debug, Clone)]
pub struct SearchInfo {
    pub depth: u32,
    pub sel_depth: usize,
    pub elapsed: Duration,
    /// Centipawns from the side to move, or a mate score.
    pub score: i32,
    /// Nodes since the search started.
    pub nodes: u64,
    pub nps: u64,
    pub best_move: Move,
    pub pv: Vec<Move>,
}

/// Result of a completed search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Best move found. Null only when the position has no legal moves.
    pub best_move: Move,
    /// Second move of the principal variation, for pondering.
    pub ponder_move: Option<Move>,
    pub pv: Vec<Move>,
    pub score: i32,
    pub nodes: u64,
    /// Deepest fully accepted iteration.
    pub depth: u32,
}

/// A search session: owns the transposition table, heuristic tables and evaluator.
pub struct Searcher {
    tt: TranspositionTable,
    killers: KillerTable,
    history: HistoryTable,
    evaluator: Box<dyn Evaluator>,
}

impl Searcher {
    /// Create a searcher with a [`DEFAULT_HASH_MB`] table and material evaluation.
    pub fn new() -> Self {
        Self::with_evaluator(Box::new(MaterialEvaluator))
    }

    /// Create a searcher with a custom evaluator.
    pub fn with_evaluator(evaluator: Box<dyn Evaluator>) -> Self {
        Self {
            tt: TranspositionTable::new(DEFAULT_HASH_MB),
            killers: KillerTable::new(),
            history: HistoryTable::new(),
            evaluator,
        }
    }

    /// Forget everything learned from previous games.
    pub fn new_game(&mut self) {
        self.tt.clear();
        self.killers.clear();
        self.history.clear();
    }

    /// Replace the transposition table with one of `mb` megabytes.
    pub fn resize_tt(&mut self, mb: usize) {
        self.tt = TranspositionTable::new(mb);
    }

    /// Search `pos` to `max_depth` plies (or until `control` says stop).
    ///
    /// `on_iter` is called once per accepted iteration. The position is
    /// returned unchanged.
    pub fn search<F>(
        &mut self,
        pos: &mut Position,
        max_depth: u32,
        control: &SearchControl,
        mut on_iter: F,
    ) -> SearchResult
    where
        F: FnMut(&SearchInfo),
    {
        self.killers.clear();
        self.history.age();
        self.tt.new_generation();

        let mut ctx = SearchContext::new(
            &self.tt,
            &mut self.killers,
            &mut self.history,
            self.evaluator.as_ref(),
            control,
        );

        let mut best_move = Move::NULL;
        let mut best_score = 0;
        let mut completed_depth = 0;
        let mut pv: Vec<Move> = Vec::new();

        let mut alpha = -INF;
        let mut beta = INF;
        let mut depth: u32 = 1;

        while (depth <= max_depth || control.is_unbounded()) && depth <= MAX_DEPTH {
            if control.should_stop_iterating() || ctx.stopped || is_mate_score(best_score) {
                break;
            }

            let Some(outcome) = search_root(pos, depth as i32, alpha, beta, &mut ctx) else {
                break;
            };
            best_move = outcome.best_move;
            best_score = outcome.score;

            if outcome.score <= alpha {
                debug!(depth, score = outcome.score, "aspiration fail-low, widening");
                alpha = -INF;
                continue;
            }
            if outcome.score >= beta {
                debug!(depth, score = outcome.score, "aspiration fail-high, widening");
                beta = INF;
                continue;
            }

            pv = if outcome.best_move.is_null() {
                Vec::new()
            } else {
                let mut line = vec![outcome.best_move];
                let mut child = pos.make(outcome.best_move);
                line.extend(principal_variation(&mut child, ctx.tt, depth as usize - 1));
                line
            };
            completed_depth = depth;

            let elapsed = control.elapsed();
            let info = SearchInfo {
                depth,
                sel_depth: ctx.sel_depth,
                elapsed,
                score: outcome.score,
                nodes: ctx.total_nodes,
                nps: nodes_per_second(ctx.total_nodes, elapsed),
                best_move: outcome.best_move,
                pv: pv.clone(),
            };
            debug!(
                depth,
                score = outcome.score,
                nodes = ctx.stats.nodes,
                qnodes = ctx.stats.qnodes,
                leaves = ctx.stats.leaves,
                qleaves = ctx.stats.qleaves,
                tt_hits = ctx.stats.tt_hits,
                beta_cutoffs = ctx.stats.beta_cutoffs,
                qbeta_cutoffs = ctx.stats.qbeta_cutoffs,
                "iteration complete"
            );
            on_iter(&info);

            alpha = outcome.score - ASPIRATION_WINDOW;
            beta = outcome.score + ASPIRATION_WINDOW;
            depth += 1;
            ctx.stats = Default::default();

            if outcome.forced && !control.is_unbounded() {
                break;
            }
        }

        let nodes = ctx.total_nodes;
        drop(ctx);

        if best_move.is_null()
            && let Some(&first) = pos.generate_legal_moves().as_slice().first()
        {
            debug!("no iteration completed, falling back to first legal move");
            best_move = first;
        }
        if pv.first() != Some(&best_move) {
            pv = if best_move.is_null() { Vec::new() } else { vec![best_move] };
        }

        debug!(best = %best_move, score = best_score, depth = completed_depth, nodes, "search finished");

        SearchResult {
            best_move,
            ponder_move: pv.get(1).copied(),
            pv,
            score: best_score,
            nodes,
            depth: completed_depth,
        }
    }
}

impl Default for Searcher {
    fn default() -> Self {
        Self::new()
    }
}

fn nodes_per_second(nodes: u64, elapsed: Duration) -> u64 {
    let millis = elapsed.as_millis().max(1) as u64;
    nodes.saturating_mul(1000) / millis
}
