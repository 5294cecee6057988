//! Negamax alpha-beta search with null-move pruning and late-move reductions.

use ember_core::{Move, Position};

use crate::eval::Evaluator;
use crate::search::control::SearchControl;
use crate::search::heuristics::{HistoryTable, KillerTable, MAX_PLY};
use crate::search::ordering::{MovePicker, QuietContext, lmr_reduction};
use crate::search::quiescence::qsearch;
use crate::search::tt::{Bound, TranspositionTable};

/// Score outside any reachable bound.
pub const INF: i32 = 32_000;

/// Score of delivering mate at the root; mate at ply `n` scores `MATE_SCORE - n`.
pub const MATE_SCORE: i32 = 31_000;

/// Scores beyond this magnitude are forced mates.
pub const MATE_THRESHOLD: i32 = 30_000;

/// Minimum remaining depth for null-move pruning.
pub const NULL_MIN_DEPTH: i32 = 2;

/// Remaining depth must exceed this for a move to be reduced.
pub const LMR_MIN_DEPTH: i32 = 2;

/// Moves at index up to this (0-based) are never reduced.
pub const LMR_MOVES_WITHOUT_REDUCTION: usize = 1;

/// Return `true` if `score` announces a forced mate for either side.
#[inline]
pub fn is_mate_score(score: i32) -> bool {
    score.abs() >= MATE_THRESHOLD
}

/// Per-iteration counters. Reset after each accepted depth.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes: u64,
    pub qnodes: u64,
    pub leaves: u64,
    pub qleaves: u64,
    pub tt_hits: u64,
    pub beta_cutoffs: u64,
    pub qbeta_cutoffs: u64,
}

/// Mutable state threaded through one search.
pub(crate) struct SearchContext<'a> {
    pub tt: &'a TranspositionTable,
    pub killers: &'a mut KillerTable,
    pub history: &'a mut HistoryTable,
    pub evaluator: &'a dyn Evaluator,
    pub control: &'a SearchControl,
    pub stats: SearchStats,
    /// Nodes visited since the search started, across all iterations.
    pub total_nodes: u64,
    /// Deepest ply reached, quiescence included.
    pub sel_depth: usize,
    /// Latched once a limit fires; every frame unwinds with a dummy score.
    pub stopped: bool,
}

impl<'a> SearchContext<'a> {
    pub fn new(
        tt: &'a TranspositionTable,
        killers: &'a mut KillerTable,
        history: &'a mut HistoryTable,
        evaluator: &'a dyn Evaluator,
        control: &'a SearchControl,
    ) -> Self {
        Self {
            tt,
            killers,
            history,
            evaluator,
            control,
            stats: SearchStats::default(),
            total_nodes: 0,
            sel_depth: 0,
            stopped: false,
        }
    }

    /// Consult the limit checker; latches [`SearchContext::stopped`].
    #[inline]
    pub fn check_limits(&mut self) -> bool {
        if !self.stopped && self.control.exhausted(self.total_nodes) {
            self.stopped = true;
        }
        self.stopped
    }

    #[inline]
    pub fn evaluate(&self, pos: &Position) -> i32 {
        self.evaluator.evaluate(pos)
    }
}

/// Principal search below the root.
///
/// Fail-hard: the result is clamped to `[alpha, beta]`. Returns 0 once the
/// search has been stopped; callers must check `ctx.stopped` before using it.
pub(crate) fn negamax(
    pos: &mut Position,
    depth: i32,
    ply: usize,
    mut alpha: i32,
    mut beta: i32,
    null_allowed: bool,
    ctx: &mut SearchContext<'_>,
) -> i32 {
    if ctx.check_limits() {
        return 0;
    }

    // Mate-distance pruning
    let mate_value = MATE_SCORE - ply as i32;
    alpha = alpha.max(-mate_value);
    beta = beta.min(mate_value - 1);
    if alpha >= beta {
        ctx.stats.leaves += 1;
        return alpha;
    }

    let in_check = pos.is_in_check();
    if depth <= 0 && !in_check {
        return qsearch(pos, ply, alpha, beta, ctx);
    }

    ctx.sel_depth = ctx.sel_depth.max(ply);
    ctx.stats.nodes += 1;
    ctx.total_nodes += 1;

    if ply >= MAX_PLY {
        return ctx.evaluate(pos);
    }

    if pos.is_draw_by_repetition_or_fifty_move() {
        ctx.stats.leaves += 1;
        return 0;
    }

    let hash = pos.fingerprint();
    let mut tt_move = Move::NULL;
    if let Some(entry) = ctx.tt.probe(hash, ply) {
        tt_move = entry.best_move;
        if entry.depth >= depth {
            ctx.stats.tt_hits += 1;
            match entry.bound {
                Bound::Exact => {
                    ctx.stats.leaves += 1;
                    return entry.score;
                }
                Bound::LowerBound => alpha = alpha.max(entry.score),
                Bound::UpperBound => beta = beta.min(entry.score),
                Bound::None => {}
            }
            if alpha >= beta {
                ctx.stats.leaves += 1;
                return entry.score;
            }
        }
    }

    let side = pos.side_to_move();

    if null_allowed
        && !in_check
        && depth >= NULL_MIN_DEPTH
        && pos.has_non_pawn_material(side)
        && ctx.evaluate(pos) >= beta
    {
        let reduction = if depth > 6 { 3 } else { 2 };
        if let Some(mut child) = pos.make_null() {
            let score = -negamax(&mut child, depth - reduction - 1, ply + 1, -beta, -beta + 1, false, ctx);
            drop(child);
            if ctx.stopped {
                return 0;
            }
            if score >= beta {
                ctx.stats.beta_cutoffs += 1;
                return beta;
            }
        }
    }

    let moves = pos.generate_legal_moves();
    if moves.is_empty() {
        ctx.stats.leaves += 1;
        return if in_check { -mate_value } else { 0 };
    }

    // A hint from a colliding fingerprint may not be playable here.
    if !moves.contains(tt_move) {
        tt_move = Move::NULL;
    }

    let picker = MovePicker::new(
        pos,
        &moves,
        tt_move,
        QuietContext {
            killers: &*ctx.killers,
            history: &*ctx.history,
            side,
            ply,
        },
    );

    let mut bound = Bound::UpperBound;
    let mut best_move = Move::NULL;

    for (index, mv) in picker.enumerate() {
        let child_depth = child_depth(depth, index, mv.is_quiet(), in_check);
        let score = {
            let mut child = pos.make(mv);
            -negamax(&mut child, child_depth, ply + 1, -beta, -alpha, true, ctx)
        };
        if ctx.stopped {
            return 0;
        }

        if score > alpha {
            best_move = mv;
            if score >= beta {
                if mv.is_quiet() {
                    ctx.killers.store(side, ply, mv);
                    ctx.history.record(side, mv, depth);
                }
                ctx.stats.beta_cutoffs += 1;
                bound = Bound::LowerBound;
                alpha = beta;
                break;
            }
            bound = Bound::Exact;
            alpha = score;
        }
    }

    let store_move = if best_move.is_null() { tt_move } else { best_move };
    ctx.tt.store(hash, depth, alpha, store_move, bound, ply);

    alpha
}

/// Remaining depth for the child reached by the `move_index`-th ordered move.
///
/// Late quiet moves are reduced; a node in check extends every child by one ply.
fn child_depth(depth: i32, move_index: usize, quiet: bool, in_check: bool) -> i32 {
    let mut child = depth - 1;
    if depth > LMR_MIN_DEPTH && move_index > LMR_MOVES_WITHOUT_REDUCTION && quiet {
        child -= lmr_reduction(depth, move_index);
    }
    if in_check {
        child += 1;
    }
    child
}

/// Result of one root pass.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RootOutcome {
    pub best_move: Move,
    pub score: i32,
    /// The position had at most one legal move; nothing was searched.
    pub forced: bool,
}

/// Root pass at `depth` with window `(alpha, beta)`.
///
/// Returns `None` if the search was stopped before the move loop finished.
/// A fail-high returns the refuting move with score `beta`; a fail-low
/// returns the first ordered move with score `alpha`.
pub(crate) fn search_root(
    pos: &mut Position,
    mut depth: i32,
    mut alpha: i32,
    beta: i32,
    ctx: &mut SearchContext<'_>,
) -> Option<RootOutcome> {
    let moves = pos.generate_legal_moves();
    let in_check = pos.is_in_check();

    match moves.len() {
        0 => {
            return Some(RootOutcome {
                best_move: Move::NULL,
                score: if in_check { -MATE_SCORE } else { 0 },
                forced: true,
            });
        }
        1 => {
            return Some(RootOutcome {
                best_move: moves[0],
                score: 0,
                forced: true,
            });
        }
        _ => {}
    }

    if in_check {
        depth += 1;
    }

    ctx.stats.nodes += 1;
    ctx.total_nodes += 1;

    let hash = pos.fingerprint();
    let tt_move = ctx
        .tt
        .probe(hash, 0)
        .map(|entry| entry.best_move)
        .filter(|&mv| moves.contains(mv))
        .unwrap_or(Move::NULL);

    let side = pos.side_to_move();
    let picker = MovePicker::new(
        pos,
        &moves,
        tt_move,
        QuietContext {
            killers: &*ctx.killers,
            history: &*ctx.history,
            side,
            ply: 0,
        },
    );

    let mut first_move = Move::NULL;
    let mut best_move = Move::NULL;

    for mv in picker {
        if first_move.is_null() {
            first_move = mv;
        }

        let score = {
            let mut child = pos.make(mv);
            -negamax(&mut child, depth - 1, 1, -beta, -alpha, true, ctx)
        };
        if ctx.check_limits() {
            break;
        }

        if score > alpha {
            best_move = mv;
            if score >= beta {
                ctx.tt.store(hash, depth, beta, mv, Bound::LowerBound, 0);
                return Some(RootOutcome {
                    best_move: mv,
                    score: beta,
                    forced: false,
                });
            }
            alpha = score;
        }
    }

    if ctx.stopped {
        return None;
    }

    // No move raised alpha: the score is only an upper bound.
    let bound = if best_move.is_null() {
        best_move = first_move;
        Bound::UpperBound
    } else {
        Bound::Exact
    };
    ctx.tt.store(hash, depth, alpha, best_move, bound, 0);
    Some(RootOutcome {
        best_move,
        score: alpha,
        forced: false,
    })
}

/// Follow best moves through the table from `pos`, at most `max_len` plies.
///
/// Stops at a missing entry, a null move, or a move that is not legal in the
/// position reached (a fingerprint collision).
pub(crate) fn principal_variation(pos: &mut Position, tt: &TranspositionTable, max_len: usize) -> Vec<Move> {
    let mut pv = Vec::with_capacity(max_len);
    extend_pv(pos, tt, max_len, &mut pv);
    pv
}

fn extend_pv(pos: &mut Position, tt: &TranspositionTable, max_len: usize, pv: &mut Vec<Move>) {
    if pv.len() >= max_len {
        return;
    }
    let Some(entry) = tt.probe(pos.fingerprint(), pv.len()) else {
        return;
    };
    let mv = entry.best_move;
    if !pos.generate_legal_moves().contains(mv) {
        return;
    }
    pv.push(mv);
    let mut child = pos.make(mv);
    extend_pv(&mut child, tt, max_len, pv);
}
