//! Capture-only search at the horizon.

use ember_core::Position;

use crate::search::heuristics::MAX_PLY;
use crate::search::negamax::SearchContext;
use crate::search::ordering::MovePicker;

/// Resolve captures and promotions until the position is quiet.
///
/// Stand-pat is the static evaluation. Under-promotions are skipped. Check
/// gets no special treatment: a side in check may still stand pat.
pub(crate) fn qsearch(
    pos: &mut Position,
    ply: usize,
    mut alpha: i32,
    beta: i32,
    ctx: &mut SearchContext<'_>,
) -> i32 {
    if ctx.check_limits() {
        return 0;
    }

    ctx.sel_depth = ctx.sel_depth.max(ply);
    ctx.stats.qnodes += 1;
    ctx.total_nodes += 1;

    let stand_pat = ctx.evaluate(pos);
    if stand_pat >= beta {
        ctx.stats.qleaves += 1;
        return beta;
    }
    if ply >= MAX_PLY {
        return stand_pat;
    }
    alpha = alpha.max(stand_pat);

    let moves = pos.generate_legal_capture_moves();
    for mv in MovePicker::new_captures(pos, &moves) {
        if mv.is_underpromotion() {
            continue;
        }

        let score = {
            let mut child = pos.make(mv);
            -qsearch(&mut child, ply + 1, -beta, -alpha, ctx)
        };
        if ctx.stopped {
            return 0;
        }

        if score > alpha {
            if score >= beta {
                ctx.stats.qbeta_cutoffs += 1;
                return beta;
            }
            alpha = score;
        }
    }

    alpha
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    use ember_core::Position;

    use super::qsearch;
    use crate::eval::{Evaluator, MaterialEvaluator};
    use crate::search::control::SearchControl;
    use crate::search::heuristics::{HistoryTable, KillerTable};
    use crate::search::negamax::{INF, SearchContext, SearchStats};
    use crate::search::tt::TranspositionTable;

    fn run(fen: &str, alpha: i32, beta: i32) -> (i32, SearchStats, usize) {
        let mut pos: Position = fen.parse().unwrap();
        let tt = TranspositionTable::new(1);
        let mut killers = KillerTable::new();
        let mut history = HistoryTable::new();
        let control = SearchControl::new_depth_only(Arc::new(AtomicBool::new(false)));
        let mut ctx = SearchContext::new(&tt, &mut killers, &mut history, &MaterialEvaluator, &control);
        let score = qsearch(&mut pos, 0, alpha, beta, &mut ctx);
        (score, ctx.stats, ctx.sel_depth)
    }

    #[test]
    fn quiet_position_returns_static_eval() {
        let fen = "4k3/8/8/8/8/8/8/R3K3 w - - 0 1";
        let pos: Position = fen.parse().unwrap();
        let (score, stats, _) = run(fen, -INF, INF);
        assert_eq!(score, MaterialEvaluator.evaluate(&pos));
        assert_eq!(score, 500);
        assert_eq!(stats.qnodes, 1);
        assert_eq!(stats.qleaves, 0);
    }

    #[test]
    fn stand_pat_fails_high() {
        let (score, stats, _) = run("4k3/8/8/8/8/8/8/R3K3 w - - 0 1", -INF, 100);
        assert_eq!(score, 100);
        assert_eq!(stats.qleaves, 1);
        assert_eq!(stats.qbeta_cutoffs, 0);
    }

    #[test]
    fn capture_beating_beta_is_a_cutoff() {
        // Down a queen before Rxd4, up a rook after it.
        let (score, stats, _) = run("4k3/8/8/8/3q4/8/8/3RK3 w - - 0 1", -INF, 100);
        assert_eq!(score, 100);
        assert_eq!(stats.qbeta_cutoffs, 1);
        assert_eq!(stats.qleaves, 0);
    }

    #[test]
    fn wins_hanging_queen() {
        // Rook takes an undefended queen.
        let (score, _, sel_depth) = run("4k3/8/8/8/3q4/8/8/3RK3 w - - 0 1", -INF, INF);
        assert_eq!(score, 500);
        assert!(sel_depth >= 1);
    }

    #[test]
    fn avoids_defended_capture() {
        // Qxd5 loses the queen to exd5; standing pat keeps the extra material.
        let (score, _, _) = run("4k3/8/4p3/3p4/8/8/8/3QK3 w - - 0 1", -INF, INF);
        assert_eq!(score, 900 - 200);
    }
}
