//! Integration tests for the iterative-deepening searcher.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use ember_core::{Move, Position};
use ember_engine::search::ASPIRATION_WINDOW;
use ember_engine::{Evaluator, MATE_SCORE, SearchControl, SearchInfo, SearchResult, Searcher};

const SCHOLARS_MATE_FEN: &str = "r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4";

const ONLY_MOVE_FEN: &str = "7k/8/5K2/8/8/8/8/6R1 b - - 0 1";

const BACK_RANK_MATE_FEN: &str = "6k1/8/6K1/8/8/8/8/R7 w - - 0 1";

const STALEMATE_FEN: &str = "k7/2K5/1Q6/8/8/8/8/8 b - - 0 1";

const CHECKMATED_FEN: &str = "7k/6Q1/5K2/8/8/8/8/8 b - - 0 1";

const SICILIAN_FEN: &str = "rnbqkbnr/pp1ppppp/8/2p5/4P3/8/PPPP1PPP/RNBQKBNR w KQkq c6 0 2";

fn depth_control() -> SearchControl {
    SearchControl::new_depth_only(Arc::new(AtomicBool::new(false)))
}

fn search_fen(fen: &str, depth: u32) -> SearchResult {
    let mut pos: Position = fen.parse().unwrap();
    Searcher::new().search(&mut pos, depth, &depth_control(), |_| {})
}

fn is_legal(fen: &str, mv: Move) -> bool {
    let pos: Position = fen.parse().unwrap();
    pos.generate_legal_moves().contains(mv)
}

// ── Terminal and forced positions ─────────────────────────────────────────────

#[test]
fn single_legal_move_is_played_without_search() {
    let result = search_fen(ONLY_MOVE_FEN, 6);
    assert_eq!(result.best_move.to_uci(), "h8h7");
    assert_eq!(result.score, 0);
    assert_eq!(result.nodes, 0);
}

#[test]
fn stalemate_returns_null_and_zero() {
    let result = search_fen(STALEMATE_FEN, 4);
    assert!(result.best_move.is_null());
    assert_eq!(result.score, 0);
}

#[test]
fn checkmated_root_returns_null_and_mated_score() {
    let result = search_fen(CHECKMATED_FEN, 4);
    assert!(result.best_move.is_null());
    assert_eq!(result.score, -MATE_SCORE);
}

// ── Mates ─────────────────────────────────────────────────────────────────────

#[test]
fn finds_scholars_mate() {
    let result = search_fen(SCHOLARS_MATE_FEN, 2);
    assert_eq!(result.best_move.to_uci(), "h5f7");
    assert_eq!(result.score, MATE_SCORE - 1);
}

#[test]
fn prefers_immediate_mate_over_longer_ones() {
    let result = search_fen(BACK_RANK_MATE_FEN, 4);
    assert_eq!(result.best_move.to_uci(), "a1a8");
    assert_eq!(result.score, MATE_SCORE - 1);
}

// ── Quiet positions ───────────────────────────────────────────────────────────

#[test]
fn startpos_depth_one_scores_zero() {
    let result = search_fen(ember_core::STARTING_FEN, 1);
    assert_eq!(result.score, 0);
    assert_eq!(result.depth, 1);
    assert!(is_legal(ember_core::STARTING_FEN, result.best_move));
}

#[test]
fn fresh_searches_are_deterministic() {
    let first = search_fen(SICILIAN_FEN, 4);
    let second = search_fen(SICILIAN_FEN, 4);
    assert_eq!(first.best_move, second.best_move);
    assert_eq!(first.score, second.score);
    assert_eq!(first.nodes, second.nodes);
    assert_eq!(first.pv, second.pv);
}

#[test]
fn search_leaves_position_unchanged() {
    let mut pos: Position = SICILIAN_FEN.parse().unwrap();
    let before = pos.fingerprint();
    Searcher::new().search(&mut pos, 3, &depth_control(), |_| {});
    assert_eq!(pos.fingerprint(), before);
    assert_eq!(pos.depth_from_root(), 0);
}

#[test]
fn reports_each_accepted_depth() {
    let mut pos = Position::startpos();
    let mut reports: Vec<SearchInfo> = Vec::new();
    let result = Searcher::new().search(&mut pos, 4, &depth_control(), |info| reports.push(info.clone()));

    let depths: Vec<u32> = reports.iter().map(|info| info.depth).collect();
    assert_eq!(depths, vec![1, 2, 3, 4]);
    for pair in reports.windows(2) {
        assert!(pair[1].nodes >= pair[0].nodes);
    }
    for info in &reports {
        assert_eq!(info.pv.first(), Some(&info.best_move));
    }
    assert_eq!(result.pv.first(), Some(&result.best_move));
    assert_eq!(result.ponder_move, result.pv.get(1).copied());
}

#[test]
fn pv_moves_are_playable_in_sequence() {
    let mut pos: Position = SICILIAN_FEN.parse().unwrap();
    let result = Searcher::new().search(&mut pos, 4, &depth_control(), |_| {});
    for mv in &result.pv {
        assert!(pos.generate_legal_moves().contains(*mv), "{mv} not legal");
        pos.push_move(*mv);
    }
}

/// Rewards the side to move by 200 per ply from the root, so every extra
/// ply swings the root score far outside the previous window.
struct PlyEvaluator;

impl Evaluator for PlyEvaluator {
    fn evaluate(&self, pos: &Position) -> i32 {
        200 * pos.depth_from_root() as i32
    }
}

#[test]
fn aspiration_failure_re_searches_the_same_depth() {
    let mut pos = Position::startpos();
    let mut reports: Vec<SearchInfo> = Vec::new();
    let mut searcher = Searcher::with_evaluator(Box::new(PlyEvaluator));
    let result = searcher.search(&mut pos, 2, &depth_control(), |info| reports.push(info.clone()));

    // Depth 1 leaves are Black to move at ply 1; depth 2 leaves are White at ply 2.
    let depths: Vec<u32> = reports.iter().map(|info| info.depth).collect();
    assert_eq!(depths, vec![1, 2]);
    assert_eq!(reports[0].score, -200);
    assert_eq!(reports[1].score, 400);
    assert!(reports[1].score > reports[0].score + ASPIRATION_WINDOW);
    assert_eq!(result.score, 400);
    assert_eq!(result.depth, 2);
}

// ── Limits ────────────────────────────────────────────────────────────────────

#[test]
fn pre_stopped_search_falls_back_to_a_legal_move() {
    let stopped = Arc::new(AtomicBool::new(true));
    let control = SearchControl::new_depth_only(stopped);
    let mut pos = Position::startpos();
    let result = Searcher::new().search(&mut pos, 5, &control, |_| {});
    assert_eq!(result.depth, 0);
    assert!(is_legal(ember_core::STARTING_FEN, result.best_move));
}

#[test]
fn node_limit_stops_search() {
    let control = depth_control().with_node_limit(500);
    let mut pos: Position = SICILIAN_FEN.parse().unwrap();
    let result = Searcher::new().search(&mut pos, 64, &control, |_| {});
    assert!(control.is_stopped());
    assert!(result.nodes <= 501);
    assert!(is_legal(SICILIAN_FEN, result.best_move));
}

#[test]
fn searcher_reuse_after_new_game() {
    let mut searcher = Searcher::new();
    let mut pos: Position = SICILIAN_FEN.parse().unwrap();
    let first = searcher.search(&mut pos, 3, &depth_control(), |_| {});
    searcher.new_game();
    let again = searcher.search(&mut pos, 3, &depth_control(), |_| {});
    assert_eq!(first.best_move, again.best_move);
    assert_eq!(first.score, again.score);
}
