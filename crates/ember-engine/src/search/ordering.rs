//! Move ordering and the late-move-reduction table.

use std::sync::OnceLock;

use ember_core::{Color, Move, MoveFlag, MoveList, Piece, Position};

use crate::search::heuristics::{HistoryTable, KILLER_SLOTS, KillerTable, mvv_lva};

// Score bands. Each band sits above everything the lower bands can produce.
const TT_MOVE_BAND: i64 = 5 << 32;
const KILLER_BAND: i64 = 4 << 32;
const PROMOTION_BAND: i64 = 3 << 32;
const CAPTURE_BAND: i64 = 2 << 32;

/// Heuristic context for ordering quiet moves at one node.
#[derive(Clone, Copy)]
pub struct QuietContext<'a> {
    pub killers: &'a KillerTable,
    pub history: &'a HistoryTable,
    pub side: Color,
    pub ply: usize,
}

fn capture_score(pos: &Position, mv: Move) -> i64 {
    let victim = if mv.flag() == MoveFlag::EnPassant {
        Piece::Pawn
    } else {
        pos.piece_type_at(mv.dest_index()).unwrap_or(Piece::Pawn)
    };
    let attacker = pos.piece_type_at(mv.source_index()).unwrap_or(Piece::Pawn);
    mvv_lva(victim, attacker) as i64
}

fn score_move(pos: &Position, mv: Move, tt_move: Move, quiet: Option<QuietContext<'_>>) -> i64 {
    if mv == tt_move {
        return TT_MOVE_BAND;
    }
    if let Some(ctx) = quiet
        && let Some(slot) = ctx.killers.killer_slot(ctx.side, ctx.ply, mv)
    {
        return KILLER_BAND + (KILLER_SLOTS - slot) as i64;
    }
    if let Some(piece) = mv.promotion_piece() {
        return PROMOTION_BAND + piece.to_index() as i64;
    }
    if mv.is_capture() {
        return CAPTURE_BAND + capture_score(pos, mv);
    }
    match quiet {
        Some(ctx) => ctx.history.score(ctx.side, mv) as i64,
        None => 0,
    }
}

/// Incremental best-first move picker.
///
/// Order: TT move, killers (most recent first), promotions (queen first),
/// captures by MVV-LVA, then quiet moves by history score. Equal scores keep
/// generation order.
pub struct MovePicker {
    moves: [Move; 256],
    scores: [i64; 256],
    len: usize,
    cursor: usize,
}

impl MovePicker {
    /// Order `moves` for a full-width node.
    ///
    /// `tt_move` only takes effect if it is one of `moves`.
    pub fn new(pos: &Position, moves: &MoveList, tt_move: Move, quiet: QuietContext<'_>) -> Self {
        Self::build(pos, moves, tt_move, Some(quiet))
    }

    /// Order capture-class moves for quiescence (no killer or history context).
    pub fn new_captures(pos: &Position, moves: &MoveList) -> Self {
        Self::build(pos, moves, Move::NULL, None)
    }

    fn build(pos: &Position, moves: &MoveList, tt_move: Move, quiet: Option<QuietContext<'_>>) -> Self {
        let mut picker = Self {
            moves: [Move::NULL; 256],
            scores: [0; 256],
            len: moves.len(),
            cursor: 0,
        };
        for (i, &mv) in moves.as_slice().iter().enumerate() {
            picker.moves[i] = mv;
            picker.scores[i] = score_move(pos, mv, tt_move, quiet);
        }
        picker
    }

    /// Yield the highest-scored remaining move.
    pub fn pick_next(&mut self) -> Option<Move> {
        if self.cursor >= self.len {
            return None;
        }

        let mut best = self.cursor;
        for i in self.cursor + 1..self.len {
            if self.scores[i] > self.scores[best] {
                best = i;
            }
        }

        // Rotate rather than swap so that skipped moves keep their relative order.
        self.moves[self.cursor..=best].rotate_right(1);
        self.scores[self.cursor..=best].rotate_right(1);

        let mv = self.moves[self.cursor];
        self.cursor += 1;
        Some(mv)
    }
}

impl Iterator for MovePicker {
    type Item = Move;

    fn next(&mut self) -> Option<Move> {
        self.pick_next()
    }
}

/// Depth and move index at or above which the table saturates.
const LMR_LIMIT: usize = 63;

static LMR_TABLE: OnceLock<[[i32; 64]; 64]> = OnceLock::new();

fn lmr_table() -> &'static [[i32; 64]; 64] {
    LMR_TABLE.get_or_init(|| {
        let mut t = [[0; 64]; 64];
        for (d, row) in t.iter_mut().enumerate().skip(1) {
            for (i, cell) in row.iter_mut().enumerate().skip(1) {
                *cell = (0.75 + (d as f64).ln() * (i as f64).ln() / 2.25) as i32;
            }
        }
        t
    })
}

/// Plies to reduce the `move_index`-th move (0-based) at `depth`.
pub fn lmr_reduction(depth: i32, move_index: usize) -> i32 {
    let d = depth.clamp(0, LMR_LIMIT as i32) as usize;
    lmr_table()[d][move_index.min(LMR_LIMIT)]
}
