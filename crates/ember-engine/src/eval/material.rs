//! Material balance evaluation.
//!
//! Counts weighted piece material for each side and adds a bishop-pair bonus.

use ember_core::{Color, Piece, Position};

use crate::eval::Evaluator;

/// Material values indexed by [`Piece::to_index()`].
///
/// | Piece  | cp  |
/// |--------|-----|
/// | Pawn   | 100 |
/// | Knight | 320 |
/// | Bishop | 330 |
/// | Rook   | 500 |
/// | Queen  | 900 |
/// | King   |   0 |
pub const MATERIAL_VALUE: [i32; 6] = [100, 320, 330, 500, 900, 0];

const PIECES: [Piece; 6] = [
    Piece::Pawn,
    Piece::Knight,
    Piece::Bishop,
    Piece::Rook,
    Piece::Queen,
    Piece::King,
];

/// Bonus awarded to a side that has two or more bishops.
pub const BISHOP_PAIR_BONUS: i32 = 50;

/// Evaluate material balance from White's perspective.
pub fn material(pos: &Position) -> i32 {
    let board = pos.board();
    let white = *board.color_combined(Color::White);
    let black = *board.color_combined(Color::Black);

    let mut score = 0;
    for piece in PIECES {
        let piece_bb = *board.pieces(piece);
        let white_count = (piece_bb & white).popcnt() as i32;
        let black_count = (piece_bb & black).popcnt() as i32;
        score += MATERIAL_VALUE[piece.to_index()] * (white_count - black_count);
    }

    let bishops = *board.pieces(Piece::Bishop);
    if (bishops & white).popcnt() >= 2 {
        score += BISHOP_PAIR_BONUS;
    }
    if (bishops & black).popcnt() >= 2 {
        score -= BISHOP_PAIR_BONUS;
    }

    score
}

/// The default evaluator: material plus bishop pair, relative to the side to move.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaterialEvaluator;

impl Evaluator for MaterialEvaluator {
    fn evaluate(&self, pos: &Position) -> i32 {
        let score = material(pos);
        match pos.side_to_move() {
            Color::White => score,
            Color::Black => -score,
        }
    }
}
