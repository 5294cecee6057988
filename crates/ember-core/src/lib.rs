//! Core chess types: move token, move list, and a mutable position with make/unmake.
//!
//! Board representation and legal move generation come from the `chess` crate.

mod chess_move;
mod error;
mod fen;
mod move_list;
mod position;

pub use chess::{Board, Color, Piece, Square};
pub use chess_move::{Move, MoveFlag};
pub use error::{FenError, MoveError};
pub use fen::STARTING_FEN;
pub use move_list::MoveList;
pub use position::{MoveGuard, Position};
