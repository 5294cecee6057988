//! FEN and coordinate-notation parsing for [`Position`].

use std::str::FromStr;

use chess::Board;

use crate::chess_move::Move;
use crate::error::{FenError, MoveError};
use crate::position::Position;

/// The FEN string for the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl FromStr for Position {
    type Err = FenError;

    /// Parse a FEN string. The halfmove clock and fullmove number may be omitted.
    fn from_str(fen: &str) -> Result<Position, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 4 && fields.len() != 6 {
            return Err(FenError::WrongFieldCount {
                found: fields.len(),
            });
        }

        let rule50 = match fields.get(4) {
            Some(clock) => clock.parse::<u16>().map_err(|_| FenError::InvalidMoveCounter {
                field: "halfmove clock",
                found: clock.to_string(),
            })?,
            None => 0,
        };
        if let Some(fullmove) = fields.get(5) {
            fullmove
                .parse::<u32>()
                .map_err(|_| FenError::InvalidMoveCounter {
                    field: "fullmove number",
                    found: fullmove.to_string(),
                })?;
        }

        // The board parser splits on single spaces and ignores the counters.
        let normalized = fields[..4].join(" ");
        let board = Board::from_str(&normalized).map_err(|_| FenError::InvalidPosition {
            fen: fen.to_string(),
        })?;

        Ok(Position::from_board(board, rule50))
    }
}

impl Position {
    /// Resolve coordinate notation (`e2e4`, `e7e8q`) to a legal move.
    pub fn parse_uci_move(&self, uci: &str) -> Result<Move, MoveError> {
        let well_formed = matches!(uci.len(), 4 | 5)
            && uci.is_ascii()
            && is_square(&uci[0..2])
            && is_square(&uci[2..4])
            && uci[4..].chars().all(|c| matches!(c, 'n' | 'b' | 'r' | 'q'));
        if !well_formed {
            return Err(MoveError::Malformed {
                uci: uci.to_string(),
            });
        }

        self.generate_legal_moves()
            .iter()
            .find(|mv| mv.to_uci() == uci)
            .ok_or_else(|| MoveError::Illegal {
                uci: uci.to_string(),
            })
    }
}

fn is_square(s: &str) -> bool {
    let bytes = s.as_bytes();
    (b'a'..=b'h').contains(&bytes[0]) && (b'1'..=b'8').contains(&bytes[1])
}

#[cfg(test)]
mod tests {
    use chess::{Color, Piece, Square};

    use super::STARTING_FEN;
    use crate::error::{FenError, MoveError};
    use crate::position::Position;

    #[test]
    fn starting_fen_matches_startpos() {
        let pos: Position = STARTING_FEN.parse().unwrap();
        assert_eq!(pos.fingerprint(), Position::startpos().fingerprint());
    }

    #[test]
    fn four_field_fen() {
        let pos: Position = "4k3/8/8/8/8/8/8/R3K3 b - -".parse().unwrap();
        assert_eq!(pos.side_to_move(), Color::Black);
        assert_eq!(pos.rule50(), 0);
        assert_eq!(pos.piece_type_at(Square::A1.to_index()), Some(Piece::Rook));
    }

    #[test]
    fn halfmove_clock_is_kept() {
        let pos: Position = "4k3/8/8/8/8/8/8/R3K3 w - - 37 60".parse().unwrap();
        assert_eq!(pos.rule50(), 37);
    }

    #[test]
    fn extra_whitespace_is_tolerated() {
        let pos: Position = "  4k3/8/8/8/8/8/8/R3K3   w  -  -  0  1 ".parse().unwrap();
        assert_eq!(pos.side_to_move(), Color::White);
    }

    #[test]
    fn wrong_field_count() {
        let err = "4k3/8/8/8/8/8/8/R3K3 w -".parse::<Position>().unwrap_err();
        assert_eq!(err, FenError::WrongFieldCount { found: 3 });
        let err = "4k3/8/8/8/8/8/8/R3K3 w - - 0".parse::<Position>().unwrap_err();
        assert_eq!(err, FenError::WrongFieldCount { found: 5 });
    }

    #[test]
    fn bad_counter() {
        let err = "4k3/8/8/8/8/8/8/R3K3 w - - x 1".parse::<Position>().unwrap_err();
        assert!(matches!(err, FenError::InvalidMoveCounter { field: "halfmove clock", .. }));
    }

    #[test]
    fn bad_placement() {
        let err = "4k3/8/8/8/8/8/8/R3K3X w - - 0 1".parse::<Position>().unwrap_err();
        assert!(matches!(err, FenError::InvalidPosition { .. }));
    }

    #[test]
    fn parse_legal_and_illegal_moves() {
        let pos = Position::startpos();
        let mv = pos.parse_uci_move("e2e4").unwrap();
        assert_eq!(mv.to_uci(), "e2e4");
        assert!(matches!(pos.parse_uci_move("e2e5"), Err(MoveError::Illegal { .. })));
        assert!(matches!(pos.parse_uci_move("e2"), Err(MoveError::Malformed { .. })));
        assert!(matches!(pos.parse_uci_move("i2i4"), Err(MoveError::Malformed { .. })));
    }

    #[test]
    fn parse_promotion() {
        let pos: Position = "1r2k3/P7/8/8/8/8/8/4K3 w - - 0 1".parse().unwrap();
        let mv = pos.parse_uci_move("a7b8n").unwrap();
        assert!(mv.is_capture());
        assert!(mv.is_underpromotion());
        assert_eq!(mv.promotion_piece(), Some(Piece::Knight));
    }
}
