//! Chess move representation, bit-packed into a u16.

use std::fmt;

use chess::{ALL_SQUARES, Board, ChessMove, Piece, Square};

const SRC_MASK: u16 = 0x003F;
const DST_MASK: u16 = 0x0FC0;
const FLAG_MASK: u16 = 0xF000;
const DST_SHIFT: u32 = 6;
const FLAG_SHIFT: u32 = 12;

/// Bit set on every capturing flag (captures, en passant, promotion-captures).
const CAPTURE_BIT: u8 = 0b0100;
/// Bit set on every promoting flag.
const PROMOTION_BIT: u8 = 0b1000;

/// What kind of move a [`Move`] is.
///
/// The discriminants are the 4-bit flag stored in the upper nibble of the
/// packed move. Bit 2 marks captures, bit 3 marks promotions, and the low two
/// bits of a promotion select the piece (knight, bishop, rook, queen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MoveFlag {
    Quiet = 0,
    DoublePawnPush = 1,
    CastleKingside = 2,
    CastleQueenside = 3,
    Capture = 4,
    EnPassant = 5,
    PromoteKnight = 8,
    PromoteBishop = 9,
    PromoteRook = 10,
    PromoteQueen = 11,
    PromoteCaptureKnight = 12,
    PromoteCaptureBishop = 13,
    PromoteCaptureRook = 14,
    PromoteCaptureQueen = 15,
}

impl MoveFlag {
    /// Decode a 4-bit flag. The two unused patterns decode as [`MoveFlag::Quiet`].
    const fn from_bits(bits: u8) -> MoveFlag {
        match bits & 0x0F {
            1 => MoveFlag::DoublePawnPush,
            2 => MoveFlag::CastleKingside,
            3 => MoveFlag::CastleQueenside,
            4 => MoveFlag::Capture,
            5 => MoveFlag::EnPassant,
            8 => MoveFlag::PromoteKnight,
            9 => MoveFlag::PromoteBishop,
            10 => MoveFlag::PromoteRook,
            11 => MoveFlag::PromoteQueen,
            12 => MoveFlag::PromoteCaptureKnight,
            13 => MoveFlag::PromoteCaptureBishop,
            14 => MoveFlag::PromoteCaptureRook,
            15 => MoveFlag::PromoteCaptureQueen,
            _ => MoveFlag::Quiet,
        }
    }

    /// Flag for a promotion to `piece`, capturing or not.
    ///
    /// Non-promotable pieces fall back to a queen promotion.
    pub const fn promotion(piece: Piece, capture: bool) -> MoveFlag {
        let base = match piece {
            Piece::Knight => 8,
            Piece::Bishop => 9,
            Piece::Rook => 10,
            _ => 11,
        };
        MoveFlag::from_bits(if capture { base | CAPTURE_BIT } else { base })
    }

    /// Return `true` for captures, en passant and promotion-captures.
    pub const fn is_capture(self) -> bool {
        (self as u8) & CAPTURE_BIT != 0
    }

    /// Return `true` for promotions and promotion-captures.
    pub const fn is_promotion(self) -> bool {
        (self as u8) & PROMOTION_BIT != 0
    }
}

/// A chess move encoded in 16 bits.
///
/// ```text
/// bits  0-5:  origin square      (0-63)
/// bits  6-11: destination square (0-63)
/// bits 12-15: flag               (see MoveFlag)
/// ```
///
/// Equality compares all three fields. Moves carry no intrinsic order; the
/// search assigns one when it orders moves.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move(u16);

impl Move {
    /// Null move sentinel (A1→A1, quiet). Never a legal move.
    pub const NULL: Move = Move(0);

    /// Create a move from its origin, destination and flag.
    pub fn new(source: Square, dest: Square, flag: MoveFlag) -> Move {
        Move(
            (source.to_index() as u16)
                | ((dest.to_index() as u16) << DST_SHIFT)
                | ((flag as u16) << FLAG_SHIFT),
        )
    }

    /// Classify a [`ChessMove`] played from `board` into a flagged move.
    ///
    /// The board must be the position the move is played from; captures,
    /// castling, en passant and double pushes are inferred from it.
    pub fn from_chess(board: &Board, mv: ChessMove) -> Move {
        let src = mv.get_source();
        let dst = mv.get_dest();
        let mover = board.piece_on(src);
        let captures = board.piece_on(dst).is_some();
        let file_delta = src.get_file().to_index().abs_diff(dst.get_file().to_index());
        let rank_delta = src.get_rank().to_index().abs_diff(dst.get_rank().to_index());

        let flag = if let Some(piece) = mv.get_promotion() {
            MoveFlag::promotion(piece, captures)
        } else if mover == Some(Piece::King) && file_delta == 2 {
            if dst.get_file().to_index() > src.get_file().to_index() {
                MoveFlag::CastleKingside
            } else {
                MoveFlag::CastleQueenside
            }
        } else if mover == Some(Piece::Pawn) && file_delta == 1 && !captures {
            MoveFlag::EnPassant
        } else if mover == Some(Piece::Pawn) && rank_delta == 2 {
            MoveFlag::DoublePawnPush
        } else if captures {
            MoveFlag::Capture
        } else {
            MoveFlag::Quiet
        };

        Move::new(src, dst, flag)
    }

    /// Convert back to the board library's move type.
    pub fn to_chess(self) -> ChessMove {
        ChessMove::new(self.source(), self.dest(), self.promotion_piece())
    }

    /// Extract the origin square.
    pub fn source(self) -> Square {
        ALL_SQUARES[self.source_index()]
    }

    /// Extract the destination square.
    pub fn dest(self) -> Square {
        ALL_SQUARES[self.dest_index()]
    }

    /// Origin square index (0-63), a1 = 0.
    #[inline]
    pub const fn source_index(self) -> usize {
        (self.0 & SRC_MASK) as usize
    }

    /// Destination square index (0-63), a1 = 0.
    #[inline]
    pub const fn dest_index(self) -> usize {
        ((self.0 & DST_MASK) >> DST_SHIFT) as usize
    }

    /// Extract the flag.
    #[inline]
    pub const fn flag(self) -> MoveFlag {
        MoveFlag::from_bits(((self.0 & FLAG_MASK) >> FLAG_SHIFT) as u8)
    }

    /// The promoted-to piece, if this is a promotion.
    pub const fn promotion_piece(self) -> Option<Piece> {
        if !self.is_promotion() {
            return None;
        }
        Some(match (self.0 >> FLAG_SHIFT) & 0x03 {
            0 => Piece::Knight,
            1 => Piece::Bishop,
            2 => Piece::Rook,
            _ => Piece::Queen,
        })
    }

    /// Return `true` if this is the null move sentinel.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Return `true` only for plain quiet moves (not double pushes or castling).
    pub const fn is_quiet(self) -> bool {
        matches!(self.flag(), MoveFlag::Quiet)
    }

    /// Return `true` for captures, en passant and promotion-captures.
    pub const fn is_capture(self) -> bool {
        self.flag().is_capture()
    }

    /// Return `true` for promotions and promotion-captures.
    pub const fn is_promotion(self) -> bool {
        self.flag().is_promotion()
    }

    /// Return `true` for a promotion to anything but a queen.
    pub const fn is_underpromotion(self) -> bool {
        self.is_promotion()
            && !matches!(
                self.flag(),
                MoveFlag::PromoteQueen | MoveFlag::PromoteCaptureQueen
            )
    }

    /// Raw 16-bit encoding, for compact table storage.
    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Rebuild a move from [`Move::raw`] output.
    #[inline]
    pub const fn from_raw(raw: u16) -> Move {
        Move(raw)
    }

    /// Return the coordinate notation (`e2e4`, `e7e8q`).
    ///
    /// # Panics
    ///
    /// Debug-asserts that the move is not null.
    pub fn to_uci(self) -> String {
        debug_assert!(!self.is_null(), "to_uci called on null move");
        self.to_string()
    }
}

fn promotion_char(piece: Piece) -> char {
    match piece {
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        _ => 'q',
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "0000");
        }
        write!(f, "{}{}", self.source(), self.dest())?;
        if let Some(piece) = self.promotion_piece() {
            write!(f, "{}", promotion_char(piece))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move({} flag={:?})", self, self.flag())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::str::FromStr;

    use chess::{Board, ChessMove, Piece, Square};

    use super::{Move, MoveFlag};

    #[test]
    fn size_of_move() {
        assert_eq!(std::mem::size_of::<Move>(), 2);
    }

    #[test]
    fn fields_survive_packing() {
        let mv = Move::new(Square::E2, Square::E4, MoveFlag::DoublePawnPush);
        assert_eq!(mv.source(), Square::E2);
        assert_eq!(mv.dest(), Square::E4);
        assert_eq!(mv.flag(), MoveFlag::DoublePawnPush);
        assert!(!mv.is_quiet());
        assert!(!mv.is_capture());
        assert!(!mv.is_null());
    }

    #[test]
    fn capture_and_promotion_bits() {
        assert!(MoveFlag::Capture.is_capture());
        assert!(MoveFlag::EnPassant.is_capture());
        assert!(MoveFlag::PromoteCaptureRook.is_capture());
        assert!(!MoveFlag::PromoteRook.is_capture());
        assert!(MoveFlag::PromoteRook.is_promotion());
        assert!(!MoveFlag::CastleQueenside.is_promotion());
    }

    #[test]
    fn promotion_flag_selects_piece() {
        for (piece, capture) in [
            (Piece::Knight, false),
            (Piece::Bishop, true),
            (Piece::Rook, false),
            (Piece::Queen, true),
        ] {
            let mv = Move::new(Square::B7, Square::B8, MoveFlag::promotion(piece, capture));
            assert_eq!(mv.promotion_piece(), Some(piece));
            assert_eq!(mv.is_capture(), capture);
            assert_eq!(mv.is_underpromotion(), piece != Piece::Queen);
        }
    }

    #[test]
    fn null_move() {
        assert!(Move::NULL.is_null());
        assert_eq!(Move::NULL.source(), Square::A1);
        assert_eq!(Move::NULL.dest(), Square::A1);
        assert_eq!(format!("{}", Move::NULL), "0000");
    }

    #[test]
    fn uci_strings() {
        assert_eq!(Move::new(Square::G1, Square::F3, MoveFlag::Quiet).to_uci(), "g1f3");
        let promo = Move::new(Square::E7, Square::E8, MoveFlag::PromoteQueen);
        assert_eq!(promo.to_uci(), "e7e8q");
        let under = Move::new(Square::A2, Square::B1, MoveFlag::PromoteCaptureKnight);
        assert_eq!(under.to_uci(), "a2b1n");
    }

    #[test]
    fn equality_includes_flag() {
        let quiet = Move::new(Square::E1, Square::G1, MoveFlag::Quiet);
        let castle = Move::new(Square::E1, Square::G1, MoveFlag::CastleKingside);
        assert_ne!(quiet, castle);

        let mut set = HashSet::new();
        set.insert(castle);
        set.insert(Move::new(Square::E1, Square::G1, MoveFlag::CastleKingside));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn classify_from_board() {
        let board = Board::default();
        let push = Move::from_chess(&board, ChessMove::new(Square::E2, Square::E4, None));
        assert_eq!(push.flag(), MoveFlag::DoublePawnPush);
        let single = Move::from_chess(&board, ChessMove::new(Square::E2, Square::E3, None));
        assert_eq!(single.flag(), MoveFlag::Quiet);

        let board = Board::from_str("4k3/8/8/3pP3/8/8/8/R3K2R w KQ d6 0 1").unwrap();
        let ep = Move::from_chess(&board, ChessMove::new(Square::E5, Square::D6, None));
        assert_eq!(ep.flag(), MoveFlag::EnPassant);
        let short = Move::from_chess(&board, ChessMove::new(Square::E1, Square::G1, None));
        assert_eq!(short.flag(), MoveFlag::CastleKingside);
        let long = Move::from_chess(&board, ChessMove::new(Square::E1, Square::C1, None));
        assert_eq!(long.flag(), MoveFlag::CastleQueenside);
        let rook = Move::from_chess(&board, ChessMove::new(Square::A1, Square::A8, None));
        assert_eq!(rook.flag(), MoveFlag::Quiet);
    }

    #[test]
    fn chess_move_roundtrip_keeps_promotion() {
        let board = Board::from_str("1r2k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let cm = ChessMove::new(Square::A7, Square::B8, Some(Piece::Rook));
        let mv = Move::from_chess(&board, cm);
        assert_eq!(mv.flag(), MoveFlag::PromoteCaptureRook);
        assert_eq!(mv.to_chess(), cm);
    }
}
