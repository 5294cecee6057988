//! Error types for FEN parsing and move parsing.

/// Errors that occur when parsing a FEN string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FenError {
    /// The FEN string does not have 4 or 6 space-separated fields.
    #[error("expected 4 or 6 FEN fields, found {found}")]
    WrongFieldCount {
        /// Number of fields found.
        found: usize,
    },
    /// A move counter (halfmove clock or fullmove number) is not a valid number.
    #[error("invalid {field}: \"{found}\"")]
    InvalidMoveCounter {
        /// The field name ("halfmove clock" or "fullmove number").
        field: &'static str,
        /// The invalid string.
        found: String,
    },
    /// The board library rejected the placement, side, castling or en passant fields.
    #[error("invalid position: \"{fen}\"")]
    InvalidPosition {
        /// The FEN string that was rejected.
        fen: String,
    },
}

/// Errors from turning coordinate notation into a legal move.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    /// The string is not of the form `e2e4` or `e7e8q`.
    #[error("malformed move: \"{uci}\"")]
    Malformed {
        /// The offending string.
        uci: String,
    },
    /// The move is well-formed but not legal in the current position.
    #[error("illegal move: \"{uci}\"")]
    Illegal {
        /// The offending string.
        uci: String,
    },
}
