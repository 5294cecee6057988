//! UCI protocol errors.

use ember_core::{FenError, MoveError};

/// Errors that can occur while handling UCI input.
#[derive(Debug, thiserror::Error)]
pub enum UciError {
    /// The `position` command is missing `startpos` or `fen`.
    #[error("malformed position command: missing startpos or fen keyword")]
    MalformedPosition,

    /// The FEN in a `position fen` command was rejected.
    #[error("invalid FEN \"{fen}\": {source}")]
    InvalidFen {
        fen: String,
        #[source]
        source: FenError,
    },

    /// A move in the `moves` list could not be played.
    #[error("invalid move {uci_move}: {source}")]
    InvalidMove {
        uci_move: String,
        #[source]
        source: MoveError,
    },

    /// A `go` parameter was given without a value.
    #[error("missing value for go parameter {param}")]
    MissingGoValue { param: String },

    /// A `go` parameter value is not a valid number.
    #[error("invalid value for go parameter {param}: {value}")]
    InvalidGoValue { param: String, value: String },

    /// A `setoption` line lacks `name` or `value`.
    #[error("malformed setoption command: {line}")]
    MalformedOption { line: String },

    /// A `setoption` value is out of range or not parseable.
    #[error("invalid value for option {name}: {value}")]
    InvalidOptionValue { name: String, value: String },

    /// Reading stdin failed.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}
