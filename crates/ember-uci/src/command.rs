//! UCI command parsing.

use std::time::Duration;

use ember_core::Position;
use ember_engine::SearchLimits;

use crate::error::UciError;

/// Largest accepted `Hash` value in megabytes.
pub const MAX_HASH_MB: u32 = 65_536;

/// An option set through `setoption`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciOption {
    /// Transposition table size in megabytes.
    Hash(u32),
    /// Whether the GUI may send `go ponder`. Informational only.
    Ponder(bool),
    /// Any option the engine does not know; ignored.
    Unknown(String),
}

/// A parsed UCI command.
#[derive(Debug)]
pub enum Command {
    /// `uci`: identify the engine.
    Uci,
    /// `isready`: synchronization ping.
    IsReady,
    /// `ucinewgame`: reset engine state.
    UciNewGame,
    /// `position`: the position after applying any listed moves.
    Position(Position),
    /// `go`: start searching.
    Go(SearchLimits),
    /// `setoption name <id> [value <x>]`.
    SetOption(UciOption),
    /// `ponderhit`: the opponent played the expected move.
    PonderHit,
    /// `stop`: halt the current search.
    Stop,
    /// `quit`: exit the engine.
    Quit,
    /// Anything else. Ignored.
    Unknown(String),
}

/// Parse a single line of UCI input.
pub fn parse_command(line: &str) -> Result<Command, UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(&head) = tokens.first() else {
        return Ok(Command::Unknown(String::new()));
    };

    match head {
        "uci" => Ok(Command::Uci),
        "isready" => Ok(Command::IsReady),
        "ucinewgame" => Ok(Command::UciNewGame),
        "stop" => Ok(Command::Stop),
        "quit" => Ok(Command::Quit),
        "ponderhit" => Ok(Command::PonderHit),
        "position" => parse_position(&tokens[1..]),
        "go" => parse_go(&tokens[1..]),
        "setoption" => parse_setoption(line, &tokens[1..]),
        _ => Ok(Command::Unknown(head.to_string())),
    }
}

/// `position startpos [moves ...]` or `position fen <fen> [moves ...]`.
///
/// The FEN may carry 4 or 6 fields. Played moves stay in the position's
/// history so repetitions across them are detected.
fn parse_position(tokens: &[&str]) -> Result<Command, UciError> {
    let moves_at = tokens.iter().position(|&t| t == "moves").unwrap_or(tokens.len());
    let (setup, moves) = tokens.split_at(moves_at);

    let mut position = match setup.split_first() {
        Some((&"startpos", [])) => Position::startpos(),
        Some((&"fen", fields)) => {
            let fen = fields.join(" ");
            fen.parse::<Position>()
                .map_err(|source| UciError::InvalidFen { fen, source })?
        }
        _ => return Err(UciError::MalformedPosition),
    };

    for &uci_move in moves.iter().skip(1) {
        let mv = position
            .parse_uci_move(uci_move)
            .map_err(|source| UciError::InvalidMove {
                uci_move: uci_move.to_string(),
                source,
            })?;
        position.push_move(mv);
    }
    position.commit();

    Ok(Command::Position(position))
}

/// `go` arguments. Unknown tokens are skipped.
fn parse_go(tokens: &[&str]) -> Result<Command, UciError> {
    let mut limits = SearchLimits::default();

    let mut i = 0;
    while i < tokens.len() {
        let value = tokens.get(i + 1);
        match tokens[i] {
            "wtime" => limits.wtime = Some(parse_millis(value, "wtime")?),
            "btime" => limits.btime = Some(parse_millis(value, "btime")?),
            "winc" => limits.winc = Some(parse_millis(value, "winc")?),
            "binc" => limits.binc = Some(parse_millis(value, "binc")?),
            "movetime" => limits.movetime = Some(parse_millis(value, "movetime")?),
            "movestogo" => limits.movestogo = Some(parse_int(value, "movestogo")?),
            "depth" => limits.depth = Some(parse_int(value, "depth")?),
            "nodes" => limits.nodes = Some(parse_int(value, "nodes")?),
            "infinite" => {
                limits.infinite = true;
                i += 1;
                continue;
            }
            "ponder" => {
                limits.ponder = true;
                i += 1;
                continue;
            }
            _ => {
                i += 1;
                continue;
            }
        }
        i += 2;
    }

    Ok(Command::Go(limits))
}

/// Clock values may be negative when a GUI is late; they clamp to zero.
fn parse_millis(token: Option<&&str>, param: &str) -> Result<Duration, UciError> {
    let ms: i64 = parse_int(token, param)?;
    Ok(Duration::from_millis(ms.max(0) as u64))
}

fn parse_int<T: std::str::FromStr>(token: Option<&&str>, param: &str) -> Result<T, UciError> {
    let value = token.ok_or_else(|| UciError::MissingGoValue {
        param: param.to_string(),
    })?;
    value.parse().map_err(|_| UciError::InvalidGoValue {
        param: param.to_string(),
        value: value.to_string(),
    })
}

/// `setoption name <id> [value <x>]`. Option names may contain spaces.
fn parse_setoption(line: &str, tokens: &[&str]) -> Result<Command, UciError> {
    let malformed = || UciError::MalformedOption {
        line: line.trim().to_string(),
    };
    if tokens.first() != Some(&"name") {
        return Err(malformed());
    }
    let value_at = tokens.iter().position(|&t| t == "value").unwrap_or(tokens.len());
    let name = tokens[1..value_at].join(" ");
    if name.is_empty() {
        return Err(malformed());
    }
    let value = tokens.get(value_at + 1..).map(|rest| rest.join(" ")).unwrap_or_default();

    let invalid = || UciError::InvalidOptionValue {
        name: name.clone(),
        value: value.clone(),
    };
    let option = match name.to_ascii_lowercase().as_str() {
        "hash" => {
            let mb: u32 = value.parse().map_err(|_| invalid())?;
            if !(1..=MAX_HASH_MB).contains(&mb) {
                return Err(invalid());
            }
            UciOption::Hash(mb)
        }
        "ponder" => UciOption::Ponder(value.parse().map_err(|_| invalid())?),
        _ => UciOption::Unknown(name.clone()),
    };

    Ok(Command::SetOption(option))
}
