//! Event-driven UCI engine with pondering support.

use std::io::{self, BufRead, Write};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, mpsc};
use std::thread;

use tracing::{debug, info, warn};

use ember_core::Position;
use ember_engine::search::{DEFAULT_HASH_MB, MAX_DEPTH};
use ember_engine::{
    MATE_SCORE, SearchControl, SearchInfo, SearchLimits, SearchResult, Searcher, control_from_limits,
    is_mate_score,
};

use crate::command::{Command, MAX_HASH_MB, UciOption, parse_command};
use crate::error::UciError;

/// Settings adjustable through `setoption`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Transposition table size in megabytes.
    pub hash_mb: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hash_mb: DEFAULT_HASH_MB as u32,
        }
    }
}

enum EngineState {
    Idle,
    Searching,
    Pondering,
}

enum EngineEvent {
    UciCommand(Result<Command, UciError>),
    SearchDone(SearchDone),
    InputFailed(io::Error),
    InputClosed,
}

/// Handed back by the search thread: the result and the searcher it borrowed.
struct SearchDone {
    result: SearchResult,
    searcher: Searcher,
}

/// The UCI front end.
///
/// The main thread processes commands; each `go` moves the [`Searcher`] to a
/// worker thread, which sends it back with the result when done.
pub struct UciEngine {
    position: Position,
    searcher: Option<Searcher>,
    state: EngineState,
    control: Option<Arc<SearchControl>>,
    config: EngineConfig,
    pending_new_game: bool,
    pending_resize_tt: Option<u32>,
}

impl UciEngine {
    /// Create an engine set to the starting position.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with explicit settings.
    pub fn with_config(config: EngineConfig) -> Self {
        let mut searcher = Searcher::new();
        if config.hash_mb as usize != DEFAULT_HASH_MB {
            searcher.resize_tt(config.hash_mb as usize);
        }
        Self {
            position: Position::startpos(),
            searcher: Some(searcher),
            state: EngineState::Idle,
            control: None,
            config,
            pending_new_game: false,
            pending_resize_tt: None,
        }
    }

    /// Current settings.
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Read stdin until `quit` or end of input.
    pub fn run(mut self) -> Result<(), UciError> {
        let (tx, rx) = mpsc::channel::<EngineEvent>();

        let stdin_tx = tx.clone();
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let event = match line {
                    Ok(line) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        debug!(cmd = %trimmed, "received UCI command");
                        EngineEvent::UciCommand(parse_command(trimmed))
                    }
                    Err(err) => EngineEvent::InputFailed(err),
                };
                let failed = matches!(event, EngineEvent::InputFailed(_));
                if stdin_tx.send(event).is_err() || failed {
                    return;
                }
            }
            let _ = stdin_tx.send(EngineEvent::InputClosed);
        });

        let mut outcome = Ok(());
        while let Ok(event) = rx.recv() {
            match event {
                EngineEvent::UciCommand(Ok(Command::Quit)) => break,
                EngineEvent::UciCommand(Ok(cmd)) => self.handle_command(cmd, &tx),
                EngineEvent::UciCommand(Err(err)) => warn!(error = %err, "UCI parse error"),
                EngineEvent::SearchDone(done) => self.finish_search(done),
                EngineEvent::InputFailed(err) => {
                    outcome = Err(UciError::from(err));
                    break;
                }
                EngineEvent::InputClosed => break,
            }
        }

        // Let a running search finish so its bestmove is not lost.
        if !matches!(self.state, EngineState::Idle) {
            self.handle_stop();
            for event in &rx {
                if let EngineEvent::SearchDone(done) = event {
                    self.finish_search(done);
                    break;
                }
            }
        }

        info!("ember shutting down");
        outcome
    }

    fn handle_command(&mut self, cmd: Command, tx: &mpsc::Sender<EngineEvent>) {
        match cmd {
            Command::Uci => self.handle_uci(),
            Command::IsReady => send("readyok"),
            Command::UciNewGame => self.handle_ucinewgame(),
            Command::Position(position) => self.handle_position(position),
            Command::Go(limits) => self.handle_go(limits, tx),
            Command::SetOption(option) => self.handle_setoption(option),
            Command::PonderHit => self.handle_ponderhit(),
            Command::Stop => self.handle_stop(),
            Command::Quit | Command::Unknown(_) => {}
        }
    }

    fn handle_uci(&self) {
        send("id name ember");
        send("id author the ember developers");
        send(&format!(
            "option name Hash type spin default {DEFAULT_HASH_MB} min 1 max {MAX_HASH_MB}"
        ));
        send("option name Ponder type check default false");
        send("uciok");
    }

    fn handle_ucinewgame(&mut self) {
        self.position = Position::startpos();
        match self.searcher {
            Some(ref mut searcher) => searcher.new_game(),
            None => self.pending_new_game = true,
        }
    }

    fn handle_position(&mut self, position: Position) {
        if !matches!(self.state, EngineState::Idle) {
            warn!("position received during search, applies to the next go");
        }
        self.position = position;
    }

    fn handle_setoption(&mut self, option: UciOption) {
        match option {
            UciOption::Hash(mb) => {
                self.config.hash_mb = mb;
                match self.searcher {
                    Some(ref mut searcher) => searcher.resize_tt(mb as usize),
                    None => self.pending_resize_tt = Some(mb),
                }
            }
            UciOption::Ponder(_) => {}
            UciOption::Unknown(name) => debug!(%name, "ignoring unknown option"),
        }
    }

    fn handle_go(&mut self, limits: SearchLimits, tx: &mpsc::Sender<EngineEvent>) {
        if !matches!(self.state, EngineState::Idle) {
            warn!("go received while searching, ignoring");
            return;
        }
        let Some(mut searcher) = self.searcher.take() else {
            warn!("searcher unavailable, ignoring go");
            return;
        };

        let stop_flag = Arc::new(AtomicBool::new(false));
        let control = Arc::new(control_from_limits(&limits, self.position.side_to_move(), stop_flag));
        let max_depth = limits.depth.unwrap_or(MAX_DEPTH);
        debug!(?limits, max_depth, "starting search");

        let mut position = self.position.clone();
        let search_control = Arc::clone(&control);
        let tx = tx.clone();

        thread::spawn(move || {
            let result = searcher.search(&mut position, max_depth, &search_control, |info| {
                send(&format_info(info));
            });
            // An infinite or ponder search may not answer before stop/ponderhit.
            search_control.wait_for_stop();
            let _ = tx.send(EngineEvent::SearchDone(SearchDone { result, searcher }));
        });

        self.state = if limits.ponder {
            EngineState::Pondering
        } else {
            EngineState::Searching
        };
        self.control = Some(control);
    }

    fn handle_ponderhit(&mut self) {
        if !matches!(self.state, EngineState::Pondering) {
            warn!("ponderhit received while not pondering, ignoring");
            return;
        }
        if let Some(ref control) = self.control {
            control.activate();
        }
        self.state = EngineState::Searching;
    }

    fn handle_stop(&mut self) {
        if let Some(ref control) = self.control {
            control.request_stop();
        }
    }

    fn finish_search(&mut self, done: SearchDone) {
        let mut searcher = done.searcher;

        if let Some(mb) = self.pending_resize_tt.take() {
            searcher.resize_tt(mb as usize);
        }
        if self.pending_new_game {
            searcher.new_game();
            self.pending_new_game = false;
        }

        self.searcher = Some(searcher);
        self.control = None;
        self.state = EngineState::Idle;

        send(&format_bestmove(&done.result));
    }
}

impl Default for UciEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Write one protocol line to stdout and flush.
fn send(line: &str) {
    let mut out = io::stdout().lock();
    if writeln!(out, "{line}").and_then(|()| out.flush()).is_err() {
        warn!(%line, "failed to write to stdout");
    }
}

/// Render a score as `cp <n>` or `mate <moves>` (negative when being mated).
pub fn format_score(score: i32) -> String {
    if !is_mate_score(score) {
        return format!("cp {score}");
    }
    let plies = MATE_SCORE - score.abs();
    let moves = (plies + 1) / 2;
    if score > 0 {
        format!("mate {moves}")
    } else {
        format!("mate -{moves}")
    }
}

/// Render an accepted iteration as an `info` line.
pub fn format_info(info: &SearchInfo) -> String {
    let pv: Vec<String> = info.pv.iter().map(|mv| mv.to_uci()).collect();
    format!(
        "info depth {} seldepth {} time {} score {} nodes {} nps {} pv {}",
        info.depth,
        info.sel_depth,
        info.elapsed.as_millis(),
        format_score(info.score),
        info.nodes,
        info.nps,
        pv.join(" ")
    )
}

/// Render the final answer, with a ponder move when the line has one.
pub fn format_bestmove(result: &SearchResult) -> String {
    match result.ponder_move {
        Some(ponder) if !result.best_move.is_null() => {
            format!("bestmove {} ponder {}", result.best_move, ponder)
        }
        _ => format!("bestmove {}", result.best_move),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ember_core::{Move, Position};
    use ember_engine::{MATE_SCORE, SearchInfo, SearchResult};

    use super::{EngineConfig, UciEngine, format_bestmove, format_info, format_score};

    fn moves(pos: &Position, line: &[&str]) -> Vec<Move> {
        let mut pos = pos.clone();
        line.iter()
            .map(|uci| {
                let mv = pos.parse_uci_move(uci).unwrap();
                pos.push_move(mv);
                mv
            })
            .collect()
    }

    #[test]
    fn centipawn_and_mate_scores() {
        assert_eq!(format_score(35), "cp 35");
        assert_eq!(format_score(-120), "cp -120");
        assert_eq!(format_score(MATE_SCORE - 1), "mate 1");
        assert_eq!(format_score(MATE_SCORE - 3), "mate 2");
        assert_eq!(format_score(-(MATE_SCORE - 2)), "mate -1");
        assert_eq!(format_score(-(MATE_SCORE - 4)), "mate -2");
    }

    #[test]
    fn info_line_layout() {
        let pv = moves(&Position::startpos(), &["e2e4", "e7e5"]);
        let info = SearchInfo {
            depth: 5,
            sel_depth: 9,
            elapsed: Duration::from_millis(120),
            score: 18,
            nodes: 4_000,
            nps: 33_333,
            best_move: pv[0],
            pv,
        };
        assert_eq!(
            format_info(&info),
            "info depth 5 seldepth 9 time 120 score cp 18 nodes 4000 nps 33333 pv e2e4 e7e5"
        );
    }

    #[test]
    fn bestmove_with_and_without_ponder() {
        let line = moves(&Position::startpos(), &["g1f3", "d7d5"]);
        let mut result = SearchResult {
            best_move: line[0],
            ponder_move: Some(line[1]),
            pv: line.clone(),
            score: 0,
            nodes: 10,
            depth: 2,
        };
        assert_eq!(format_bestmove(&result), "bestmove g1f3 ponder d7d5");

        result.ponder_move = None;
        assert_eq!(format_bestmove(&result), "bestmove g1f3");

        result.best_move = Move::NULL;
        assert_eq!(format_bestmove(&result), "bestmove 0000");
    }

    #[test]
    fn config_defaults_and_override() {
        assert_eq!(UciEngine::new().config(), EngineConfig { hash_mb: 16 });
        assert_eq!(UciEngine::with_config(EngineConfig { hash_mb: 4 }).config().hash_mb, 4);
    }
}
