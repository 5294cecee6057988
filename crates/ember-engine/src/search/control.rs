//! Search control: stop flag, time budget and node limit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// How often (in nodes) the clock is consulted.
const CLOCK_CHECK_INTERVAL: u64 = 2048;

/// Decides when a running search must stop.
///
/// Modes:
/// - **Infinite**: runs until the external stop flag is raised.
/// - **Timed**: clock starts immediately with a fixed budget.
/// - **Ponder**: budget known but clock idle until [`activate()`](SearchControl::activate).
///
/// A node limit may be layered on top of any mode.
pub struct SearchControl {
    stopped: Arc<AtomicBool>,
    clock_active: AtomicBool,
    start: Mutex<Option<Instant>>,
    budget: Option<Duration>,
    node_limit: Option<u64>,
    unbounded: AtomicBool,
}

impl SearchControl {
    fn build(stopped: Arc<AtomicBool>, started: bool, budget: Option<Duration>, unbounded: bool) -> Self {
        Self {
            stopped,
            clock_active: AtomicBool::new(started),
            start: Mutex::new(if started { Some(Instant::now()) } else { None }),
            budget,
            node_limit: None,
            unbounded: AtomicBool::new(unbounded),
        }
    }

    /// `go infinite`: no budget, iterates past the depth limit until stopped.
    pub fn new_infinite(stopped: Arc<AtomicBool>) -> Self {
        Self::build(stopped, true, None, true)
    }

    /// No budget, but bounded by the requested depth (`go depth N`, bare `go`).
    pub fn new_depth_only(stopped: Arc<AtomicBool>) -> Self {
        Self::build(stopped, true, None, false)
    }

    /// Fixed budget; the clock starts now.
    pub fn new_timed(stopped: Arc<AtomicBool>, budget: Duration) -> Self {
        Self::build(stopped, true, Some(budget), false)
    }

    /// Pondering: the budget applies only after [`activate()`](Self::activate).
    ///
    /// Until then the search is unbounded in depth.
    pub fn new_ponder(stopped: Arc<AtomicBool>, budget: Option<Duration>) -> Self {
        Self::build(stopped, false, budget, true)
    }

    /// Add a node limit.
    pub fn with_node_limit(mut self, nodes: u64) -> Self {
        self.node_limit = Some(nodes);
        self
    }

    /// Start the clock and leave unbounded mode (`ponderhit`).
    pub fn activate(&self) {
        *self.start.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        self.clock_active.store(true, Ordering::Release);
        if self.budget.is_some() {
            self.unbounded.store(false, Ordering::Release);
        }
    }

    /// Return `true` if the search must abort now.
    ///
    /// Checks the stop flag every call, the node limit every call, and the
    /// clock every [`CLOCK_CHECK_INTERVAL`] nodes. A firing limit raises the
    /// stop flag so later calls return immediately.
    pub fn exhausted(&self, nodes: u64) -> bool {
        if self.stopped.load(Ordering::Relaxed) {
            return true;
        }

        if let Some(limit) = self.node_limit
            && nodes >= limit
        {
            self.request_stop();
            return true;
        }

        if nodes % CLOCK_CHECK_INTERVAL != 0 || !self.clock_active.load(Ordering::Acquire) {
            return false;
        }

        if let Some(budget) = self.budget
            && self.elapsed() >= budget
        {
            self.request_stop();
            return true;
        }

        false
    }

    /// Return `true` if iterative deepening should not start another pass:
    /// the stop flag is set or half the budget is gone.
    pub fn should_stop_iterating(&self) -> bool {
        if self.stopped.load(Ordering::Relaxed) {
            return true;
        }
        if !self.clock_active.load(Ordering::Acquire) {
            return false;
        }
        match self.budget {
            Some(budget) => self.elapsed() >= budget / 2,
            None => false,
        }
    }

    /// Return `true` while the depth limit should be ignored (infinite or unconverted ponder).
    pub fn is_unbounded(&self) -> bool {
        self.unbounded.load(Ordering::Acquire)
    }

    /// Raise the stop flag.
    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Return `true` once the stop flag is raised.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    /// Time since the clock started, or zero if it has not.
    pub fn elapsed(&self) -> Duration {
        self.start
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map_or(Duration::ZERO, |s| s.elapsed())
    }

    /// Block until the stop flag is raised.
    ///
    /// Used after an infinite or ponder search finishes early, since the
    /// protocol forbids `bestmove` before `stop` or `ponderhit`.
    pub fn wait_for_stop(&self) {
        while !self.is_stopped() && self.is_unbounded() {
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl std::fmt::Debug for SearchControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchControl")
            .field("stopped", &self.is_stopped())
            .field("budget", &self.budget)
            .field("node_limit", &self.node_limit)
            .field("unbounded", &self.is_unbounded())
            .finish()
    }
}
