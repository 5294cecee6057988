//! Search and evaluation for ember.

pub mod eval;
pub mod search;
pub mod time;

pub use eval::{Evaluator, MaterialEvaluator};
pub use search::control::SearchControl;
pub use search::negamax::{INF, MATE_SCORE, MATE_THRESHOLD, SearchStats, is_mate_score};
pub use search::{SearchInfo, SearchResult, Searcher};
pub use time::{SearchLimits, allocate_time, control_from_limits};
