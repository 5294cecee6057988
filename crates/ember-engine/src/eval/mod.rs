//! Static evaluation.
//!
//! The search consumes evaluation through the [`Evaluator`] trait so that the
//! scoring function can be swapped without touching the tree walk.

pub mod material;

use ember_core::Position;

pub use material::MaterialEvaluator;

/// A static scoring function.
pub trait Evaluator: Send {
    /// Score `pos` in centipawns from the side to move's point of view.
    fn evaluate(&self, pos: &Position) -> i32;
}
