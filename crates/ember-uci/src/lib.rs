//! UCI protocol handling for ember.

pub mod command;
pub mod engine;
pub mod error;

pub use command::{Command, UciOption, parse_command};
pub use engine::{EngineConfig, UciEngine};
pub use error::UciError;
