pub mod engine;

pub use engine::{CommandError, EngineError, UndoError};
