//! Transactional undo for concurrent command execution.
//!
//! Commands are registered once with an execute callable, an undo callable
//! and an optional cache (pre-state capture) step, then invoked by name.
//! Invocations may be synchronous or asynchronous and may race freely; the
//! engine records them on its history stack in the order they actually
//! *complete*, undoes them in exact reverse of that order, serializes
//! concurrent undo requests through a FIFO queue, and can be reset or
//! destroyed without leaking in-flight operations into the next session.
//!
//! ```no_run
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use std::sync::Arc;
//! use rewind_core::{CommandDef, Params, UndoEngine};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let engine: UndoEngine<(), i64> = UndoEngine::new();
//! let value = Arc::new(AtomicI64::new(0));
//!
//! let v = value.clone();
//! let u = value.clone();
//! engine.register(
//!     CommandDef::new("add3")
//!         .execute(move |_ctx, _params| {
//!             let v = v.clone();
//!             async move { Ok(v.fetch_add(3, Ordering::SeqCst) + 3) }
//!         })
//!         .undo(move |_params, _returned, _cached| {
//!             let u = u.clone();
//!             async move { Ok(u.fetch_sub(3, Ordering::SeqCst) - 3) }
//!         }),
//! )?;
//!
//! engine.execute("add3", Params::none()).await?;
//! engine.undo().await?;
//! assert_eq!(value.load(Ordering::SeqCst), 0);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod registry;

pub use engine::{PendingResult, StackEntry, UndoEngine, UndoOutcome};
pub use error::{CommandError, EngineError, UndoError};
pub use registry::{BatchCommand, CommandCall, CommandDef, Params};
