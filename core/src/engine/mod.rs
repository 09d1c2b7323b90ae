//! The undo engine: execute pipeline, batch recorder, undo coordinator and
//! lifecycle control.
//!
//! The engine is a cheap-to-clone handle around shared state. All locks are
//! narrowly scoped and never held across an await; ordering guarantees come
//! from *when* things happen (stack commit strictly after settlement, one
//! undo at a time), not from holding locks through suspension points.

mod batch;
mod pipeline;
mod types;
mod undo;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::EngineError;
use crate::registry::{CommandDef, Registry};

pub use batch::PendingResult;
pub use types::{StackEntry, UndoOutcome};

use types::{HistoryState, UndoState};

/// Command-pattern execution engine with transactional undo.
///
/// `C` is the application context handed to execute/cache callables, `V` the
/// value type for parameters, return values and cached pre-state. The
/// defaults give a dynamically-typed engine over [`serde_json::Value`].
///
/// Cloning the engine clones a handle; all clones share one registry,
/// history and undo queue. `record_batch` and queued-undo draining spawn
/// tasks, so the engine must live inside a tokio runtime.
pub struct UndoEngine<C = (), V = Value> {
    inner: Arc<EngineInner<C, V>>,
}

struct EngineInner<C, V> {
    registry: RwLock<Registry<C, V>>,
    history: Mutex<HistoryState<V>>,
    undo_state: Mutex<UndoState<V>>,
    /// Completion signals for cache steps still in flight, keyed by
    /// invocation id. Consumed by `reset()`.
    pending_caches: Mutex<HashMap<u64, oneshot::Receiver<()>>>,
    next_id: AtomicU64,
    aborting: AtomicBool,
    stack_limit: AtomicUsize,
}

impl<C, V> Clone for UndoEngine<C, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C, V> UndoEngine<C, V>
where
    C: Send + Sync + 'static,
    V: Clone + fmt::Debug + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EngineInner {
                registry: RwLock::new(Registry::new()),
                history: Mutex::new(HistoryState::new()),
                undo_state: Mutex::new(UndoState::new()),
                pending_caches: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                aborting: AtomicBool::new(false),
                stack_limit: AtomicUsize::new(0),
            }),
        }
    }

    /// Register a command definition. See [`CommandDef`] for the contract;
    /// fails with [`EngineError::Validation`] on incomplete definitions or
    /// duplicate names.
    pub fn register(&self, def: CommandDef<C, V>) -> Result<(), EngineError> {
        self.inner.registry.write().unwrap().register(def)
    }

    /// Registered command names, sorted.
    pub fn command_names(&self) -> Vec<String> {
        self.inner.registry.read().unwrap().names()
    }

    /// Read-only snapshot of the history stack, oldest first.
    pub fn history(&self) -> Vec<StackEntry<V>> {
        self.inner
            .history
            .lock()
            .unwrap()
            .stack
            .iter()
            .cloned()
            .collect()
    }

    pub fn stack_len(&self) -> usize {
        self.inner.history.lock().unwrap().stack.len()
    }

    /// Batch membership records, oldest batch first.
    pub fn batches(&self) -> Vec<Vec<u64>> {
        self.inner.history.lock().unwrap().batches.clone()
    }

    /// Number of undo requests waiting for the in-flight undo to finish.
    pub fn pending_undos(&self) -> usize {
        self.inner.undo_state.lock().unwrap().queue.len()
    }

    pub fn is_undoing(&self) -> bool {
        self.inner.undo_state.lock().unwrap().undoing
    }

    /// Cap the history stack; once full, the oldest entry is evicted at
    /// commit time. `0` (the default) means unlimited.
    pub fn set_stack_limit(&self, limit: usize) {
        self.inner.stack_limit.store(limit, Ordering::Relaxed);
    }

    pub fn stack_limit(&self) -> usize {
        self.inner.stack_limit.load(Ordering::Relaxed)
    }

    /// Clear execution data but keep command definitions.
    ///
    /// Raises the abort flag so invocations still in their cache step
    /// short-circuit instead of executing, clears the stack, batches and
    /// pending undo queue, then awaits every outstanding cache operation and
    /// the in-flight undo so nothing leaks into the next session. Failures
    /// in the awaited operations are swallowed; the engine always ends up
    /// clean and reusable.
    pub async fn reset(&self) {
        self.inner.aborting.store(true, Ordering::SeqCst);
        tracing::debug!("resetting engine");

        {
            let mut history = self.inner.history.lock().unwrap();
            history.stack.clear();
            history.batches.clear();
        }
        let in_flight = {
            let mut state = self.inner.undo_state.lock().unwrap();
            state.queue.clear();
            state.undoing = false;
            state.in_flight.take()
        };
        let caches: Vec<oneshot::Receiver<()>> = {
            let mut pending = self.inner.pending_caches.lock().unwrap();
            pending.drain().map(|(_, rx)| rx).collect()
        };

        let _ = futures::future::join_all(caches).await;
        if let Some(undo_done) = in_flight {
            let _ = undo_done.await;
        }

        self.inner.pending_caches.lock().unwrap().clear();
        self.inner.aborting.store(false, Ordering::SeqCst);
        tracing::debug!("reset complete");
    }

    /// `reset()`, then drop every registered command.
    pub async fn destroy(&self) {
        self.reset().await;
        self.inner.registry.write().unwrap().clear();
        tracing::debug!("engine destroyed");
    }
}

impl<C, V> Default for UndoEngine<C, V>
where
    C: Send + Sync + 'static,
    V: Clone + fmt::Debug + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
