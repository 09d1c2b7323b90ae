//! History and undo-coordination state.

use std::collections::VecDeque;

use tokio::sync::oneshot;

use crate::error::UndoError;

/// A committed invocation. Entries are appended only after the invocation's
/// cache+execute phase has fully settled, so stack order is true completion
/// order, never call order.
#[derive(Clone, Debug)]
pub struct StackEntry<V> {
    /// Monotonic invocation id, assigned at call time, never reused.
    pub id: u64,
    /// Registry index of the command that produced this entry.
    pub command: usize,
    /// Normalized parameter list the command was invoked with.
    pub params: Vec<V>,
    /// Value returned by execute.
    pub returned: V,
    /// Pre-state captured by the cache callable, if the command has one.
    pub cached: Option<V>,
}

/// What a completed `undo()` call produced.
#[derive(Debug)]
pub enum UndoOutcome<V> {
    /// Nothing left to undo; the request had no effect.
    Noop,
    /// One entry undone; carries the undo callable's return value.
    Single(V),
    /// A whole batch undone; member results in pop order
    /// (last-completed-first).
    Batch(Vec<V>),
}

impl<V> UndoOutcome<V> {
    pub fn is_noop(&self) -> bool {
        matches!(self, UndoOutcome::Noop)
    }
}

pub(crate) type UndoReply<V> = Result<UndoOutcome<V>, UndoError<V>>;

/// Stack and batch records. Mutated only by the execute pipeline (append)
/// and the undo coordinator (pop), always under one lock so the contiguity
/// check and the push it refers to are atomic.
pub(crate) struct HistoryState<V> {
    pub(crate) stack: VecDeque<StackEntry<V>>,
    pub(crate) batches: Vec<Vec<u64>>,
}

impl<V> HistoryState<V> {
    pub(crate) fn new() -> Self {
        Self {
            stack: VecDeque::new(),
            batches: Vec::new(),
        }
    }

    /// Commit a settled invocation: evict the oldest entry if a stack limit
    /// is set and reached, push, and record batch membership.
    pub(crate) fn commit(&mut self, entry: StackEntry<V>, batch: Option<usize>, limit: usize) {
        if limit > 0 && self.stack.len() >= limit {
            if let Some(evicted) = self.stack.pop_front() {
                // An evicted entry must leave its batch record too, or a
                // later batch undo would pop fewer entries than the record
                // promises.
                for members in &mut self.batches {
                    members.retain(|id| *id != evicted.id);
                }
            }
        }
        let id = entry.id;
        self.stack.push_back(entry);
        if let Some(index) = batch {
            self.note_batch_member(index, id);
        }
    }

    /// Append `id` to its batch iff the batch is empty or the entry committed
    /// immediately before this one belongs to the same batch. An unrelated
    /// invocation completing in between permanently splits the batch: later
    /// members are left out rather than undone across a foreign entry.
    fn note_batch_member(&mut self, index: usize, id: u64) {
        let previous = self.stack.iter().rev().nth(1).map(|entry| entry.id);
        let Some(members) = self.batches.get_mut(index) else {
            tracing::warn!(batch = index, id, "batch record gone; dropping membership");
            return;
        };
        let contiguous = match previous {
            None => members.is_empty(),
            Some(prev) => members.is_empty() || members.contains(&prev),
        };
        if contiguous {
            members.push(id);
        } else {
            tracing::debug!(batch = index, id, "interleaved entry; not recording batch member");
        }
    }
}

/// Undo coordinator state: the Idle/Undoing flag, the FIFO queue of pending
/// undo requests, and the completion signal `reset()` awaits.
pub(crate) struct UndoState<V> {
    pub(crate) undoing: bool,
    pub(crate) queue: VecDeque<oneshot::Sender<UndoReply<V>>>,
    pub(crate) in_flight: Option<oneshot::Receiver<()>>,
}

impl<V> UndoState<V> {
    pub(crate) fn new() -> Self {
        Self {
            undoing: false,
            queue: VecDeque::new(),
            in_flight: None,
        }
    }
}
