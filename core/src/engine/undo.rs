//! The undo coordinator: an Idle/Undoing state machine with a FIFO queue of
//! pending requests, guaranteeing that no two undo operations ever run
//! against the stack concurrently.

use std::fmt;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;

use crate::error::{CommandError, UndoError};

use super::types::{StackEntry, UndoOutcome, UndoReply};
use super::UndoEngine;

/// What a call to `undo` is allowed to do after the state check.
enum Begin<V> {
    /// Nothing to undo, or the queue already covers the remaining stack.
    Noop,
    /// An undo is in flight; wait for the reply relayed by the drain task.
    Wait(oneshot::Receiver<UndoReply<V>>),
    /// We are the active undoer; fire the sender when done so `reset()` can
    /// await us.
    Run(oneshot::Sender<()>),
}

/// What got popped off the stack for this undo.
enum UndoOp<V> {
    Single(StackEntry<V>),
    Batch(Vec<StackEntry<V>>),
}

impl<C, V> UndoEngine<C, V>
where
    C: Send + Sync + 'static,
    V: Clone + fmt::Debug + Send + Sync + 'static,
{
    /// Reverse the most recently completed invocation, or the whole batch it
    /// belongs to.
    ///
    /// An empty stack is a no-op, never an error. If an undo is already
    /// running, the request queues and runs in FIFO order once its
    /// predecessors finish; requests beyond the number of remaining stack
    /// entries resolve immediately as no-ops. Any failure discards the
    /// queued requests, since the stack can no longer be trusted to match
    /// what they were asked to undo.
    ///
    /// Calling `execute()` or `undo()` from inside an undo callable is not
    /// structurally prevented, but it is unwise: the engine makes no attempt
    /// to detect recursive command chains.
    pub async fn undo(&self) -> UndoReply<V> {
        let begin = {
            let mut state = self.inner.undo_state.lock().unwrap();
            let stack_len = self.inner.history.lock().unwrap().stack.len();
            if stack_len == 0 {
                Begin::Noop
            } else if state.undoing {
                if state.queue.len() + 1 > stack_len {
                    tracing::debug!(
                        queued = state.queue.len(),
                        stack = stack_len,
                        "undo request exceeds remaining stack; dropping as no-op"
                    );
                    Begin::Noop
                } else {
                    let (reply_tx, reply_rx) = oneshot::channel();
                    state.queue.push_back(reply_tx);
                    tracing::debug!(queued = state.queue.len(), "undo queued behind in-flight undo");
                    Begin::Wait(reply_rx)
                }
            } else {
                state.undoing = true;
                let (done_tx, done_rx) = oneshot::channel();
                state.in_flight = Some(done_rx);
                Begin::Run(done_tx)
            }
        };

        match begin {
            Begin::Noop => Ok(UndoOutcome::Noop),
            Begin::Wait(reply_rx) => match reply_rx.await {
                Ok(reply) => reply,
                // Sender dropped: the queue was discarded by a failed undo
                // or a reset. Nothing was undone on our behalf.
                Err(_) => Ok(UndoOutcome::Noop),
            },
            Begin::Run(done_tx) => self.run_active(done_tx).await,
        }
    }

    /// Perform one undo as the already-granted active undoer. Boxed so the
    /// drain task can recurse without an infinitely sized future.
    fn run_active(&self, done_tx: oneshot::Sender<()>) -> BoxFuture<'_, UndoReply<V>> {
        self.run_active_impl(done_tx).boxed()
    }

    async fn run_active_impl(&self, done_tx: oneshot::Sender<()>) -> UndoReply<V> {
        let op = {
            let mut history = self.inner.history.lock().unwrap();
            match history.stack.back().map(|entry| entry.id) {
                // A concurrent reset drained the stack under us.
                None => None,
                Some(top_id) => {
                    let is_batch = history
                        .batches
                        .last()
                        .map(|members| members.contains(&top_id))
                        .unwrap_or(false);
                    if is_batch {
                        let members = history.batches.pop().unwrap_or_default();
                        let mut entries = Vec::with_capacity(members.len());
                        // Members sit in one contiguous run at the top; stop
                        // at the first entry that is not part of the batch.
                        loop {
                            let take = history
                                .stack
                                .back()
                                .is_some_and(|entry| members.contains(&entry.id));
                            if !take {
                                break;
                            }
                            if let Some(entry) = history.stack.pop_back() {
                                entries.push(entry);
                            }
                        }
                        Some(UndoOp::Batch(entries))
                    } else {
                        history.stack.pop_back().map(UndoOp::Single)
                    }
                }
            }
        };

        let reply: UndoReply<V> = match op {
            None => Ok(UndoOutcome::Noop),
            Some(UndoOp::Single(entry)) => {
                tracing::debug!(id = entry.id, "undoing single entry");
                match self.run_undo(entry).await {
                    Ok(value) => Ok(UndoOutcome::Single(value)),
                    Err(err) => Err(UndoError::Single(err)),
                }
            }
            Some(UndoOp::Batch(entries)) => {
                tracing::debug!(members = entries.len(), "undoing batch");
                // Every member runs regardless of sibling failures; join_all
                // settles instead of racing to the first rejection.
                let undos = entries.into_iter().map(|entry| self.run_undo(entry));
                let results = futures::future::join_all(undos).await;
                if results.iter().any(Result::is_err) {
                    Err(UndoError::Batch(results))
                } else {
                    Ok(UndoOutcome::Batch(
                        results.into_iter().filter_map(Result::ok).collect(),
                    ))
                }
            }
        };

        // Hand the Undoing state to the next waiter without passing through
        // Idle: the engine stays Undoing until the queue is empty, so a new
        // caller can never become active while a drained request still runs.
        let next = {
            let mut state = self.inner.undo_state.lock().unwrap();
            if reply.is_err() {
                // The stack no longer matches what the queued requests were
                // asked to undo; their senders drop and they resolve no-op.
                tracing::warn!(
                    discarded = state.queue.len(),
                    "undo failed; discarding pending undo queue"
                );
                state.queue.clear();
            }
            match state.queue.pop_front() {
                Some(waiter) => {
                    let (next_tx, next_rx) = oneshot::channel();
                    state.in_flight = Some(next_rx);
                    Some((waiter, next_tx))
                }
                None => {
                    state.undoing = false;
                    state.in_flight = None;
                    None
                }
            }
        };
        let _ = done_tx.send(());

        if let Some((waiter, next_done)) = next {
            // Drain on a fresh task after replying to our caller; the state
            // hand-off above keeps the serialization airtight meanwhile.
            let engine = self.clone();
            tokio::spawn(async move {
                let reply = engine.run_active(next_done).await;
                let _ = waiter.send(reply);
            });
        }

        reply
    }

    async fn run_undo(&self, entry: StackEntry<V>) -> Result<V, CommandError> {
        let command = self.inner.registry.read().unwrap().command_at(entry.command);
        match command {
            Some(command) => (command.undo)(entry.params, entry.returned, entry.cached).await,
            None => {
                tracing::warn!(index = entry.command, "command gone from registry during undo");
                Err(anyhow::anyhow!(
                    "command at index {} is no longer registered",
                    entry.command
                ))
            }
        }
    }
}
