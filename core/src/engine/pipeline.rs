//! The execute pipeline: resolve, cache, execute, commit.

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::EngineError;
use crate::registry::{CommandCall, Params, RegisteredCommand};

use super::types::StackEntry;
use super::UndoEngine;

impl<C, V> UndoEngine<C, V>
where
    C: Send + Sync + 'static,
    V: Clone + fmt::Debug + Send + Sync + 'static,
{
    /// Execute a registered command and return its result.
    ///
    /// The stack entry is committed only once the cache and execute futures
    /// have both settled, so concurrent invocations land on the history
    /// stack in real completion order regardless of call order.
    ///
    /// Returns `Ok(None)` when a concurrent `reset()` aborted the invocation
    /// between its cache step and execute: nothing ran, nothing was
    /// committed, and that is deliberately not an error.
    pub async fn execute(
        &self,
        call: impl Into<CommandCall<C>>,
        params: impl Into<Params<V>>,
    ) -> Result<Option<V>, EngineError> {
        self.run(call.into(), params.into(), None).await
    }

    pub(crate) async fn run(
        &self,
        call: CommandCall<C>,
        params: Params<V>,
        batch: Option<usize>,
    ) -> Result<Option<V>, EngineError> {
        if self.inner.undo_state.lock().unwrap().undoing {
            return Err(EngineError::UndoInProgress(call.name));
        }
        let (index, command): (usize, Arc<RegisteredCommand<C, V>>) = self
            .inner
            .registry
            .read()
            .unwrap()
            .resolve(&call.name)
            .ok_or_else(|| EngineError::UnknownCommand(call.name.clone()))?;

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let params = params.into_vec();
        // Explicit call-site context wins over the registered one.
        let context = call.context.or_else(|| command.context.clone());

        tracing::debug!(command = %call.name, id, batch = ?batch, "executing command");

        let (cached, aborted) = match command.cache.as_ref() {
            Some(cache) => {
                let (done_tx, done_rx) = oneshot::channel();
                self.inner.pending_caches.lock().unwrap().insert(id, done_rx);
                let result = (cache)(context.clone(), params.clone()).await;
                // Read the abort flag before signalling settlement, so a
                // reset waiting on this cache cannot lower the flag first.
                let aborted = self.inner.aborting.load(Ordering::SeqCst);
                let _ = done_tx.send(());
                self.inner.pending_caches.lock().unwrap().remove(&id);
                (Some(result?), aborted)
            }
            None => (None, self.inner.aborting.load(Ordering::SeqCst)),
        };

        if aborted {
            tracing::debug!(command = %call.name, id, "aborted by reset before execute");
            return Ok(None);
        }

        let returned = (command.execute)(context, params.clone()).await?;

        {
            let mut history = self.inner.history.lock().unwrap();
            let limit = self.inner.stack_limit.load(Ordering::Relaxed);
            history.commit(
                StackEntry {
                    id,
                    command: index,
                    params,
                    returned: returned.clone(),
                    cached,
                },
                batch,
                limit,
            );
        }
        tracing::debug!(command = %call.name, id, "committed stack entry");

        Ok(Some(returned))
    }
}
