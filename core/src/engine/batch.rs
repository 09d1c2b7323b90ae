//! Batch recording: a group of invocations undone later as one unit.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;

use crate::error::EngineError;
use crate::registry::{BatchCommand, CommandCall};

use super::UndoEngine;

/// An eagerly started batch member execution. Resolves to the member's
/// `execute()` result; the caller decides whether and in which order to
/// await.
pub struct PendingResult<V> {
    handle: JoinHandle<Result<Option<V>, EngineError>>,
}

impl<V> Future for PendingResult<V> {
    type Output = Result<Option<V>, EngineError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_err)) => Poll::Ready(Err(EngineError::Task(join_err.to_string()))),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<C, V> UndoEngine<C, V>
where
    C: Send + Sync + 'static,
    V: Clone + fmt::Debug + Send + Sync + 'static,
{
    /// Execute a set of commands whose stack entries are undone as a set.
    ///
    /// A fresh batch record is allocated up front, then every member is
    /// started immediately on its own task, tagged with the batch index.
    /// Results come back in invocation order, not completion order.
    pub fn record_batch(
        &self,
        members: Vec<BatchCommand<V>>,
    ) -> Result<Vec<PendingResult<V>>, EngineError> {
        if members.is_empty() {
            return Err(EngineError::Validation(
                "record_batch requires at least one command".into(),
            ));
        }
        if members.iter().any(|member| member.name.is_empty()) {
            return Err(EngineError::Validation(
                "every record_batch member must name a command".into(),
            ));
        }

        let index = {
            let mut history = self.inner.history.lock().unwrap();
            history.batches.push(Vec::new());
            history.batches.len() - 1
        };
        tracing::debug!(batch = index, members = members.len(), "recording batch");

        let results = members
            .into_iter()
            .map(|member| {
                let engine = self.clone();
                let handle = tokio::spawn(async move {
                    engine
                        .run(CommandCall::new(member.name), member.params, Some(index))
                        .await
                });
                PendingResult { handle }
            })
            .collect();

        Ok(results)
    }
}
