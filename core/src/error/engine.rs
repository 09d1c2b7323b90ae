use thiserror::Error;

/// Opaque error type for caller-supplied execute/undo/cache callables.
///
/// Commands are free to fail with whatever error their application uses; the
/// engine carries it through without inspecting it.
pub type CommandError = anyhow::Error;

/// Engine-side failures raised by registration, lookup, and the execute
/// pipeline.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid command definition: {0}")]
    Validation(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("command '{0}' executed while an undo is in progress")]
    UndoInProgress(String),

    /// A caller-supplied cache or execute callable failed. The original
    /// error is preserved and reaches the `execute()` caller untouched.
    #[error("command failed: {0}")]
    Execution(#[from] CommandError),

    /// A spawned batch member task did not run to completion.
    #[error("batch task failed: {0}")]
    Task(String),
}

/// Failures surfaced by `undo()`.
///
/// A single undo carries the callable's error as-is. A batch undo always runs
/// every member to settlement; the `Batch` variant carries the full
/// same-length result array in pop order so the caller can see which members
/// succeeded.
#[derive(Error, Debug)]
pub enum UndoError<V> {
    #[error("undo failed: {0}")]
    Single(CommandError),

    #[error("batch undo failed: {} of {} member undos returned an error",
        .0.iter().filter(|r| r.is_err()).count(), .0.len())]
    Batch(Vec<Result<V, CommandError>>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_display_counts_failed_members() {
        let err: UndoError<i64> = UndoError::Batch(vec![
            Ok(1),
            Err(anyhow::anyhow!("boom")),
            Ok(3),
        ]);
        assert_eq!(
            err.to_string(),
            "batch undo failed: 1 of 3 member undos returned an error"
        );
    }

    #[test]
    fn undo_error_does_not_constrain_the_value_type() {
        struct Opaque;

        let err: UndoError<Opaque> = UndoError::Single(anyhow::anyhow!("boom"));
        assert_eq!(err.to_string(), "undo failed: boom");
    }

    #[test]
    fn execution_wraps_command_error() {
        let err: EngineError = anyhow::anyhow!("disk full").into();
        assert!(matches!(err, EngineError::Execution(_)));
        assert_eq!(err.to_string(), "command failed: disk full");
    }
}
