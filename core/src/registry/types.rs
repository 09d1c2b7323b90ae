//! Input types for command registration and invocation.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::CommandError;

/// Type-erased future returned by every command callable. Synchronous
/// commands are just futures that resolve without suspending.
pub type CommandFuture<V> = BoxFuture<'static, Result<V, CommandError>>;

/// Execute callable: receives the effective context and the normalized
/// parameter list, produces the command's return value.
pub type ExecuteFn<C, V> =
    Arc<dyn Fn(Option<Arc<C>>, Vec<V>) -> CommandFuture<V> + Send + Sync>;

/// Cache callable: same shape as execute, invoked before it to capture
/// pre-state for the eventual undo.
pub type CacheFn<C, V> = ExecuteFn<C, V>;

/// Undo callable: receives the original parameters, the execute result and
/// the cached value. Undo is not context-bound.
pub type UndoFn<V> =
    Arc<dyn Fn(Vec<V>, V, Option<V>) -> CommandFuture<V> + Send + Sync>;

/// A command definition under construction. `execute` and `undo` are
/// mandatory; `cache` and `context` are optional. Completeness is checked at
/// registration time, not here, so a half-built definition is representable
/// but not registrable.
pub struct CommandDef<C, V> {
    pub(crate) name: String,
    pub(crate) execute: Option<ExecuteFn<C, V>>,
    pub(crate) undo: Option<UndoFn<V>>,
    pub(crate) cache: Option<CacheFn<C, V>>,
    pub(crate) context: Option<Arc<C>>,
}

impl<C, V> CommandDef<C, V> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            execute: None,
            undo: None,
            cache: None,
            context: None,
        }
    }

    pub fn execute<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Option<Arc<C>>, Vec<V>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, CommandError>> + Send + 'static,
    {
        self.execute = Some(Arc::new(move |ctx, params| f(ctx, params).boxed()));
        self
    }

    pub fn undo<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Vec<V>, V, Option<V>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, CommandError>> + Send + 'static,
    {
        self.undo = Some(Arc::new(move |params, returned, cached| {
            f(params, returned, cached).boxed()
        }));
        self
    }

    pub fn cache<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Option<Arc<C>>, Vec<V>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, CommandError>> + Send + 'static,
    {
        self.cache = Some(Arc::new(move |ctx, params| f(ctx, params).boxed()));
        self
    }

    /// Context the execute/cache callables are bound to unless the call site
    /// overrides it.
    pub fn context(mut self, context: Arc<C>) -> Self {
        self.context = Some(context);
        self
    }
}

/// Call-site command reference: a bare name, or a name plus a context that
/// overrides the registered one for this invocation only.
pub struct CommandCall<C> {
    pub(crate) name: String,
    pub(crate) context: Option<Arc<C>>,
}

impl<C> CommandCall<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context: None,
        }
    }

    pub fn with_context(name: impl Into<String>, context: Arc<C>) -> Self {
        Self {
            name: name.into(),
            context: Some(context),
        }
    }
}

impl<C> From<&str> for CommandCall<C> {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl<C> From<String> for CommandCall<C> {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Ordered parameter sequence for an invocation.
///
/// A single value becomes a one-element sequence; a `Vec` is taken verbatim,
/// never flattened. `execute("move", vec![x, y])` calls the command with two
/// parameters, `execute("label", text)` with one.
#[derive(Clone, Debug)]
pub struct Params<V> {
    values: Vec<V>,
}

impl<V> Params<V> {
    /// Zero-argument invocation.
    pub fn none() -> Self {
        Self { values: Vec::new() }
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub(crate) fn into_vec(self) -> Vec<V> {
        self.values
    }
}

impl<V> Default for Params<V> {
    fn default() -> Self {
        Self::none()
    }
}

impl<V> From<V> for Params<V> {
    fn from(value: V) -> Self {
        Self {
            values: vec![value],
        }
    }
}

impl<V> From<Vec<V>> for Params<V> {
    fn from(values: Vec<V>) -> Self {
        Self { values }
    }
}

/// One member of a `record_batch` call.
pub struct BatchCommand<V> {
    pub(crate) name: String,
    pub(crate) params: Params<V>,
}

impl<V> BatchCommand<V> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Params::none(),
        }
    }

    pub fn params(mut self, params: impl Into<Params<V>>) -> Self {
        self.params = params.into();
        self
    }
}
