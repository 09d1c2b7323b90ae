//! Name-to-definition command registry.
//!
//! Commands are stored in an index-addressed vec with a name map on the side;
//! stack entries refer to commands by index so renames/lookups never touch
//! the history. Names are unique for the registry's lifetime: re-registering
//! an existing name fails and there is no unregister short of `destroy`.

mod types;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::EngineError;

pub use types::{
    BatchCommand, CacheFn, CommandCall, CommandDef, CommandFuture, ExecuteFn, Params, UndoFn,
};

/// A validated, registered command.
pub(crate) struct RegisteredCommand<C, V> {
    pub(crate) execute: ExecuteFn<C, V>,
    pub(crate) undo: UndoFn<V>,
    pub(crate) cache: Option<CacheFn<C, V>>,
    pub(crate) context: Option<Arc<C>>,
}

pub(crate) struct Registry<C, V> {
    names: HashMap<String, usize>,
    commands: Vec<Arc<RegisteredCommand<C, V>>>,
}

impl<C, V> Registry<C, V> {
    pub(crate) fn new() -> Self {
        Self {
            names: HashMap::new(),
            commands: Vec::new(),
        }
    }

    /// Validate and store a definition. Fails if the name is empty, execute
    /// or undo is missing, or the name is already taken.
    pub(crate) fn register(&mut self, def: CommandDef<C, V>) -> Result<(), EngineError> {
        let CommandDef {
            name,
            execute,
            undo,
            cache,
            context,
        } = def;

        if name.is_empty() {
            return Err(EngineError::Validation(
                "command definition requires a non-empty name".into(),
            ));
        }
        let execute = execute.ok_or_else(|| {
            EngineError::Validation(format!("command '{name}' is missing an execute callable"))
        })?;
        let undo = undo.ok_or_else(|| {
            EngineError::Validation(format!("command '{name}' is missing an undo callable"))
        })?;
        if self.names.contains_key(&name) {
            return Err(EngineError::Validation(format!(
                "command '{name}' is already registered"
            )));
        }

        let index = self.commands.len();
        self.commands.push(Arc::new(RegisteredCommand {
            execute,
            undo,
            cache,
            context,
        }));
        self.names.insert(name.clone(), index);
        tracing::debug!(command = %name, index, "registered command");
        Ok(())
    }

    pub(crate) fn resolve(&self, name: &str) -> Option<(usize, Arc<RegisteredCommand<C, V>>)> {
        let index = *self.names.get(name)?;
        self.commands.get(index).map(|cmd| (index, Arc::clone(cmd)))
    }

    pub(crate) fn command_at(&self, index: usize) -> Option<Arc<RegisteredCommand<C, V>>> {
        self.commands.get(index).map(Arc::clone)
    }

    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.names.keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn clear(&mut self) {
        self.names.clear();
        self.commands.clear();
    }
}
