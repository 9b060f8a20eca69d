//! # Command Boundary
//!
//! Units expose [`CommandHandler`]s; the registry pushes `(name, handler)` pairs
//! into whatever [`CommandDispatcher`] the host provides. [`CommandTable`] is a
//! small dispatcher good enough for the demo and the tests.

use crate::framework::CommandError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A sub-command exposed by a unit.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Runs the command, returning the lines to send back to `sender`.
    async fn handle(&self, sender: &str, args: &[String]) -> Result<Vec<String>, CommandError>;

    fn tab_complete(&self, _sender: &str, _args: &[String]) -> Vec<String> {
        Vec::new()
    }
}

/// Receives the handlers of enabled units.
pub trait CommandDispatcher {
    fn register(&mut self, name: &str, handler: Arc<dyn CommandHandler>);
}

/// Name-indexed command table.
#[derive(Default, Clone)]
pub struct CommandTable {
    handlers: BTreeMap<String, Arc<dyn CommandHandler>>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    #[instrument(skip(self, args))]
    pub async fn dispatch(
        &self,
        sender: &str,
        name: &str,
        args: &[String],
    ) -> Result<Vec<String>, CommandError> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| CommandError::NotFound(name.to_string()))?;
        debug!(?args, "Dispatching");
        handler.handle(sender, args).await
    }

    pub fn tab_complete(&self, sender: &str, name: &str, args: &[String]) -> Vec<String> {
        self.handlers
            .get(name)
            .map(|h| h.tab_complete(sender, args))
            .unwrap_or_default()
    }
}

impl CommandDispatcher for CommandTable {
    fn register(&mut self, name: &str, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(name.to_string(), handler);
    }
}
