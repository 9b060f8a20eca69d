//! # Mock Units
//!
//! Test doubles for exercising the registry and the lifecycle template without
//! real features.
//!
//! [`MockUnit`] is a [`UnitBehavior`] that records every hook call into a shared
//! [`Journal`], so a test can assert the exact sequence the orchestrator produced:
//!
//! ```rust
//! use unit_registry::framework::mock::{Journal, MockUnit};
//! use unit_registry::framework::{ConfigStore, Context};
//! use unit_registry::registry::UnitRegistry;
//! use std::sync::Arc;
//!
//! let journal = Journal::new();
//! let config = ConfigStore::from_toml_str("[a]\nenabled = true\n[b]\nenabled = true\n").unwrap();
//! let mut registry = UnitRegistry::new(Context::builder().config(Arc::new(config)));
//!
//! registry.register(MockUnit::new("b", &journal).depends_on(["a"]).boxed()).unwrap();
//! registry.register(MockUnit::new("a", &journal).boxed()).unwrap();
//!
//! assert_eq!(registry.enable_all(), 2);
//! registry.disable_all();
//! assert_eq!(journal.entries(), vec!["a:enable", "b:enable", "b:disable", "a:disable"]);
//! ```
//!
//! Failure knobs (`failing_enable`, `panicking_enable`, `failing_disable`,
//! `failing_refresh`) inject errors at each hook.

use crate::framework::{
    CommandError, CommandHandler, Event, Lifecycle, Unit, UnitBehavior, UnitConfig,
    UnitDescriptor, UnitError, UnitScope,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Shared, ordered record of hook calls (`"<id>:<hook>"`).
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| *e == entry)
            .count()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// A recording [`UnitBehavior`].
pub struct MockUnit {
    descriptor: UnitDescriptor,
    journal: Journal,
    fail_enable: bool,
    panic_enable: bool,
    fail_disable: bool,
    fail_refresh: bool,
    subscribe_to: Vec<String>,
    command: bool,
    extra_commands: Vec<String>,
    hits: Arc<AtomicUsize>,
    label: String,
}

impl MockUnit {
    pub fn new(id: &str, journal: &Journal) -> Self {
        Self {
            descriptor: UnitDescriptor::new(id),
            journal: journal.clone(),
            fail_enable: false,
            panic_enable: false,
            fail_disable: false,
            fail_refresh: false,
            subscribe_to: Vec::new(),
            command: false,
            extra_commands: Vec::new(),
            hits: Arc::new(AtomicUsize::new(0)),
            label: String::new(),
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.descriptor = self.descriptor.priority(priority);
        self
    }

    pub fn depends_on<const N: usize>(mut self, ids: [&str; N]) -> Self {
        self.descriptor = self.descriptor.depends_on(ids);
        self
    }

    pub fn config_path(mut self, path: &str) -> Self {
        self.descriptor = self.descriptor.config_path(path);
        self
    }

    pub fn failing_enable(mut self) -> Self {
        self.fail_enable = true;
        self
    }

    pub fn panicking_enable(mut self) -> Self {
        self.panic_enable = true;
        self
    }

    pub fn failing_disable(mut self) -> Self {
        self.fail_disable = true;
        self
    }

    pub fn failing_refresh(mut self) -> Self {
        self.fail_refresh = true;
        self
    }

    /// Subscribes to `kind` on enable, counting deliveries.
    pub fn subscribing(mut self, kind: &str) -> Self {
        self.subscribe_to.push(kind.to_string());
        self
    }

    /// Exposes a primary command under the unit id.
    pub fn with_command(mut self) -> Self {
        self.command = true;
        self
    }

    pub fn with_extra_command(mut self, name: &str) -> Self {
        self.extra_commands.push(name.to_string());
        self
    }

    /// Counter of events delivered to this unit's listeners.
    pub fn event_hits(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.hits)
    }

    /// Value of `label` from the unit's section at the last config load.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn boxed(self) -> Box<dyn Unit> {
        Lifecycle::boxed(self)
    }

    fn record(&self, hook: &str) {
        self.journal.record(format!("{}:{hook}", self.descriptor.id()));
    }
}

impl UnitBehavior for MockUnit {
    fn descriptor(&self) -> UnitDescriptor {
        self.descriptor.clone()
    }

    fn load_config(&mut self, config: &UnitConfig) {
        self.label = config.get_string("label", "");
    }

    fn enable(&mut self, scope: &mut UnitScope<'_>) -> Result<(), UnitError> {
        self.record("enable");
        for kind in &self.subscribe_to {
            let hits = Arc::clone(&self.hits);
            scope.subscribe(
                kind,
                Arc::new(move |_: &Event| {
                    hits.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }
        if self.panic_enable {
            panic!("{} exploded during enable", self.descriptor.id());
        }
        if self.fail_enable {
            return Err(UnitError::Enable("mock failure".into()));
        }
        Ok(())
    }

    fn disable(&mut self, _scope: &mut UnitScope<'_>) -> Result<(), UnitError> {
        self.record("disable");
        if self.fail_disable {
            return Err(UnitError::Disable("mock failure".into()));
        }
        Ok(())
    }

    fn refresh(&mut self, _scope: &mut UnitScope<'_>) -> Result<(), UnitError> {
        self.record("refresh");
        if self.fail_refresh {
            return Err(UnitError::Reload("mock failure".into()));
        }
        Ok(())
    }

    fn command_handler(&self) -> Option<Arc<dyn CommandHandler>> {
        self.command.then(|| {
            Arc::new(MockCommand {
                name: self.descriptor.id().to_string(),
            }) as Arc<dyn CommandHandler>
        })
    }

    fn additional_command_handlers(&self) -> BTreeMap<String, Arc<dyn CommandHandler>> {
        self.extra_commands
            .iter()
            .map(|name| {
                let handler: Arc<dyn CommandHandler> = Arc::new(MockCommand { name: name.clone() });
                (name.clone(), handler)
            })
            .collect()
    }

    fn description(&self) -> &str {
        "recording test unit"
    }
}

/// Echoes `"<name> <args...>"` back to the sender.
pub struct MockCommand {
    name: String,
}

#[async_trait]
impl CommandHandler for MockCommand {
    async fn handle(&self, _sender: &str, args: &[String]) -> Result<Vec<String>, CommandError> {
        Ok(vec![format!("{} {}", self.name, args.join(" ")).trim_end().to_string()])
    }
}
