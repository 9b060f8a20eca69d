//! # Unit Contract
//!
//! A unit is one independently registrable feature. The registry only ever sees
//! units through the [`Unit`] trait object, so the set of unit kinds stays open:
//! any crate can add one.
//!
//! The static half of a unit is its [`UnitDescriptor`]: id, configuration path,
//! dependencies and priority. Dependencies are plain id strings resolved by the
//! registry's topological sort.
//!
//! # Lifecycle
//!
//! ```text
//! registered -> ordered -> enable attempted -> { enabled | enable-failed }
//!            -> reload* -> disable attempted -> disabled
//! ```
//!
//! Most units should not implement [`Unit`] by hand. Implement
//! [`UnitBehavior`](crate::framework::UnitBehavior) and wrap it in a
//! [`Lifecycle`](crate::framework::Lifecycle), which handles the enabled flag,
//! subscription teardown and reload transitions.

use crate::framework::{CommandHandler, Context, UnitError};
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Priority used when a unit does not pick one. Lower loads first.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Static identity and ordering metadata of a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitDescriptor {
    id: String,
    config_path: Option<String>,
    dependencies: BTreeSet<String>,
    priority: i32,
}

impl UnitDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            config_path: None,
            dependencies: BTreeSet::new(),
            priority: DEFAULT_PRIORITY,
        }
    }

    /// Overrides the configuration section, which defaults to the id.
    pub fn config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn section(&self) -> &str {
        self.config_path.as_deref().unwrap_or(&self.id)
    }

    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    pub fn load_priority(&self) -> i32 {
        self.priority
    }
}

/// Behavior contract the registry drives.
///
/// Every hook may fail; the registry catches both errors and panics per unit and
/// keeps walking.
pub trait Unit: Any + Send {
    fn descriptor(&self) -> &UnitDescriptor;

    /// Called once, in load order.
    fn on_enable(&mut self, context: &Arc<Context>) -> Result<(), UnitError>;

    /// Called once, in reverse load order, and only while enabled.
    fn on_disable(&mut self) -> Result<(), UnitError>;

    /// Called on every reload pass, enabled or not, after configuration was refreshed.
    fn on_reload(&mut self) -> Result<(), UnitError>;

    /// Outcome of the most recent lifecycle transition.
    fn is_enabled(&self) -> bool;

    /// Primary command, registered under the unit id.
    fn command_handler(&self) -> Option<Arc<dyn CommandHandler>> {
        None
    }

    /// Extra commands, registered under their own names.
    fn additional_command_handlers(&self) -> BTreeMap<String, Arc<dyn CommandHandler>> {
        BTreeMap::new()
    }

    fn description(&self) -> &str {
        ""
    }

    fn as_any(&self) -> &dyn Any;
}
