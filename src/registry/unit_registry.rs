//! # Unit Registry
//!
//! The orchestrator. It owns every registered unit, resolves the load order once,
//! builds the single [`Context`], and drives enable, disable, reload and command
//! registration across that order.
//!
//! ## Failure isolation
//!
//! Every call into a unit goes through [`guarded`], so an error *or* a panic in
//! one unit is logged with its id and the walk moves on to the next. None of the
//! orchestration entry points return an error; callers only see log output and
//! the enabled counts.
//!
//! ## Single owner
//!
//! The registry is a plain struct with `&mut self` entry points. It is owned by
//! the host's start-up / shutdown / reload sequence and is never reachable from
//! unit code, so no locking is needed.

use crate::framework::guard::guarded;
use crate::framework::{
    CommandDispatcher, Context, ContextBuilder, Lifecycle, OrchestrationError, Unit,
    UnitBehavior,
};
use crate::registry::resolve::resolve;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Accepting registrations; nothing resolved yet.
    Registering,
    /// Resolved and enabled; reloads allowed.
    Running,
    /// `disable_all` ran.
    Stopped,
}

struct Entry {
    unit: Box<dyn Unit>,
    /// Set when the unit failed to enable or sits on a dependency cycle.
    fenced: bool,
}

impl Entry {
    fn is_active(&self) -> bool {
        !self.fenced && self.unit.is_enabled()
    }
}

/// Registers units and drives their lifecycle in dependency order.
pub struct UnitRegistry {
    units: BTreeMap<String, Entry>,
    load_order: Vec<String>,
    excluded: Vec<String>,
    phase: Phase,
    services: Option<ContextBuilder>,
    context: Option<Arc<Context>>,
}

impl UnitRegistry {
    /// Creates a registry; the [`Context`] is built from `services` on [`enable_all`](Self::enable_all).
    pub fn new(services: ContextBuilder) -> Self {
        Self {
            units: BTreeMap::new(),
            load_order: Vec::new(),
            excluded: Vec::new(),
            phase: Phase::Registering,
            services: Some(services),
            context: None,
        }
    }

    /// Registers a unit. A second unit with the same id replaces the first.
    ///
    /// # Errors
    ///
    /// [`OrchestrationError::RegistrationClosed`] once the load order was resolved.
    pub fn register(&mut self, unit: Box<dyn Unit>) -> Result<(), OrchestrationError> {
        let id = unit.descriptor().id().to_string();
        if self.phase != Phase::Registering {
            let err = OrchestrationError::RegistrationClosed { unit: id };
            warn!(error = %err, "Registration rejected");
            return Err(err);
        }
        if self.units.contains_key(&id) {
            let err = OrchestrationError::DuplicateRegistration { unit: id.clone() };
            warn!(error = %err, "Duplicate unit");
        }
        info!(unit = %id, description = unit.description(), "Unit registered");
        self.units.insert(id, Entry { unit, fenced: false });
        Ok(())
    }

    pub fn register_all<I>(&mut self, units: I) -> Result<(), OrchestrationError>
    where
        I: IntoIterator<Item = Box<dyn Unit>>,
    {
        units.into_iter().try_for_each(|unit| self.register(unit))
    }

    /// Resolves the load order, builds the context and enables every unit in order.
    ///
    /// Runs at most once; later calls return 0 without touching any unit.
    /// Returns the number of units enabled afterwards.
    #[instrument(skip(self))]
    pub fn enable_all(&mut self) -> usize {
        if self.phase != Phase::Registering {
            warn!("enable_all already ran");
            return 0;
        }
        self.resolve_dependencies();

        let context = Arc::new(self.services.take().unwrap_or_default().build());
        self.context = Some(Arc::clone(&context));
        self.phase = Phase::Running;

        for id in &self.load_order {
            let Some(entry) = self.units.get_mut(id) else {
                continue;
            };
            if let Err(e) = guarded(|| entry.unit.on_enable(&context)) {
                entry.fenced = true;
                let err = OrchestrationError::UnitEnableFailure {
                    unit: id.clone(),
                    reason: e.to_string(),
                };
                error!(error = %err, "Unit left disabled");
            }
        }

        let enabled = self.enabled_count();
        info!("Enabled {enabled}/{} units", self.units.len());
        enabled
    }

    /// Disables every enabled unit in reverse load order.
    ///
    /// Does nothing unless [`enable_all`](Self::enable_all) ran.
    #[instrument(skip(self))]
    pub fn disable_all(&mut self) {
        if self.phase != Phase::Running {
            debug!("Nothing to disable");
            return;
        }
        for id in self.load_order.iter().rev() {
            let Some(entry) = self.units.get_mut(id) else {
                continue;
            };
            if !entry.is_active() {
                continue;
            }
            if let Err(e) = guarded(|| entry.unit.on_disable()) {
                let err = OrchestrationError::UnitDisableFailure {
                    unit: id.clone(),
                    reason: e.to_string(),
                };
                warn!(error = %err, "Disable error ignored");
            }
        }
        self.phase = Phase::Stopped;
        info!("All units disabled");
    }

    /// Re-reads configuration and messages, then calls `on_reload` on every ordered unit.
    ///
    /// Disabled units are visited too, so a unit switched on in the new
    /// configuration gets enabled. Returns the number of units enabled afterwards.
    #[instrument(skip(self))]
    pub fn reload_all(&mut self) -> usize {
        let Some(context) = self.context.clone().filter(|_| self.phase == Phase::Running) else {
            warn!("Units are not running, reload skipped");
            return 0;
        };

        if let Err(e) = context.config().reload() {
            warn!(error = %e, "Configuration reload failed, keeping previous values");
        }
        if let Err(e) = context.messages().reload() {
            warn!(error = %e, "Message reload failed, keeping previous values");
        }

        for id in &self.load_order {
            let Some(entry) = self.units.get_mut(id) else {
                continue;
            };
            match guarded(|| entry.unit.on_reload()) {
                Ok(()) => entry.fenced = false,
                Err(e) => {
                    let err = OrchestrationError::UnitReloadFailure {
                        unit: id.clone(),
                        reason: e.to_string(),
                    };
                    warn!(error = %err, "Unit kept its previous state");
                }
            }
        }

        let enabled = self.enabled_count();
        info!("Reload complete, enabled {enabled}/{} units", self.units.len());
        enabled
    }

    /// Pushes the command handlers of every enabled unit into `dispatcher`.
    ///
    /// The primary handler goes under the unit id, additional handlers under
    /// their own names. Returns how many handlers were registered.
    pub fn register_commands(&self, dispatcher: &mut dyn CommandDispatcher) -> usize {
        let mut registered = 0;
        for (id, entry) in &self.units {
            if !entry.is_active() {
                continue;
            }
            let handlers = guarded(|| {
                Ok((
                    entry.unit.command_handler(),
                    entry.unit.additional_command_handlers(),
                ))
            });
            let (primary, additional) = match handlers {
                Ok(handlers) => handlers,
                Err(e) => {
                    warn!(unit = %id, error = %e, "Could not collect commands");
                    continue;
                }
            };
            if let Some(handler) = primary {
                dispatcher.register(id, handler);
                info!(unit = %id, command = %id, "Command registered");
                registered += 1;
            }
            for (name, handler) in additional {
                dispatcher.register(&name, handler);
                info!(unit = %id, command = %name, "Additional command registered");
                registered += 1;
            }
        }
        registered
    }

    pub fn unit(&self, id: &str) -> Option<&dyn Unit> {
        self.units.get(id).map(|entry| entry.unit.as_ref())
    }

    /// The behavior of a template-based unit, if `id` wraps a `B`.
    pub fn behavior<B: UnitBehavior>(&self, id: &str) -> Option<&B> {
        self.unit(id)?
            .as_any()
            .downcast_ref::<Lifecycle<B>>()
            .map(Lifecycle::behavior)
    }

    pub fn has_unit(&self, id: &str) -> bool {
        self.units.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn unit_ids(&self) -> Vec<&str> {
        self.units.keys().map(String::as_str).collect()
    }

    /// Enabled units in load order.
    pub fn enabled_units(&self) -> Vec<&dyn Unit> {
        self.load_order
            .iter()
            .filter_map(|id| self.units.get(id))
            .filter(|entry| entry.is_active())
            .map(|entry| entry.unit.as_ref())
            .collect()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn enabled_count(&self) -> usize {
        self.units.values().filter(|entry| entry.is_active()).count()
    }

    /// The resolved order; empty before [`enable_all`](Self::enable_all).
    pub fn load_order(&self) -> &[String] {
        &self.load_order
    }

    /// Units excluded because of dependency cycles.
    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    pub fn context(&self) -> Option<&Arc<Context>> {
        self.context.as_ref()
    }

    fn resolve_dependencies(&mut self) {
        let resolution = resolve(self.units.values().map(|entry| entry.unit.descriptor()));

        for (unit, dependency) in &resolution.missing {
            let err = OrchestrationError::MissingDependency {
                unit: unit.clone(),
                dependency: dependency.clone(),
            };
            warn!(error = %err, "Dependency dropped");
        }

        if !resolution.is_complete() {
            let err = OrchestrationError::CyclicDependency {
                units: resolution.unresolved.clone(),
            };
            error!(error = %err, "Units excluded from load order");
            for id in &resolution.unresolved {
                if let Some(entry) = self.units.get_mut(id) {
                    entry.fenced = true;
                }
            }
        }

        info!("Load order: {}", resolution.order.join(" -> "));
        self.load_order = resolution.order;
        self.excluded = resolution.unresolved;
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new(ContextBuilder::default())
    }
}
