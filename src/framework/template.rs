//! # Lifecycle Template
//!
//! [`Lifecycle<B>`] is the default [`Unit`] implementation. A feature writes only
//! its own logic as a [`UnitBehavior`]; the wrapper supplies the rest:
//!
//! - the enabled flag, read from `<configPath>.enabled` (default `false`) before
//!   every enable and reload pass,
//! - failure handling: an enable hook that errors or panics is logged and leaves
//!   the unit disabled,
//! - subscription tracking: every listener registered through
//!   [`UnitScope::subscribe`] is unregistered on disable, whether or not the
//!   behavior remembers to,
//! - reload transitions:
//!
//! | before | after | hook called |
//! |--------|-------|-------------|
//! | off    | on    | [`UnitBehavior::enable`] |
//! | on     | off   | [`UnitBehavior::disable`] + subscription teardown |
//! | on     | on    | [`UnitBehavior::refresh`] only |
//! | off    | off   | none |
//!
//! `refresh` never re-subscribes, so listeners are not delivered twice after a reload.
//!
//! ```rust,ignore
//! struct Kiss { cooldown: f64 }
//!
//! impl UnitBehavior for Kiss {
//!     fn descriptor(&self) -> UnitDescriptor { UnitDescriptor::new("kiss") }
//!
//!     fn load_config(&mut self, config: &UnitConfig) {
//!         self.cooldown = config.get_double("cooldown", 1.0);
//!     }
//!
//!     fn enable(&mut self, scope: &mut UnitScope<'_>) -> Result<(), UnitError> {
//!         scope.subscribe("player.interact", Arc::new(|e: &Event| { /* ... */ }));
//!         Ok(())
//!     }
//! }
//!
//! registry.register(Lifecycle::boxed(Kiss { cooldown: 1.0 }))?;
//! ```

use crate::framework::guard::guarded;
use crate::framework::{
    CommandHandler, Context, Listener, SubscriptionId, Unit, UnitConfig, UnitDescriptor,
    UnitError, UnitTask,
};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// The custom half of a template-based unit.
pub trait UnitBehavior: Send + 'static {
    /// Read once, when the behavior is wrapped.
    fn descriptor(&self) -> UnitDescriptor;

    /// Reads extra settings. Called before every enable and reload pass, after the
    /// enabled flag was read. A panic here rejects the whole pass and the unit
    /// keeps its previous state.
    fn load_config(&mut self, _config: &UnitConfig) {}

    fn enable(&mut self, scope: &mut UnitScope<'_>) -> Result<(), UnitError>;

    /// Releases timers and handles. Subscriptions are torn down afterwards regardless.
    fn disable(&mut self, _scope: &mut UnitScope<'_>) -> Result<(), UnitError> {
        Ok(())
    }

    /// Applies new settings to a unit that stays enabled across a reload.
    fn refresh(&mut self, _scope: &mut UnitScope<'_>) -> Result<(), UnitError> {
        Ok(())
    }

    fn command_handler(&self) -> Option<Arc<dyn CommandHandler>> {
        None
    }

    fn additional_command_handlers(&self) -> BTreeMap<String, Arc<dyn CommandHandler>> {
        BTreeMap::new()
    }

    fn description(&self) -> &str {
        ""
    }
}

/// What a behavior may touch while one of its hooks runs.
pub struct UnitScope<'a> {
    descriptor: &'a UnitDescriptor,
    context: &'a Arc<Context>,
    subscriptions: &'a mut Vec<SubscriptionId>,
}

impl<'a> UnitScope<'a> {
    pub fn id(&self) -> &str {
        self.descriptor.id()
    }

    pub fn context(&self) -> &Arc<Context> {
        self.context
    }

    /// Fresh snapshot of this unit's section.
    pub fn config(&self) -> UnitConfig {
        self.context.unit_config(self.descriptor.section())
    }

    /// Subscribes a listener that is unregistered automatically on disable.
    pub fn subscribe(&mut self, kind: &str, listener: Arc<dyn Listener>) -> SubscriptionId {
        let id = self.context.subscribe(kind, listener);
        self.subscriptions.push(id);
        id
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Schedules background work; the unit owns the returned handle.
    pub fn spawn(&self, task: UnitTask) -> Result<JoinHandle<()>, UnitError> {
        self.context.host().spawn(task)
    }

    pub fn message(&self, key: &str, replacements: &[(&str, &str)]) -> String {
        self.context.message(self.id(), key, replacements)
    }

    pub fn common_message(&self, key: &str, replacements: &[(&str, &str)]) -> String {
        self.context.common_message(key, replacements)
    }

    pub fn log_info(&self, message: &str) {
        info!(unit = %self.id(), "{message}");
    }

    pub fn log_warning(&self, message: &str) {
        warn!(unit = %self.id(), "{message}");
    }

    pub fn log_severe(&self, message: &str) {
        error!(unit = %self.id(), "{message}");
    }
}

/// Wraps a [`UnitBehavior`] into a full [`Unit`].
pub struct Lifecycle<B> {
    descriptor: UnitDescriptor,
    behavior: B,
    context: Option<Arc<Context>>,
    enabled: bool,
    subscriptions: Vec<SubscriptionId>,
}

impl<B: UnitBehavior> Lifecycle<B> {
    pub fn new(behavior: B) -> Self {
        Self {
            descriptor: behavior.descriptor(),
            behavior,
            context: None,
            enabled: false,
            subscriptions: Vec::new(),
        }
    }

    pub fn boxed(behavior: B) -> Box<dyn Unit> {
        Box::new(Self::new(behavior))
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn behavior_mut(&mut self) -> &mut B {
        &mut self.behavior
    }

    /// Listeners currently held on the unit's behalf.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Reads the enabled flag and lets the behavior load its settings.
    ///
    /// The flag is only returned once the behavior accepted the new settings, so
    /// a failing `load_config` leaves `self.enabled` untouched.
    fn load_config(&mut self, context: &Context) -> Result<bool, UnitError> {
        let config = context.unit_config(self.descriptor.section());
        let enabled = config.get_bool("enabled", false);
        let behavior = &mut self.behavior;
        guarded(|| {
            behavior.load_config(&config);
            Ok(())
        })?;
        Ok(enabled)
    }

    /// Runs the enable hook; on failure the unit ends up disabled with no listeners.
    fn run_enable(&mut self, context: &Arc<Context>) -> bool {
        let Self {
            descriptor,
            behavior,
            subscriptions,
            ..
        } = self;
        let mut scope = UnitScope {
            descriptor,
            context,
            subscriptions,
        };
        let result = guarded(|| behavior.enable(&mut scope));

        match result {
            Ok(()) => {
                self.enabled = true;
                true
            }
            Err(e) => {
                error!(unit = %self.descriptor.id(), error = %e, "Enable failed");
                self.teardown(context);
                self.enabled = false;
                false
            }
        }
    }

    fn run_disable(&mut self, context: &Arc<Context>) {
        let Self {
            descriptor,
            behavior,
            subscriptions,
            ..
        } = self;
        let mut scope = UnitScope {
            descriptor,
            context,
            subscriptions,
        };
        if let Err(e) = guarded(|| behavior.disable(&mut scope)) {
            warn!(unit = %self.descriptor.id(), error = %e, "Error while disabling");
        }
        self.teardown(context);
        self.enabled = false;
    }

    fn run_refresh(&mut self, context: &Arc<Context>) {
        let Self {
            descriptor,
            behavior,
            subscriptions,
            ..
        } = self;
        let mut scope = UnitScope {
            descriptor,
            context,
            subscriptions,
        };
        if let Err(e) = guarded(|| behavior.refresh(&mut scope)) {
            warn!(unit = %self.descriptor.id(), error = %e, "Refresh failed, keeping previous settings");
        }
    }

    fn teardown(&mut self, context: &Context) {
        let count = self.subscriptions.len();
        for id in self.subscriptions.drain(..) {
            context.unsubscribe(id);
        }
        if count > 0 {
            debug!(unit = %self.descriptor.id(), count, "Listeners unregistered");
        }
    }
}

impl<B: UnitBehavior> Unit for Lifecycle<B> {
    fn descriptor(&self) -> &UnitDescriptor {
        &self.descriptor
    }

    fn on_enable(&mut self, context: &Arc<Context>) -> Result<(), UnitError> {
        self.context = Some(Arc::clone(context));
        self.enabled = self.load_config(context)?;

        if !self.enabled {
            info!(unit = %self.descriptor.id(), "Unit not enabled (enabled = false)");
            return Ok(());
        }
        if self.run_enable(context) {
            info!(unit = %self.descriptor.id(), "Unit enabled");
        }
        Ok(())
    }

    fn on_disable(&mut self) -> Result<(), UnitError> {
        let Some(context) = self.context.clone() else {
            return Ok(());
        };
        if self.enabled {
            self.run_disable(&context);
            info!(unit = %self.descriptor.id(), "Unit disabled");
        } else {
            self.teardown(&context);
        }
        Ok(())
    }

    fn on_reload(&mut self) -> Result<(), UnitError> {
        let Some(context) = self.context.clone() else {
            debug!(unit = %self.descriptor.id(), "Reload before enable, ignoring");
            return Ok(());
        };
        let was_enabled = self.enabled;
        let enabled = self.load_config(&context)?;

        match (was_enabled, enabled) {
            (false, true) => {
                if self.run_enable(&context) {
                    info!(unit = %self.descriptor.id(), "Unit enabled after reload");
                }
            }
            (true, false) => {
                self.run_disable(&context);
                info!(unit = %self.descriptor.id(), "Unit disabled after reload");
            }
            (true, true) => self.run_refresh(&context),
            (false, false) => {}
        }
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn command_handler(&self) -> Option<Arc<dyn CommandHandler>> {
        if self.enabled {
            self.behavior.command_handler()
        } else {
            None
        }
    }

    fn additional_command_handlers(&self) -> BTreeMap<String, Arc<dyn CommandHandler>> {
        if self.enabled {
            self.behavior.additional_command_handlers()
        } else {
            BTreeMap::new()
        }
    }

    fn description(&self) -> &str {
        self.behavior.description()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::{Journal, MockUnit};
    use crate::framework::{ConfigStore, Event, EventBus};

    struct Fixture {
        bus: Arc<EventBus>,
        config: Arc<ConfigStore>,
        context: Arc<Context>,
        journal: Journal,
    }

    fn fixture(config: &str) -> Fixture {
        let bus = Arc::new(EventBus::new());
        let config = Arc::new(ConfigStore::from_toml_str(config).unwrap());
        let context = Arc::new(
            Context::builder()
                .events(bus.clone())
                .config(Arc::clone(&config))
                .build(),
        );
        Fixture {
            bus,
            config,
            context,
            journal: Journal::new(),
        }
    }

    #[test]
    fn disabled_config_skips_enable_entirely() {
        let fx = fixture("[m]\nenabled = false\n");
        let mut unit = Lifecycle::new(MockUnit::new("m", &fx.journal).subscribing("tick").with_command());

        unit.on_enable(&fx.context).unwrap();

        assert!(!unit.is_enabled());
        assert!(fx.journal.entries().is_empty());
        assert_eq!(fx.bus.subscription_count(), 0);
        assert!(unit.command_handler().is_none());
    }

    #[test]
    fn missing_section_means_disabled() {
        let fx = fixture("");
        let mut unit = Lifecycle::new(MockUnit::new("m", &fx.journal));
        unit.on_enable(&fx.context).unwrap();
        assert!(!unit.is_enabled());
    }

    #[test]
    fn disable_unregisters_every_listener() {
        let fx = fixture("[m]\nenabled = true\n");
        let behavior = MockUnit::new("m", &fx.journal)
            .subscribing("tick")
            .subscribing("chat");
        let hits = behavior.event_hits();
        let mut unit = Lifecycle::new(behavior);

        unit.on_enable(&fx.context).unwrap();
        assert!(unit.is_enabled());
        assert_eq!(unit.subscription_count(), 2);
        assert_eq!(fx.bus.publish(&Event::new("tick")), 1);

        unit.on_disable().unwrap();
        assert!(!unit.is_enabled());
        assert_eq!(fx.bus.subscription_count(), 0);
        assert_eq!(fx.bus.publish(&Event::new("tick")), 0);
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(fx.journal.entries(), vec!["m:enable", "m:disable"]);
    }

    #[test]
    fn failed_enable_forces_disabled_and_drops_listeners() {
        let fx = fixture("[m]\nenabled = true\n");
        let mut unit = Lifecycle::new(
            MockUnit::new("m", &fx.journal)
                .subscribing("tick")
                .failing_enable()
                .with_command(),
        );

        unit.on_enable(&fx.context).unwrap();
        assert!(!unit.is_enabled());
        assert_eq!(fx.bus.subscription_count(), 0);
        assert!(unit.command_handler().is_none());

        // not disabled again later
        unit.on_disable().unwrap();
        assert_eq!(fx.journal.entries(), vec!["m:enable"]);
    }

    #[test]
    fn panicking_enable_is_contained() {
        let fx = fixture("[m]\nenabled = true\n");
        let mut unit = Lifecycle::new(MockUnit::new("m", &fx.journal).panicking_enable());
        assert!(unit.on_enable(&fx.context).is_ok());
        assert!(!unit.is_enabled());
    }

    #[test]
    fn reload_toggles_exactly_once_each_way() {
        let fx = fixture("[m]\nenabled = true\n");
        let mut unit = Lifecycle::new(MockUnit::new("m", &fx.journal).subscribing("tick"));
        unit.on_enable(&fx.context).unwrap();

        fx.config.set("m.enabled", false).unwrap();
        unit.on_reload().unwrap();
        assert!(!unit.is_enabled());
        assert_eq!(fx.bus.subscription_count(), 0);

        // staying off is silent
        unit.on_reload().unwrap();

        fx.config.set("m.enabled", true).unwrap();
        unit.on_reload().unwrap();
        assert!(unit.is_enabled());
        assert_eq!(fx.bus.subscription_count(), 1);

        assert_eq!(fx.journal.count("m:disable"), 1);
        assert_eq!(fx.journal.count("m:enable"), 2);
    }

    #[test]
    fn staying_enabled_only_refreshes() {
        let fx = fixture("[m]\nenabled = true\nlabel = \"one\"\n");
        let mut unit = Lifecycle::new(MockUnit::new("m", &fx.journal).subscribing("tick"));
        unit.on_enable(&fx.context).unwrap();
        assert_eq!(unit.behavior().label(), "one");

        fx.config.set("m.label", "two").unwrap();
        unit.on_reload().unwrap();

        assert!(unit.is_enabled());
        assert_eq!(unit.behavior().label(), "two");
        assert_eq!(fx.journal.entries(), vec!["m:enable", "m:refresh"]);
        // no duplicate delivery
        assert_eq!(fx.bus.subscription_count(), 1);
    }

    #[test]
    fn failed_refresh_keeps_unit_enabled() {
        let fx = fixture("[m]\nenabled = true\n");
        let mut unit = Lifecycle::new(MockUnit::new("m", &fx.journal).failing_refresh());
        unit.on_enable(&fx.context).unwrap();
        unit.on_reload().unwrap();
        assert!(unit.is_enabled());
        assert_eq!(fx.journal.count("m:refresh"), 1);
    }

    /// Panics in `load_config` once `explode` is set.
    struct Brittle {
        hits: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl UnitBehavior for Brittle {
        fn descriptor(&self) -> UnitDescriptor {
            UnitDescriptor::new("brittle")
        }

        fn load_config(&mut self, config: &UnitConfig) {
            if config.get_bool("explode", false) {
                panic!("bad settings");
            }
        }

        fn enable(&mut self, scope: &mut UnitScope<'_>) -> Result<(), UnitError> {
            let hits = Arc::clone(&self.hits);
            scope.subscribe(
                "tick",
                Arc::new(move |_: &Event| {
                    hits.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                }),
            );
            Ok(())
        }
    }

    #[test]
    fn panicking_load_config_on_reload_keeps_unit_enabled_and_torn_down_later() {
        let fx = fixture("[brittle]\nenabled = true\n");
        let hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut unit = Lifecycle::new(Brittle { hits: Arc::clone(&hits) });
        unit.on_enable(&fx.context).unwrap();
        assert!(unit.is_enabled());

        fx.config.set("brittle.enabled", false).unwrap();
        fx.config.set("brittle.explode", true).unwrap();
        let err = unit.on_reload().unwrap_err();
        assert!(matches!(err, UnitError::Panicked(m) if m == "bad settings"));

        // previous state kept, listener still owned by the unit
        assert!(unit.is_enabled());
        assert_eq!(unit.subscription_count(), 1);

        unit.on_disable().unwrap();
        assert!(!unit.is_enabled());
        assert_eq!(fx.bus.subscription_count(), 0);
        assert_eq!(fx.bus.publish(&Event::new("tick")), 0);
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_load_config_on_enable_leaves_unit_disabled() {
        let fx = fixture("[brittle]\nenabled = true\nexplode = true\n");
        let mut unit = Lifecycle::new(Brittle {
            hits: Arc::new(std::sync::atomic::AtomicUsize::new(0)),
        });
        assert!(unit.on_enable(&fx.context).is_err());
        assert!(!unit.is_enabled());
        assert_eq!(fx.bus.subscription_count(), 0);
    }

    #[test]
    fn reload_before_enable_does_nothing() {
        let journal = Journal::new();
        let mut unit = Lifecycle::new(MockUnit::new("m", &journal));
        unit.on_reload().unwrap();
        unit.on_disable().unwrap();
        assert!(journal.entries().is_empty());
    }
}
