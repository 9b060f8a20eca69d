//! # Unit Context
//!
//! The shared services handed to every unit when it is enabled. The registry
//! builds exactly one [`Context`] and every unit holds a clone of the same
//! `Arc`. It is never rebuilt: a reload refreshes the [`ConfigStore`] and
//! [`MessageCatalog`] in place, and units observe new values on their next
//! accessor call.
//!
//! Units never reach the registry through the context. Everything a unit may
//! touch is listed here.

use crate::framework::{
    ConfigStore, EventBus, EventHost, Host, Listener, MemoryPlayerData, MessageCatalog,
    PlayerDataStore, SubscriptionId, TokioHost, UnitConfig,
};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Read-only bundle of host services.
pub struct Context {
    host: Arc<dyn Host>,
    events: Arc<dyn EventHost>,
    config: Arc<ConfigStore>,
    messages: Arc<MessageCatalog>,
    player_data: Arc<dyn PlayerDataStore>,
}

impl Context {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn messages(&self) -> &MessageCatalog {
        &self.messages
    }

    pub fn player_data(&self) -> &dyn PlayerDataStore {
        self.player_data.as_ref()
    }

    /// Snapshot of the section at `path`.
    pub fn unit_config(&self, path: &str) -> UnitConfig {
        self.config.unit_config(path)
    }

    /// Subscribes directly with the host.
    ///
    /// Subscriptions made here are not tracked; template units should go through
    /// [`UnitScope::subscribe`](crate::framework::UnitScope::subscribe) instead.
    pub fn subscribe(&self, kind: &str, listener: Arc<dyn Listener>) -> SubscriptionId {
        self.events.subscribe(kind, listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    pub fn message(&self, unit_id: &str, key: &str, replacements: &[(&str, &str)]) -> String {
        self.messages.unit_message(unit_id, key, replacements)
    }

    pub fn common_message(&self, key: &str, replacements: &[(&str, &str)]) -> String {
        self.messages.common_message(key, replacements)
    }

    pub fn log_info(&self, message: &str) {
        info!(host = self.host.name(), "{message}");
    }

    pub fn log_warning(&self, message: &str) {
        warn!(host = self.host.name(), "{message}");
    }

    pub fn log_severe(&self, message: &str) {
        error!(host = self.host.name(), "{message}");
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("host", &self.host.name())
            .field("config", &self.config.source())
            .finish_non_exhaustive()
    }
}

/// Collects the services a [`Context`] is built from.
///
/// Anything left unset falls back to the in-process implementations.
#[derive(Default)]
pub struct ContextBuilder {
    host: Option<Arc<dyn Host>>,
    events: Option<Arc<dyn EventHost>>,
    config: Option<Arc<ConfigStore>>,
    messages: Option<Arc<MessageCatalog>>,
    player_data: Option<Arc<dyn PlayerDataStore>>,
}

impl ContextBuilder {
    pub fn host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn events(mut self, events: Arc<dyn EventHost>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(mut self, config: Arc<ConfigStore>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn messages(mut self, messages: Arc<MessageCatalog>) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn player_data(mut self, player_data: Arc<dyn PlayerDataStore>) -> Self {
        self.player_data = Some(player_data);
        self
    }

    pub fn build(self) -> Context {
        Context {
            host: self.host.unwrap_or_else(|| Arc::new(TokioHost::default())),
            events: self.events.unwrap_or_else(|| Arc::new(EventBus::new())),
            config: self.config.unwrap_or_default(),
            messages: self.messages.unwrap_or_default(),
            player_data: self
                .player_data
                .unwrap_or_else(|| Arc::new(MemoryPlayerData::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::Event;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn builder_defaults_are_usable() {
        let ctx = Context::builder().build();
        assert_eq!(ctx.host().name(), "unit-host");
        assert!(!ctx.unit_config("anything").exists());
        assert_eq!(ctx.message("kiss", "x", &[]), "§c[Missing: kiss.x]");
        ctx.player_data().set("alex", "k", "v".into());
        assert_eq!(ctx.player_data().get("alex", "k").as_deref(), Some("v"));
    }

    #[test]
    fn config_is_shared_and_live() {
        let config = Arc::new(ConfigStore::new());
        let ctx = Context::builder().config(Arc::clone(&config)).build();
        config.set("kiss.enabled", true).unwrap();
        assert!(ctx.unit_config("kiss").get_bool("enabled", false));
    }

    #[test]
    fn subscriptions_go_through_the_event_host() {
        let bus = Arc::new(EventBus::new());
        let ctx = Context::builder().events(bus.clone()).build();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = ctx.subscribe(
            "tick",
            Arc::new(move |_: &Event| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        bus.publish(&Event::new("tick"));
        assert!(ctx.unsubscribe(id));
        bus.publish(&Event::new("tick"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
