//! Host handle and per-player data boundaries.

use crate::framework::UnitError;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{PoisonError, RwLock};
use tokio::task::JoinHandle;

/// Boxed background work a unit hands to the host.
pub type UnitTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// The process hosting the units.
///
/// The registry never tracks work scheduled through [`Host::spawn`]; a unit must
/// abort its own handles in `on_disable`.
pub trait Host: Send + Sync {
    fn name(&self) -> &str;

    /// Schedules background work on the current tokio runtime.
    fn spawn(&self, task: UnitTask) -> Result<JoinHandle<()>, UnitError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| UnitError::NoRuntime)?;
        Ok(handle.spawn(task))
    }
}

/// Default [`Host`] backed by the ambient tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioHost {
    name: String,
}

impl TokioHost {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for TokioHost {
    fn default() -> Self {
        Self::new("unit-host")
    }
}

impl Host for TokioHost {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Persistent per-player key/value data.
pub trait PlayerDataStore: Send + Sync {
    fn get(&self, player: &str, key: &str) -> Option<String>;
    fn set(&self, player: &str, key: &str, value: String);
    fn remove(&self, player: &str, key: &str) -> Option<String>;

    fn get_bool(&self, player: &str, key: &str, default: bool) -> bool {
        self.get(player, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}

/// In-memory [`PlayerDataStore`].
#[derive(Debug, Default)]
pub struct MemoryPlayerData {
    players: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl MemoryPlayerData {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlayerDataStore for MemoryPlayerData {
    fn get(&self, player: &str, key: &str) -> Option<String> {
        self.players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(player)?
            .get(key)
            .cloned()
    }

    fn set(&self, player: &str, key: &str, value: String) {
        self.players
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(player.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    fn remove(&self, player: &str, key: &str) -> Option<String> {
        self.players
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(player)?
            .remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_data_roundtrips_per_player() {
        let data = MemoryPlayerData::new();
        data.set("alex", "kiss.enabled", "false".into());
        assert!(!data.get_bool("alex", "kiss.enabled", true));
        assert!(data.get_bool("sam", "kiss.enabled", true));
        assert_eq!(data.remove("alex", "kiss.enabled").as_deref(), Some("false"));
        assert_eq!(data.get("alex", "kiss.enabled"), None);
    }

    #[test]
    fn spawn_without_runtime_fails() {
        let host = TokioHost::default();
        let err = host.spawn(Box::pin(async {})).unwrap_err();
        assert!(matches!(err, UnitError::NoRuntime));
    }

    #[tokio::test]
    async fn spawn_uses_current_runtime() {
        let host = TokioHost::new("test");
        let handle = host.spawn(Box::pin(async {})).unwrap();
        handle.await.unwrap();
        assert_eq!(host.name(), "test");
    }
}
