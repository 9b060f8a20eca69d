//! # Kiss
//!
//! Players kiss each other with `kiss <player>` or by sneaking into another
//! player (`player.interact` with `sneaking = "true"` and a `target` field).
//!
//! Settings under `[kiss]`:
//!
//! | key        | default | meaning |
//! |------------|---------|---------|
//! | `enabled`  | `false` | |
//! | `cooldown` | `1.0`   | seconds between two kisses of the same player |
//!
//! Per-player state lives in the [`PlayerDataStore`](crate::framework::PlayerDataStore):
//! the opt-out toggle and the given / received counters. Cooldowns are in memory
//! and dropped on `player.quit` and on disable.

use crate::framework::{
    CommandError, CommandHandler, Context, Event, UnitBehavior, UnitConfig, UnitDescriptor,
    UnitError, UnitScope,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

pub const ID: &str = "kiss";

const TOGGLE_KEY: &str = "kiss.toggle";
const GIVEN_KEY: &str = "kiss.given";
const RECEIVED_KEY: &str = "kiss.received";

pub struct Kiss {
    shared: Arc<KissShared>,
}

#[derive(Default)]
struct KissShared {
    cooldown: RwLock<Duration>,
    last_kiss: Mutex<HashMap<String, Instant>>,
    context: OnceLock<Arc<Context>>,
}

impl Kiss {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(KissShared::default()),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.shared.cooldown()
    }

    /// Kisses `player` has given so far.
    pub fn kisses_given(&self, player: &str) -> u64 {
        self.shared.counter(player, GIVEN_KEY)
    }

    pub fn kisses_received(&self, player: &str) -> u64 {
        self.shared.counter(player, RECEIVED_KEY)
    }
}

impl Default for Kiss {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitBehavior for Kiss {
    fn descriptor(&self) -> UnitDescriptor {
        UnitDescriptor::new(ID)
    }

    fn load_config(&mut self, config: &UnitConfig) {
        let seconds = config.get_double("cooldown", 1.0).max(0.0);
        let cooldown = Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO);
        *self
            .shared
            .cooldown
            .write()
            .unwrap_or_else(PoisonError::into_inner) = cooldown;
    }

    fn enable(&mut self, scope: &mut UnitScope<'_>) -> Result<(), UnitError> {
        // the context is shared for the whole process, a re-enable finds it already set
        let _ = self.shared.context.set(Arc::clone(scope.context()));

        let shared = Arc::clone(&self.shared);
        scope.subscribe(
            "player.interact",
            Arc::new(move |event: &Event| shared.on_interact(event)),
        );
        let shared = Arc::clone(&self.shared);
        scope.subscribe(
            "player.quit",
            Arc::new(move |event: &Event| {
                if let Some(player) = &event.player {
                    shared.forget(player);
                }
            }),
        );

        scope.log_info(&format!("Cooldown: {:.1}s", self.cooldown().as_secs_f64()));
        Ok(())
    }

    fn disable(&mut self, _scope: &mut UnitScope<'_>) -> Result<(), UnitError> {
        self.shared
            .last_kiss
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }

    fn command_handler(&self) -> Option<Arc<dyn CommandHandler>> {
        Some(Arc::new(KissCommand {
            shared: Arc::clone(&self.shared),
        }))
    }

    fn description(&self) -> &str {
        "Lets players kiss each other"
    }
}

impl KissShared {
    fn cooldown(&self) -> Duration {
        *self.cooldown.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn message(&self, key: &str, replacements: &[(&str, &str)]) -> String {
        self.context
            .get()
            .map(|ctx| ctx.message(ID, key, replacements))
            .unwrap_or_default()
    }

    fn is_player_enabled(&self, player: &str) -> bool {
        self.context
            .get()
            .map_or(true, |ctx| ctx.player_data().get_bool(player, TOGGLE_KEY, true))
    }

    /// Flips the player's opt-out, returning the new state.
    fn toggle(&self, player: &str) -> bool {
        let enabled = !self.is_player_enabled(player);
        if let Some(ctx) = self.context.get() {
            ctx.player_data().set(player, TOGGLE_KEY, enabled.to_string());
        }
        enabled
    }

    fn counter(&self, player: &str, key: &str) -> u64 {
        self.context
            .get()
            .and_then(|ctx| ctx.player_data().get(player, key))
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    fn bump(&self, player: &str, key: &str) {
        if let Some(ctx) = self.context.get() {
            let next = self.counter(player, key) + 1;
            ctx.player_data().set(player, key, next.to_string());
        }
    }

    fn in_cooldown(&self, player: &str) -> bool {
        let cooldown = self.cooldown();
        self.last_kiss
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(player)
            .is_some_and(|at| at.elapsed() < cooldown)
    }

    fn forget(&self, player: &str) {
        self.last_kiss
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(player);
    }

    /// Kisses `target` on behalf of `sender`. Opted-out and cooling-down senders
    /// are ignored silently.
    fn attempt(&self, sender: &str, target: &str) -> Vec<String> {
        if !self.is_player_enabled(sender) || self.in_cooldown(sender) {
            return Vec::new();
        }
        if sender.eq_ignore_ascii_case(target) {
            return vec![self.message("cannot_kiss_self", &[])];
        }

        self.bump(sender, GIVEN_KEY);
        self.bump(target, RECEIVED_KEY);
        self.last_kiss
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sender.to_string(), Instant::now());
        debug!(sender, target, "Kiss");

        vec![self.message("kiss_sent", &[("player", target)])]
    }

    fn on_interact(&self, event: &Event) {
        if event.get("sneaking") != Some("true") {
            return;
        }
        if let (Some(player), Some(target)) = (&event.player, event.get("target")) {
            self.attempt(player, target);
        }
    }
}

struct KissCommand {
    shared: Arc<KissShared>,
}

#[async_trait]
impl CommandHandler for KissCommand {
    async fn handle(&self, sender: &str, args: &[String]) -> Result<Vec<String>, CommandError> {
        match args.first().map(String::as_str) {
            None => Err(CommandError::Usage(self.shared.message("usage", &[]))),
            Some(arg) if arg.eq_ignore_ascii_case("toggle") => {
                let key = if self.shared.toggle(sender) {
                    "toggle_enabled"
                } else {
                    "toggle_disabled"
                };
                Ok(vec![self.shared.message(key, &[])])
            }
            Some(target) => Ok(self.shared.attempt(sender, target)),
        }
    }

    fn tab_complete(&self, _sender: &str, args: &[String]) -> Vec<String> {
        match args {
            [partial] if "toggle".starts_with(&partial.to_ascii_lowercase()) => {
                vec!["toggle".to_string()]
            }
            _ => Vec::new(),
        }
    }
}
