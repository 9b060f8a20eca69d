//! # Web Bridge
//!
//! Relays in-game chat to a web panel. Chat lines are queued in a bounded
//! outbox until the panel drains them with `webbridge flush`; players link their
//! web account with `bind <code>`.
//!
//! ```toml
//! [webbridge]
//! enabled = true
//! url = "ws://127.0.0.1:8765"
//! buffer-size = 100
//! ```

use crate::framework::{
    CommandError, CommandHandler, Context, Event, UnitBehavior, UnitConfig, UnitDescriptor,
    UnitError, UnitScope,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

pub const ID: &str = "webbridge";

const DEFAULT_URL: &str = "ws://127.0.0.1:8765";
const DEFAULT_BUFFER: i32 = 100;
const BIND_KEY: &str = "webbridge.bind";

pub struct WebBridge {
    shared: Arc<BridgeShared>,
}

#[derive(Default)]
struct BridgeShared {
    outbox: Mutex<Outbox>,
    context: OnceLock<Arc<Context>>,
}

#[derive(Debug, Default)]
struct Outbox {
    url: String,
    capacity: usize,
    lines: VecDeque<String>,
}

impl Outbox {
    fn push(&mut self, line: String) {
        self.lines.push_back(line);
        self.trim();
    }

    /// Drops the oldest lines beyond capacity.
    fn trim(&mut self) {
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }
}

impl WebBridge {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(BridgeShared::default()),
        }
    }

    pub fn url(&self) -> String {
        self.shared.outbox().url.clone()
    }

    /// Lines waiting to be sent, oldest first.
    pub fn pending(&self) -> Vec<String> {
        self.shared.outbox().lines.iter().cloned().collect()
    }

    pub fn capacity(&self) -> usize {
        self.shared.outbox().capacity
    }
}

impl Default for WebBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitBehavior for WebBridge {
    fn descriptor(&self) -> UnitDescriptor {
        UnitDescriptor::new(ID).priority(50)
    }

    fn load_config(&mut self, config: &UnitConfig) {
        let mut outbox = self.shared.outbox();
        outbox.url = config.get_string("url", DEFAULT_URL);
        outbox.capacity = usize::try_from(config.get_int("buffer-size", DEFAULT_BUFFER))
            .unwrap_or(0)
            .max(1);
    }

    fn enable(&mut self, scope: &mut UnitScope<'_>) -> Result<(), UnitError> {
        let _ = self.shared.context.set(Arc::clone(scope.context()));

        let shared = Arc::clone(&self.shared);
        scope.subscribe(
            "player.chat",
            Arc::new(move |event: &Event| {
                if let (Some(player), Some(text)) = (&event.player, event.get("message")) {
                    shared.outbox().push(format!("{player}: {text}"));
                }
            }),
        );
        scope.log_info(&format!("Bridging chat to {}", self.url()));
        Ok(())
    }

    fn disable(&mut self, _scope: &mut UnitScope<'_>) -> Result<(), UnitError> {
        self.shared.outbox().lines.clear();
        Ok(())
    }

    fn refresh(&mut self, scope: &mut UnitScope<'_>) -> Result<(), UnitError> {
        self.shared.outbox().trim();
        scope.log_info(&format!("Bridge target is now {}", self.url()));
        Ok(())
    }

    fn command_handler(&self) -> Option<Arc<dyn CommandHandler>> {
        Some(Arc::new(BridgeCommand {
            shared: Arc::clone(&self.shared),
        }))
    }

    fn additional_command_handlers(&self) -> BTreeMap<String, Arc<dyn CommandHandler>> {
        let bind: Arc<dyn CommandHandler> = Arc::new(BindCommand {
            shared: Arc::clone(&self.shared),
        });
        BTreeMap::from([("bind".to_string(), bind)])
    }

    fn description(&self) -> &str {
        "Relays chat to the web panel"
    }
}

impl BridgeShared {
    fn outbox(&self) -> MutexGuard<'_, Outbox> {
        self.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn message(&self, key: &str, replacements: &[(&str, &str)]) -> String {
        self.context
            .get()
            .map(|ctx| ctx.message(ID, key, replacements))
            .unwrap_or_default()
    }
}

/// `webbridge [status|flush]`
struct BridgeCommand {
    shared: Arc<BridgeShared>,
}

#[async_trait]
impl CommandHandler for BridgeCommand {
    async fn handle(&self, _sender: &str, args: &[String]) -> Result<Vec<String>, CommandError> {
        match args.first().map(String::as_str) {
            None | Some("status") => {
                let (url, pending) = {
                    let outbox = self.shared.outbox();
                    (outbox.url.clone(), outbox.lines.len().to_string())
                };
                Ok(vec![self
                    .shared
                    .message("status", &[("url", &url), ("pending", &pending)])])
            }
            Some("flush") => {
                let lines: Vec<String> = self.shared.outbox().lines.drain(..).collect();
                Ok(lines)
            }
            Some(other) => Err(CommandError::Usage(format!(
                "webbridge [status|flush], got '{other}'"
            ))),
        }
    }

    fn tab_complete(&self, _sender: &str, args: &[String]) -> Vec<String> {
        match args {
            [partial] => ["status", "flush"]
                .into_iter()
                .filter(|option| option.starts_with(partial.as_str()))
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// `bind <code>`, links the sender to a web account.
struct BindCommand {
    shared: Arc<BridgeShared>,
}

#[async_trait]
impl CommandHandler for BindCommand {
    async fn handle(&self, sender: &str, args: &[String]) -> Result<Vec<String>, CommandError> {
        let code = match args {
            [code] if !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric()) => code,
            _ => return Err(CommandError::Usage("bind <code>".into())),
        };
        let ctx = self
            .shared
            .context
            .get()
            .ok_or_else(|| CommandError::Failed("bridge is not running".into()))?;
        ctx.player_data().set(sender, BIND_KEY, code.clone());
        Ok(vec![self.shared.message("bound", &[("code", code)])])
    }
}
