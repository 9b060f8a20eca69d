//! # Unit Registry Demo
//!
//! Walks the sample units through a full host session:
//! 1. Load configuration and messages.
//! 2. Register the sample units and enable them in dependency order.
//! 3. Register commands, run one and deliver a chat event.
//! 4. Turn a unit off through a reload.
//! 5. Disable everything on shutdown.

use std::sync::Arc;
use tracing::{error, info, Instrument};
use unit_registry::framework::{
    CommandTable, ConfigStore, Context, Event, EventBus, MessageCatalog,
};
use unit_registry::registry::UnitRegistry;
use unit_registry::runtime::setup_tracing;
use unit_registry::units::{sample_units, WebBridge};

const CONFIG: &str = r#"
[kiss]
enabled = true
cooldown = 1.5

[announcer]
enabled = true
interval-seconds = 0.5
messages = ["&aWelcome to the server!", "&eRemember to vote"]

[webbridge]
enabled = true
url = "ws://127.0.0.1:8765"
buffer-size = 20
"#;

const MESSAGES: &str = r#"
prefix = "&6[Demo]&r "

[kiss]
kiss_sent = "%prefix%&dYou kissed {player}!"
cannot_kiss_self = "%prefix%&cYou cannot kiss yourself."
toggle_enabled = "%prefix%Kisses enabled."
toggle_disabled = "%prefix%Kisses disabled."
usage = "kiss <player|toggle>"

[webbridge]
status = "%prefix%Bridge {url}, {pending} line(s) pending"
bound = "%prefix%Bound to code {code}"
"#;

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = Arc::new(ConfigStore::from_toml_str(CONFIG).map_err(|e| e.to_string())?);
    let messages = Arc::new(MessageCatalog::from_toml_str(MESSAGES).map_err(|e| e.to_string())?);
    let bus = Arc::new(EventBus::new());

    let mut registry = UnitRegistry::new(
        Context::builder()
            .config(Arc::clone(&config))
            .messages(messages)
            .events(bus.clone()),
    );
    registry
        .register_all(sample_units())
        .map_err(|e| e.to_string())?;

    let enabled = registry.enable_all();
    info!(enabled, order = ?registry.load_order(), "Host started");

    let mut commands = CommandTable::new();
    registry.register_commands(&mut commands);
    info!(commands = ?commands.names(), "Commands available");

    let span = tracing::info_span!("player_session");
    async {
        match commands.dispatch("alice", "kiss", &["bob".to_string()]).await {
            Ok(lines) => lines.iter().for_each(|line| info!(to = "alice", "{line}")),
            Err(e) => error!(error = %e, "Command failed"),
        }
        bus.publish(&Event::new("player.chat").player("alice").field("message", "hello web"));
        tokio::time::sleep(std::time::Duration::from_millis(1200)).await;
    }
    .instrument(span)
    .await;

    if let Some(bridge) = registry.behavior::<WebBridge>("webbridge") {
        info!(pending = ?bridge.pending(), "Web bridge outbox");
    }

    config
        .set("announcer.enabled", false)
        .map_err(|e| e.to_string())?;
    let enabled = registry.reload_all();
    info!(enabled, "Reloaded with announcer switched off");

    registry.disable_all();
    info!("Host stopped");
    Ok(())
}
