use std::sync::Arc;
use std::time::Duration;
use unit_registry::framework::{
    CommandError, CommandTable, ConfigStore, Context, Event, EventBus, Lifecycle,
    MessageCatalog,
};
use unit_registry::registry::UnitRegistry;
use unit_registry::units::{sample_units, Announcer, Kiss, WebBridge};

const CONFIG: &str = r#"
[kiss]
enabled = true
cooldown = 0

[announcer]
enabled = true
interval-seconds = 0.02
messages = ["hello"]

[webbridge]
enabled = true
buffer-size = 10
"#;

const MESSAGES: &str = r#"
[kiss]
kiss_sent = "kissed {player}"

[webbridge]
status = "{pending} pending"
bound = "bound {code}"
"#;

struct Host {
    registry: UnitRegistry,
    config: Arc<ConfigStore>,
    bus: Arc<EventBus>,
}

fn host(config: &str) -> Host {
    let config = Arc::new(ConfigStore::from_toml_str(config).expect("valid config"));
    let bus = Arc::new(EventBus::new());
    let registry = UnitRegistry::new(
        Context::builder()
            .config(Arc::clone(&config))
            .messages(Arc::new(MessageCatalog::from_toml_str(MESSAGES).unwrap()))
            .events(bus.clone()),
    );
    Host {
        registry,
        config,
        bus,
    }
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Full host session with the three sample units.
#[tokio::test]
async fn sample_units_full_session() {
    let mut host = host(CONFIG);
    host.registry.register_all(sample_units()).unwrap();

    assert_eq!(host.registry.enable_all(), 3);
    assert_eq!(host.registry.load_order(), ["webbridge", "kiss", "announcer"]);

    let mut commands = CommandTable::new();
    assert_eq!(host.registry.register_commands(&mut commands), 3);
    assert_eq!(commands.names(), vec!["bind", "kiss", "webbridge"]);

    let reply = commands.dispatch("alice", "kiss", &args(&["bob"])).await.unwrap();
    assert_eq!(reply, vec!["kissed bob"]);
    let kiss = host.registry.behavior::<Kiss>("kiss").unwrap();
    assert_eq!(kiss.kisses_given("alice"), 1);
    assert_eq!(kiss.kisses_received("bob"), 1);

    host.bus
        .publish(&Event::new("player.chat").player("bob").field("message", "hi"));
    let status = commands.dispatch("admin", "webbridge", &[]).await.unwrap();
    assert_eq!(status, vec!["1 pending"]);

    let bound = commands.dispatch("bob", "bind", &args(&["XYZ9"])).await.unwrap();
    assert_eq!(bound, vec!["bound XYZ9"]);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let announcer = host.registry.behavior::<Announcer>("announcer").unwrap();
    assert!(!announcer.broadcasts().is_empty());

    host.registry.disable_all();
    assert_eq!(host.registry.enabled_count(), 0);
    assert_eq!(host.bus.subscription_count(), 0);
    assert!(!host.registry.behavior::<Announcer>("announcer").unwrap().is_running());
}

#[tokio::test]
async fn unknown_command_is_reported() {
    let commands = CommandTable::new();
    assert_eq!(
        commands.dispatch("alice", "nope", &[]).await,
        Err(CommandError::NotFound("nope".into()))
    );
}

#[tokio::test]
async fn reload_switches_announcer_off_and_stops_its_task() {
    let mut host = host(CONFIG);
    host.registry.register_all(sample_units()).unwrap();
    host.registry.enable_all();
    assert!(host.registry.behavior::<Announcer>("announcer").unwrap().is_running());

    host.config.set("announcer.enabled", false).unwrap();
    assert_eq!(host.registry.reload_all(), 2);
    tokio::task::yield_now().await;

    let announcer = host.registry.behavior::<Announcer>("announcer").unwrap();
    assert!(!announcer.is_running());
    assert!(host.registry.behavior::<WebBridge>("webbridge").is_some());
    // wrong type for the id
    assert!(host.registry.behavior::<Kiss>("webbridge").is_none());
}

#[tokio::test]
async fn announcer_loads_without_its_dependency() {
    let mut host = host(CONFIG);
    host.registry
        .register(Lifecycle::boxed(Announcer::new()))
        .unwrap();

    assert_eq!(host.registry.enable_all(), 1);
    assert_eq!(host.registry.load_order(), ["announcer"]);
    host.registry.disable_all();
}

#[tokio::test]
async fn disabled_units_expose_no_commands() {
    let mut host = host("[kiss]\nenabled = true\n");
    host.registry.register_all(sample_units()).unwrap();
    assert_eq!(host.registry.enable_all(), 1);

    let mut commands = CommandTable::new();
    host.registry.register_commands(&mut commands);
    assert_eq!(commands.names(), vec!["kiss"]);
}
