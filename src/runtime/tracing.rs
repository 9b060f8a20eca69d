//! # Observability & Tracing
//!
//! Every orchestration step logs through `tracing` with structured fields, so a
//! start-up reads like this at `RUST_LOG=info`:
//!
//! ```text
//! INFO Unit registered unit=webbridge description="Relays chat to the web panel"
//! INFO Unit registered unit=announcer description="Broadcasts rotating announcements"
//! INFO enable_all: Load order: webbridge -> announcer
//! INFO enable_all: Unit enabled unit=webbridge
//! INFO enable_all: Unit enabled unit=announcer
//! INFO enable_all: Enabled 2/2 units
//! ```
//!
//! Failures carry the unit id and the error:
//!
//! ```text
//! ERROR enable_all: Enable failed unit=kiss error=enable failed: cooldown must be positive
//! WARN  enable_all: Dependency dropped error=dependency 'economy' of 'kiss' not found
//! ```
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run
//! RUST_LOG=unit_registry::registry=debug cargo run
//! ```

/// Installs a compact fmt subscriber filtered by `RUST_LOG`.
///
/// Call once per process; a second call panics inside `tracing-subscriber`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
