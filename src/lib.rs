#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Unit Registry
//!
//! > **Dependency-ordered feature units for a long-running host process.**
//!
//! A host (a game server plugin, a daemon) ships many small features. Each one is
//! a *unit*: it declares an id, the units it depends on and a load priority, and
//! it exposes enable / disable / reload hooks. The [`UnitRegistry`](registry::UnitRegistry)
//! collects them, computes one deterministic load order and drives every unit
//! through its lifecycle, so a broken feature never takes the others down.
//!
//! ## 🏗️ Design
//!
//! ### Open set of units
//! The registry only sees `Box<dyn Unit>`. New features are new types, never new
//! match arms.
//!
//! ### Template over contract
//! Most features implement the small [`UnitBehavior`](framework::UnitBehavior) trait and
//! get wrapped in a [`Lifecycle`](framework::Lifecycle). The wrapper reads the
//! `enabled` flag, unregisters listeners on disable and turns a reload into the
//! right transition (enable, disable or refresh).
//!
//! ### Failure isolation
//! Every hook call runs behind a panic guard. An error or a panic is logged with
//! the unit id and the walk continues with the next unit.
//!
//! ### One context
//! Units receive a shared [`Context`](framework::Context) with configuration,
//! messages, event subscription, player data and a task spawner. It is built once
//! and refreshed in place on reload.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Contract ([`framework`])
//! - **Role**: the unit trait, the lifecycle template and the host-facing services.
//! - **Key items**: [`Unit`](framework::Unit), [`UnitBehavior`](framework::UnitBehavior),
//!   [`Context`](framework::Context), [`ConfigStore`](framework::ConfigStore).
//!
//! ### 2. The Orchestrator ([`registry`])
//! - **Role**: load-order resolution and the enable / disable / reload walks.
//! - **Key items**: [`UnitRegistry`](registry::UnitRegistry), [`resolve`](registry::resolve()).
//!
//! ### 3. Sample Units ([`units`])
//! - **Role**: real features written against the template, used by the demo and the tests.
//!
//! ### 4. Runtime ([`runtime`])
//! - **Role**: process setup such as [`setup_tracing`](runtime::setup_tracing).
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the demo with info logs
//! RUST_LOG=info cargo run
//!
//! cargo test
//! ```

pub mod framework;
pub mod registry;
pub mod runtime;
pub mod units;
