//! Building blocks shared by every feature unit.
//!
//! # Main Components
//!
//! - [`Unit`] / [`UnitDescriptor`] - the contract the registry drives
//! - [`Lifecycle`] / [`UnitBehavior`] - the default template most units build on
//! - [`Context`] - shared services handed to units at enable time
//! - [`ConfigStore`] / [`UnitConfig`] - live, reloadable configuration
//! - [`MessageCatalog`] - user-facing text with placeholders
//! - [`EventHost`] / [`EventBus`] - event subscription boundary
//! - [`CommandHandler`] / [`CommandDispatcher`] - command boundary
//!
//! # Testing
//!
//! See [`mock`] for a recording unit and journal.

pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod guard;
pub mod host;
pub mod messages;
pub mod mock;
pub mod template;
pub mod unit;

pub use command::{CommandDispatcher, CommandHandler, CommandTable};
pub use config::{ConfigStore, UnitConfig};
pub use context::{Context, ContextBuilder};
pub use error::{CommandError, ConfigError, OrchestrationError, UnitError};
pub use events::{Event, EventBus, EventHost, Listener, SubscriptionId};
pub use host::{Host, MemoryPlayerData, PlayerDataStore, TokioHost, UnitTask};
pub use messages::MessageCatalog;
pub use template::{Lifecycle, UnitBehavior, UnitScope};
pub use unit::{Unit, UnitDescriptor, DEFAULT_PRIORITY};
