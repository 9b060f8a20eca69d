//! Process-level setup shared by the demo binary and embedding hosts.
//!
//! # Main Components
//!
//! - [`setup_tracing`] - installs the log subscriber

pub mod tracing;

pub use tracing::*;
