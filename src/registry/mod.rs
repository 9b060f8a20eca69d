//! Dependency-ordered orchestration of feature units.
//!
//! # Main Components
//!
//! - [`UnitRegistry`] - owns the units and drives enable / disable / reload
//! - [`resolve`] - the deterministic load-order computation it uses

pub mod resolve;
pub mod unit_registry;

pub use resolve::{resolve, Resolution};
pub use unit_registry::UnitRegistry;
