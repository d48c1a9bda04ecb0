//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the boundaries of the core. The domain depends on them, but
//! their production implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`Clock`] - Source of timestamps for entity mutations
//! - [`IExecutionLayer`] - Performs the physical renames and conflict fixes

pub mod clock;
pub mod execution_layer;

pub use clock::{system_clock, Clock, ManualClock, SharedClock, SystemClock};
pub use execution_layer::IExecutionLayer;
