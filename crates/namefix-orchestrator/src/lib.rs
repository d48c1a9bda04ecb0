//! namefix Orchestrator - Dependency-ordered resolution and execution
//!
//! Provides:
//! - A registry that owns every conflict record and rename operation
//! - Eager cycle detection when dependency edges are added
//! - Eligibility queries (`next_resolvable`, `next_executable`)
//! - An orchestrator that drives eligible items to completion in waves
//! - Plan files (YAML or JSON) as the inbound interface

pub mod error;
pub mod graph;
pub mod orchestrator;
pub mod plan;
pub mod registry;

pub use error::OrchestratorError;
pub use orchestrator::{Orchestrator, OrchestratorSettings, RunReport, StageReport};
pub use plan::Plan;
pub use registry::{ProgressReport, Registry};
