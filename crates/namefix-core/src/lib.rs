//! namefix Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `ConflictRecord`, `RenameOperation`
//! - **State machine** - `Status` lifecycle and the `TransitionTable` that guards it
//! - **Port definitions** - Traits for adapters: `Clock`, `IExecutionLayer`
//! - **Configuration** - YAML-backed `Config` with validation and a builder
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O. Entities refer
//! to each other through stable keys, never through direct references; the
//! registry in `namefix-orchestrator` owns the canonical instances and
//! resolves those keys through the [`domain::EntityLookup`] trait.

pub mod config;
pub mod domain;
pub mod ports;
