//! # Engine Module
//!
//! Internal simulation engine implementation.
//!
//! This module contains all core building blocks such as:
//! - Entity and component lifecycle
//! - Record values and validation
//! - Component storage backends
//! - Cached query execution
//! - Deferred mutation commands
//! - Scheduling and deterministic randomness
//! - Hierarchy, archetypes, and snapshots
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod types;
pub mod error;
pub mod value;
pub mod component;
pub mod storage;
pub mod commands;
pub mod query;
pub mod scheduler;
pub mod random;
pub mod world;
pub mod hierarchy;
pub mod archetype;
pub mod snapshot;
