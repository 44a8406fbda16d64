//! # Simcell
//!
//! Deterministic, caller-driven entity/component simulation engine.
//!
//! ## Design Goals
//! - Loosely-typed component records with per-type validation
//! - Cached sorted-intersection queries
//! - Deferred mutation inside ticks for stable iteration
//! - Deterministic scheduling and randomness, reproducible by seed
//!
//! The engine never spawns threads or owns a run loop: the caller drives
//! every tick, and two runs with the same seed, registrations, and call
//! sequence produce identical worlds.

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

// Core world types

pub use engine::world::{
    World,
    WorldOptions,
    TickReport,
    DEFAULT_SEED,
};

pub use engine::value::{
    Record,
    Value,
};

pub use engine::component::{
    ComponentDef,
    Validator,
};

pub use engine::storage::{ColumnStore, StoreKind};

pub use engine::query::{CountMode, QueryBuilder, QueryIter, Row};

pub use engine::commands::{Command, Outcome};

pub use engine::scheduler::{
    OrderHints,
    Schedule,
    Scheduler,
    SystemFn,
};

pub use engine::random::{seed_from_string, Mulberry32};

pub use engine::hierarchy::Hierarchy;
pub use engine::archetype::Archetype;
pub use engine::snapshot::{capture, restore, Snapshot, SnapshotMeta};

pub use engine::error::{
    EngineResult,
    EngineError,
    ValidationError,
    CycleError,
};

pub use engine::types::{
    EntityId,
    ComponentId,
    Tick,
    NULL_ENTITY,
    COMMAND_FLUSH_CAP,
    SNAPSHOT_VERSION,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude (Optional but recommended)
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used engine types.
///
/// Import with:
/// ```rust
/// use simcell::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        World,
        WorldOptions,
        ComponentDef,
        Record,
        Value,
        QueryBuilder,
        Row,
        Scheduler,
        OrderHints,
        Outcome,
        Archetype,
        Hierarchy,
        EngineResult,
        EngineError,
        EntityId,
    };
}
