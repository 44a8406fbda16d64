//! Core identifiers and tuning constants shared across the engine.
//!
//! The engine is designed around:
//!
//! - **Stable numeric identifiers** for entities and component types,
//! - **A null sentinel** so optional entity references stay plain integers,
//! - **Explicit tuning constants** for the deferred-mutation protocol.
//!
//! Entity identifiers are plain positive integers. Freed identifiers return
//! to a free pool and may be handed to a *different* logical entity later;
//! callers must never treat an id as stable across a destroy.

/// Globally unique entity identifier. `0` is never a live entity.
pub type EntityId = u64;

/// Sentinel identifier that never names a live entity.
pub const NULL_ENTITY: EntityId = 0;

/// Opaque token identifying one component descriptor.
///
/// Tokens are minted once per descriptor and never reused within a process.
/// Equality of tokens, not of names, determines component identity.
pub type ComponentId = u32;

/// Simulation tick counter.
pub type Tick = u64;

/// Maximum number of deferred commands applied in a single flush.
///
/// Overflow is pushed back, in order, to the next tick's flush. This bounds
/// the cost of a mutation storm while guaranteeing eventual application.
pub const COMMAND_FLUSH_CAP: usize = 1000;

/// Current snapshot schema version produced by [`crate::engine::snapshot`].
pub const SNAPSHOT_VERSION: u32 = 1;
