//! # Deferred Commands
//!
//! While a tick is executing, systems may not mutate the world directly:
//! store membership shifting under an in-flight query iteration is the
//! classic ECS hazard. Instead, each mutating call other than `create`
//! records a [`Command`] — plain data describing *what* change should occur,
//! not *how* — and the world applies the queue at the tick's
//! synchronization point.
//!
//! ## Invariants
//! - Commands are applied in the order they were recorded (FIFO).
//! - At most [`COMMAND_FLUSH_CAP`](crate::engine::types::COMMAND_FLUSH_CAP)
//!   commands are applied per flush; overflow is pushed back, still in
//!   order, for the next tick's flush.
//! - Draining runs with the in-tick flag cleared, so drained commands
//!   execute with full non-deferred semantics; commands enqueued during a
//!   drain join the tail for the next cycle.
//! - Target entities may have died between enqueue and flush; such commands
//!   are logged and dropped, never re-raised (the enqueueing caller's frame
//!   is long gone).

use crate::engine::component::ComponentDef;
use crate::engine::types::EntityId;
use crate::engine::value::Record;

/// In-place edit applied to a live record by a deferred `mutate`.
pub type RecordEdit = Box<dyn FnOnce(&mut Record)>;

/// A deferred world mutation.
///
/// Not `Clone`: the `Mutate` variant carries a boxed one-shot closure.
pub enum Command {
    /// Destroy an entity, purging it from every store.
    Destroy {
        /// Entity to destroy.
        entity: EntityId,
    },

    /// Attach a component, building the record from defaults plus overrides.
    Add {
        /// Target entity.
        entity: EntityId,
        /// Component schema.
        def: ComponentDef,
        /// Caller-supplied field overrides.
        data: Record,
    },

    /// Detach a component.
    Remove {
        /// Target entity.
        entity: EntityId,
        /// Component schema.
        def: ComponentDef,
    },

    /// Merge a patch into an existing record.
    Set {
        /// Target entity.
        entity: EntityId,
        /// Component schema.
        def: ComponentDef,
        /// Fields to overlay.
        patch: Record,
    },

    /// Apply an arbitrary in-place edit to an existing record.
    Mutate {
        /// Target entity.
        entity: EntityId,
        /// Component schema.
        def: ComponentDef,
        /// One-shot edit closure.
        edit: RecordEdit,
    },
}

impl Command {
    /// Short operation name for logs.
    pub fn op(&self) -> &'static str {
        match self {
            Command::Destroy { .. } => "destroy",
            Command::Add { .. } => "add",
            Command::Remove { .. } => "remove",
            Command::Set { .. } => "set",
            Command::Mutate { .. } => "mutate",
        }
    }
}

/// How a mutation request was handled.
///
/// Inside a non-strict tick, mutations are queued rather than applied; the
/// caller gets `Deferred` and must not assume the change is visible yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The mutation ran immediately; `T` carries its result.
    Applied(T),
    /// The mutation was queued for the next flush.
    Deferred,
}

impl<T> Outcome<T> {
    /// Returns the applied result, if the mutation was not deferred.
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::Deferred => None,
        }
    }

    /// Returns `true` if the mutation was queued.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Outcome::Deferred)
    }
}
