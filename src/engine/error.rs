//! Error types for world mutation, querying, scheduling, and snapshots.
//!
//! This module declares focused, composable error types used across the
//! engine. Each error carries enough context to make failures actionable
//! while remaining small and cheap to pass around or convert into the
//! aggregate [`EngineError`].
//!
//! ## Goals
//! * **Specificity:** Each variant models a single failure mode (dead entity
//!   handles, validator rejections, illegal in-tick mutation, scheduling
//!   cycles).
//! * **Ergonomics:** All errors implement [`std::error::Error`] and
//!   [`std::fmt::Display`], and structured sub-errors provide `From<T>`
//!   conversions so call sites can use `?` throughout.
//! * **Propagation policy:** Every error here is synchronous and surfaces at
//!   the call site of the offending operation. System- and scheduler-level
//!   failures are the one exception: the tick boundary catches and logs them
//!   so a single misbehaving system cannot halt the simulation step.
//!
//! ## Display vs. Debug
//! * [`std::fmt::Display`] is optimized for operator logs (short, imperative
//!   phrasing).
//! * [`std::fmt::Debug`] (derived) retains full structure for diagnostics.

use std::fmt;

use crate::engine::types::EntityId;

/// Returned when a component validator rejects a record.
///
/// Validators are pure predicates installed on a component descriptor; they
/// run when a record is first built from defaults plus overrides, and again
/// whenever a patch or in-place edit produces a new record value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Name of the component whose validator rejected the record.
    pub component: String,

    /// Reason reported by the validator.
    pub reason: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed for '{}': {}", self.component, self.reason)
    }
}

impl std::error::Error for ValidationError {}

/// Returned when `before`/`after` ordering hints form a cycle.
///
/// Resolution fails fast rather than producing the silent partial order a
/// best-effort traversal would yield.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    /// Phase whose ordering graph is cyclic.
    pub phase: String,

    /// One system known to lie on the cycle.
    pub system: String,
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ordering cycle in phase '{}' involving system '{}'",
            self.phase, self.system
        )
    }
}

impl std::error::Error for CycleError {}

/// Aggregate error for all engine operations.
///
/// Direct API errors always propagate to the immediate caller; none of them
/// are deferred or swallowed at the layer that raises them.
#[derive(Debug)]
pub enum EngineError {
    /// An operation targeted a dead or never-allocated entity.
    NotAlive {
        /// Offending entity id.
        entity: EntityId,

        /// Operation that was attempted.
        op: &'static str,
    },

    /// A component validator rejected a record.
    ValidationFailed(ValidationError),

    /// `set`/`mutate` targeted an entity lacking the component.
    MissingComponent {
        /// Target entity id.
        entity: EntityId,

        /// Name of the absent component.
        component: String,
    },

    /// A mutation was attempted while a tick was executing and the world is
    /// in strict mode.
    IllegalMutationDuringTick {
        /// Operation that was attempted.
        op: &'static str,
    },

    /// `tick` was invoked with no scheduler installed.
    NoScheduler,

    /// A query was built with contradictory or invalid options.
    MalformedQueryOptions {
        /// Human-readable description of the contradiction.
        reason: String,
    },

    /// System ordering hints form a cycle.
    CycleDetected(CycleError),

    /// A hierarchy operation would make an entity its own ancestor.
    CycleOrSelfParenting {
        /// Entity being re-parented.
        child: EntityId,

        /// Proposed parent.
        parent: EntityId,
    },

    /// A snapshot declared a schema version this build does not understand.
    UnsupportedSnapshot {
        /// Version found in the snapshot.
        version: u32,
    },

    /// A snapshot referenced a component name with no registered descriptor.
    UnknownComponent {
        /// Component name found in the snapshot.
        name: String,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NotAlive { entity, op } => {
                write!(f, "{op} on dead or unknown entity {entity}")
            }
            EngineError::ValidationFailed(e) => write!(f, "{e}"),
            EngineError::MissingComponent { entity, component } => {
                write!(f, "entity {entity} has no '{component}' component")
            }
            EngineError::IllegalMutationDuringTick { op } => {
                write!(f, "illegal mutation during tick: {op}")
            }
            EngineError::NoScheduler => f.write_str("tick requires an installed scheduler"),
            EngineError::MalformedQueryOptions { reason } => {
                write!(f, "malformed query options: {reason}")
            }
            EngineError::CycleDetected(e) => write!(f, "{e}"),
            EngineError::CycleOrSelfParenting { child, parent } => {
                write!(
                    f,
                    "parenting {child} under {parent} would create a cycle or self-parent"
                )
            }
            EngineError::UnsupportedSnapshot { version } => {
                write!(f, "unsupported snapshot version {version}")
            }
            EngineError::UnknownComponent { name } => {
                write!(f, "no descriptor registered for snapshot component '{name}'")
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::ValidationFailed(e) => Some(e),
            EngineError::CycleDetected(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(e: ValidationError) -> Self {
        EngineError::ValidationFailed(e)
    }
}

impl From<CycleError> for EngineError {
    fn from(e: CycleError) -> Self {
        EngineError::CycleDetected(e)
    }
}

/// Convenience alias used throughout the engine.
pub type EngineResult<T> = Result<T, EngineError>;
