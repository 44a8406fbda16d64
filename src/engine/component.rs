//! # Component Descriptors
//!
//! A [`ComponentDef`] is the immutable schema of one logical component type:
//! a unique minted token, a diagnostic name, an ordered mapping of default
//! field values, and an optional validator.
//!
//! ## Design
//! - Tokens are compact integers drawn from a process-wide counter and never
//!   reused, so token equality — not name equality — determines component
//!   identity. Names remain useful for query diagnostics and the snapshot
//!   schema.
//! - A *tag* is a descriptor with no default fields, used purely for
//!   presence-testing.
//! - Validators are pure `fn(&Record) -> Result<(), String>` predicates; the
//!   world runs them whenever a record is built or patched and surfaces
//!   rejections as [`ValidationFailed`](crate::engine::error::EngineError).
//!
//! ## Invariants
//! - A descriptor is immutable once built; `Clone` copies the token, so a
//!   clone still names the same component type.
//! - Two descriptors built with the same name are *different* component
//!   types.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::engine::error::{EngineResult, ValidationError};
use crate::engine::types::ComponentId;
use crate::engine::value::Record;

/// Pure predicate installed on a descriptor to vet records.
pub type Validator = fn(&Record) -> Result<(), String>;

static NEXT_TOKEN: AtomicU32 = AtomicU32::new(1);

/// Immutable schema for one component type.
#[derive(Clone, Debug)]
pub struct ComponentDef {
    id: ComponentId,
    name: String,
    defaults: Record,
    validator: Option<Validator>,
}

impl ComponentDef {
    /// Mints a new descriptor with a fresh token and no default fields.
    pub fn new(name: &str) -> Self {
        Self {
            id: NEXT_TOKEN.fetch_add(1, Ordering::Relaxed),
            name: name.to_owned(),
            defaults: Record::new(),
            validator: None,
        }
    }

    /// Builder-style default field installation.
    pub fn with_default(mut self, field: &str, value: impl Into<crate::engine::value::Value>) -> Self {
        self.defaults.set(field, value);
        self
    }

    /// Builder-style installation of the full defaults record.
    pub fn with_defaults(mut self, defaults: Record) -> Self {
        self.defaults = defaults;
        self
    }

    /// Builder-style validator installation.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// The descriptor's unique token.
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Diagnostic name. Not an identity.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default field values merged under caller overrides on `add`.
    pub fn defaults(&self) -> &Record {
        &self.defaults
    }

    /// Returns `true` if this descriptor declares no fields.
    pub fn is_tag(&self) -> bool {
        self.defaults.is_empty()
    }

    /// Runs the validator, if any, against `record`.
    pub fn validate(&self, record: &Record) -> EngineResult<()> {
        if let Some(validator) = self.validator {
            validator(record).map_err(|reason| ValidationError {
                component: self.name.clone(),
                reason,
            })?;
        }
        Ok(())
    }
}

impl PartialEq for ComponentDef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentDef {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_mints_distinct_tokens() {
        let a = ComponentDef::new("position");
        let b = ComponentDef::new("position");
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn tag_descriptors_have_no_defaults() {
        let dead = ComponentDef::new("dead");
        assert!(dead.is_tag());
        assert!(!ComponentDef::new("pos").with_default("x", 0.0).is_tag());
    }

    #[test]
    fn validator_rejections_carry_component_name() {
        fn non_negative(record: &Record) -> Result<(), String> {
            if record.f64("hp") < 0.0 {
                return Err("hp must be non-negative".into());
            }
            Ok(())
        }

        let health = ComponentDef::new("health")
            .with_default("hp", 10.0)
            .with_validator(non_negative);

        assert!(health.validate(&Record::new().with("hp", 5.0)).is_ok());
        let err = health
            .validate(&Record::new().with("hp", -1.0))
            .unwrap_err();
        assert!(err.to_string().contains("health"));
    }
}
