//! Reusable entity templates.
//!
//! An [`Archetype`] is a named bundle of component types with override
//! records, optionally extending a base archetype. Spawning resolves the
//! inheritance chain base-first (a derived override wins field-by-field over
//! its base's record for the same component) and attaches every resolved
//! component to a freshly created entity in one batch.

use crate::engine::component::ComponentDef;
use crate::engine::error::EngineResult;
use crate::engine::types::EntityId;
use crate::engine::value::Record;
use crate::engine::world::World;

/// Named entity template.
#[derive(Clone)]
pub struct Archetype {
    name: String,
    parts: Vec<(ComponentDef, Record)>,
    base: Option<Box<Archetype>>,
}

impl Archetype {
    /// Creates an empty template.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            parts: Vec::new(),
            base: None,
        }
    }

    /// Template name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a component with an override record applied on top of the
    /// component's own defaults at spawn time.
    pub fn with(mut self, def: &ComponentDef, overrides: Record) -> Self {
        self.parts.push((def.clone(), overrides));
        self
    }

    /// Derives this template from `base`. The base's components spawn first;
    /// this template's overrides win where both touch the same component.
    pub fn extend(mut self, base: &Archetype) -> Self {
        self.base = Some(Box::new(base.clone()));
        self
    }

    /// Flattened `(component, overrides)` list, inheritance resolved.
    ///
    /// Order is base chain first, then own parts, with a derived override
    /// merged into (not replacing) the base record for the same component.
    pub fn resolved_parts(&self) -> Vec<(ComponentDef, Record)> {
        let mut resolved: Vec<(ComponentDef, Record)> = match &self.base {
            Some(base) => base.resolved_parts(),
            None => Vec::new(),
        };
        for (def, overrides) in &self.parts {
            match resolved.iter_mut().find(|(d, _)| d.id() == def.id()) {
                Some((_, existing)) => existing.merge(overrides),
                None => resolved.push((def.clone(), overrides.clone())),
            }
        }
        resolved
    }

    /// Creates an entity and attaches every resolved component.
    ///
    /// Validation failures surface from the offending `add`; components
    /// attached before the failure stay attached.
    pub fn spawn(&self, world: &mut World) -> EngineResult<EntityId> {
        world.batch(|world| {
            let id = world.create();
            for (def, overrides) in self.resolved_parts() {
                world.add(id, &def, overrides)?;
            }
            Ok(id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::value::Value;
    use crate::engine::world::WorldOptions;

    fn position() -> ComponentDef {
        ComponentDef::new("position")
            .with_default("x", Value::Float(0.0))
            .with_default("y", Value::Float(0.0))
    }

    fn health() -> ComponentDef {
        ComponentDef::new("health").with_default("hp", Value::Float(100.0))
    }

    #[test]
    fn spawn_attaches_every_part_with_overrides() {
        let mut world = World::new(WorldOptions::default());
        let position = position();
        let health = health();
        let raider = Archetype::new("raider")
            .with(&position, Record::new().with("x", 4.0))
            .with(&health, Record::new());

        let id = raider.spawn(&mut world).unwrap();
        let pos = world.get(id, &position).unwrap();
        assert_eq!(pos.f64("x"), 4.0);
        assert_eq!(pos.f64("y"), 0.0);
        assert_eq!(world.get(id, &health).unwrap().f64("hp"), 100.0);
    }

    #[test]
    fn derived_overrides_merge_over_the_base() {
        let position = position();
        let health = health();
        let unit = Archetype::new("unit")
            .with(&position, Record::new().with("x", 1.0).with("y", 2.0))
            .with(&health, Record::new());
        let scout = Archetype::new("scout")
            .extend(&unit)
            .with(&position, Record::new().with("x", 9.0));

        let parts = scout.resolved_parts();
        assert_eq!(parts.len(), 2);
        let pos = &parts.iter().find(|(d, _)| d.id() == position.id()).unwrap().1;
        assert_eq!(pos.f64("x"), 9.0);
        assert_eq!(pos.f64("y"), 2.0);
    }

    #[test]
    fn spawn_of_a_derived_template_includes_base_components() {
        let mut world = World::new(WorldOptions::default());
        let position = position();
        let health = health();
        let unit = Archetype::new("unit").with(&health, Record::new());
        let scout = Archetype::new("scout")
            .extend(&unit)
            .with(&position, Record::new());

        let id = scout.spawn(&mut world).unwrap();
        assert!(world.has(id, &health));
        assert!(world.has(id, &position));
    }
}
