//! Entity and component lifecycle behavior:
//! id allocation and reuse, attach/detach, defaults, validation.

use simcell::prelude::*;
use simcell::StoreKind;

fn position() -> ComponentDef {
    ComponentDef::new("position")
        .with_default("x", Value::Float(0.0))
        .with_default("y", Value::Float(0.0))
}

fn health() -> ComponentDef {
    ComponentDef::new("health")
        .with_default("hp", Value::Float(100.0))
        .with_validator(|record| {
            if record.f64("hp") < 0.0 {
                return Err("hp must be non-negative".into());
            }
            Ok(())
        })
}

#[test]
fn ids_start_at_one_and_reuse_freed_slots() {
    let mut world = World::default();
    let a = world.create();
    let b = world.create();
    assert_eq!(a, 1);
    assert_eq!(b, 2);

    world.destroy(a).unwrap();
    assert!(!world.is_alive(a));
    assert_eq!(world.entity_count(), 1);

    let c = world.create();
    assert_eq!(c, a);
    assert_eq!(world.entity_count(), 2);
}

#[test]
fn destroying_a_dead_id_is_a_noop() {
    let mut world = World::default();
    let id = world.create();
    assert_eq!(world.destroy(id).unwrap().applied(), Some(true));
    assert_eq!(world.destroy(id).unwrap().applied(), Some(false));
    assert_eq!(world.destroy(9999).unwrap().applied(), Some(false));
}

#[test]
fn add_overlays_data_onto_deep_copied_defaults() {
    let mut world = World::default();
    let position = position();
    let a = world.create();
    let b = world.create();

    world
        .add(a, &position, Record::new().with("x", 3.5))
        .unwrap();
    world.add(b, &position, Record::new()).unwrap();

    let record = world.get(a, &position).unwrap();
    assert_eq!(record.f64("x"), 3.5);
    assert_eq!(record.f64("y"), 0.0);

    // The two records must not share structure.
    world
        .set(a, &position, Record::new().with("y", 9.0))
        .unwrap();
    assert_eq!(world.get(b, &position).unwrap().f64("y"), 0.0);
}

#[test]
fn undeclared_fields_are_dropped_on_write() {
    let mut world = World::default();
    let position = position();
    let id = world.create();
    world
        .add(id, &position, Record::new().with("x", 1.0).with("vx", 2.0))
        .unwrap();

    let record = world.get(id, &position).unwrap();
    assert_eq!(record.f64("x"), 1.0);
    assert!(!record.contains("vx"));
}

#[test]
fn validators_gate_add_set_and_mutate() {
    let mut world = World::default();
    let health = health();
    let id = world.create();

    assert!(matches!(
        world.add(id, &health, Record::new().with("hp", -1.0)),
        Err(EngineError::ValidationFailed(_))
    ));
    assert!(!world.has(id, &health));

    world.add(id, &health, Record::new()).unwrap();
    assert!(matches!(
        world.set(id, &health, Record::new().with("hp", -5.0)),
        Err(EngineError::ValidationFailed(_))
    ));
    // The rejected write must not have landed.
    assert_eq!(world.get(id, &health).unwrap().f64("hp"), 100.0);

    assert!(matches!(
        world.mutate(id, &health, |r| {
            r.set("hp", -2.0);
        }),
        Err(EngineError::ValidationFailed(_))
    ));
    assert_eq!(world.get(id, &health).unwrap().f64("hp"), 100.0);
}

#[test]
fn set_requires_the_component_to_exist() {
    let mut world = World::default();
    let position = position();
    let id = world.create();
    assert!(matches!(
        world.set(id, &position, Record::new().with("x", 1.0)),
        Err(EngineError::MissingComponent { .. })
    ));
}

#[test]
fn operations_on_dead_entities_fail() {
    let mut world = World::default();
    let position = position();
    let id = world.create();
    world.destroy(id).unwrap();

    assert!(matches!(
        world.add(id, &position, Record::new()),
        Err(EngineError::NotAlive { .. })
    ));
    assert!(matches!(
        world.remove(id, &position),
        Err(EngineError::NotAlive { .. })
    ));
    assert!(world.get(id, &position).is_none());
}

#[test]
fn destroy_purges_every_component() {
    let mut world = World::default();
    let position = position();
    let health = health();
    let id = world.create();
    world.add(id, &position, Record::new()).unwrap();
    world.add(id, &health, Record::new()).unwrap();

    world.destroy(id).unwrap();
    let reused = world.create();
    assert_eq!(reused, id);
    assert!(!world.has(reused, &position));
    assert!(!world.has(reused, &health));
}

#[test]
fn remove_reports_whether_anything_was_detached() {
    let mut world = World::default();
    let position = position();
    let id = world.create();
    assert_eq!(world.remove(id, &position).unwrap().applied(), Some(false));
    world.add(id, &position, Record::new()).unwrap();
    assert_eq!(world.remove(id, &position).unwrap().applied(), Some(true));
    assert!(!world.has(id, &position));
}

#[test]
fn columnar_worlds_behave_identically_through_the_record_api() {
    let mut world = World::new(WorldOptions {
        store_kind: StoreKind::Columnar,
        ..WorldOptions::default()
    });
    let position = position();
    let id = world.create();
    world
        .add(id, &position, Record::new().with("x", 2.0))
        .unwrap();
    world
        .set(id, &position, Record::new().with("y", 7.0))
        .unwrap();

    let record = world.get(id, &position).unwrap();
    assert_eq!(record.f64("x"), 2.0);
    assert_eq!(record.f64("y"), 7.0);

    let columns = world.columns(&position).unwrap();
    assert_eq!(columns.field(id, "x").unwrap().as_f64(), Some(2.0));
}

#[test]
fn register_creates_an_empty_store() {
    let mut world = World::default();
    let position = position();
    world.register(&position);
    let entries = world.component_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0, "position");
    assert!(entries[0].1.is_empty());
}
