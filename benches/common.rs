#![allow(dead_code)]

use simcell::prelude::*;

pub const AGENTS_SMALL: usize = 1_000;
pub const AGENTS_MED: usize = 10_000;
pub const AGENTS_LARGE: usize = 100_000;

pub fn position() -> ComponentDef {
    ComponentDef::new("position")
        .with_default("x", Value::Float(0.0))
        .with_default("y", Value::Float(0.0))
}

pub fn velocity() -> ComponentDef {
    ComponentDef::new("velocity")
        .with_default("dx", Value::Float(1.0))
        .with_default("dy", Value::Float(0.5))
}

pub fn wealth() -> ComponentDef {
    ComponentDef::new("wealth").with_default("value", Value::Float(100.0))
}

/// World with `agent_count` entities carrying position+velocity, every
/// third one also carrying wealth.
pub fn populated_world(agent_count: usize) -> (World, ComponentDef, ComponentDef, ComponentDef) {
    let mut world = World::default();
    let position = position();
    let velocity = velocity();
    let wealth = wealth();

    for i in 0..agent_count {
        let id = world.create();
        world
            .add(id, &position, Record::new().with("x", i as f64))
            .unwrap();
        world.add(id, &velocity, Record::new()).unwrap();
        if i % 3 == 0 {
            world.add(id, &wealth, Record::new()).unwrap();
        }
    }
    (world, position, velocity, wealth)
}
