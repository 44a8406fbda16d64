//! Deferred mutation protocol: in-tick queueing, FIFO flush order,
//! the bounded flush cap, and strict-mode rejection.

use std::cell::RefCell;
use std::rc::Rc;

use simcell::prelude::*;
use simcell::COMMAND_FLUSH_CAP;

fn counter() -> ComponentDef {
    ComponentDef::new("counter").with_default("n", Value::Float(0.0))
}

fn marker() -> ComponentDef {
    ComponentDef::new("marker")
}

fn scheduler_of(
    system: impl FnMut(&mut World, f64) -> EngineResult<()> + 'static,
) -> Scheduler {
    let mut scheduler = Scheduler::new();
    scheduler.register("update", "system", OrderHints::new(), system);
    scheduler
}

#[test]
fn in_tick_mutations_defer_and_apply_at_tick_end() {
    let mut world = World::default();
    let counter = counter();
    let id = world.create();
    world.add(id, &counter, Record::new()).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let observed = Rc::clone(&seen);
    let def = counter.clone();
    world.set_scheduler(scheduler_of(move |world, _| {
        let outcome = world.set(id, &def, Record::new().with("n", 1.0))?;
        assert!(outcome.is_deferred());
        // Not visible yet inside the same tick.
        observed
            .borrow_mut()
            .push(world.get(id, &def).unwrap().f64("n"));
        Ok(())
    }));

    world.tick(1.0).unwrap();
    assert_eq!(*seen.borrow(), vec![0.0]);
    assert_eq!(world.get(id, &counter).unwrap().f64("n"), 1.0);
    assert_eq!(world.pending_commands(), 0);
}

#[test]
fn flush_preserves_enqueue_order() {
    let mut world = World::default();
    let counter = counter();
    let id = world.create();
    world.add(id, &counter, Record::new()).unwrap();

    let def = counter.clone();
    world.set_scheduler(scheduler_of(move |world, _| {
        if world.frame() == 1 {
            for n in [1.0, 2.0, 3.0] {
                world.set(id, &def, Record::new().with("n", n))?;
            }
        }
        Ok(())
    }));

    world.tick(1.0).unwrap();
    // Last write in enqueue order wins.
    assert_eq!(world.get(id, &counter).unwrap().f64("n"), 3.0);
}

#[test]
fn interleaved_kinds_apply_in_enqueue_order() {
    let mut world = World::default();
    let marker = marker();
    let id = world.create();

    let def = marker.clone();
    world.set_scheduler(scheduler_of(move |world, _| {
        if world.frame() == 1 {
            world.add(id, &def, Record::new())?;
            world.remove(id, &def)?;
            world.add(id, &def, Record::new())?;
        }
        Ok(())
    }));

    world.tick(1.0).unwrap();
    assert!(world.has(id, &marker));
}

#[test]
fn flush_is_capped_and_the_remainder_carries_over() {
    let total = COMMAND_FLUSH_CAP + 137;
    let mut world = World::default();
    let marker = marker();
    let ids: Vec<EntityId> = (0..total).map(|_| world.create()).collect();

    let def = marker.clone();
    let pending = ids.clone();
    world.set_scheduler(scheduler_of(move |world, _| {
        if world.frame() == 1 {
            for id in &pending {
                world.add(*id, &def, Record::new())?;
            }
        }
        Ok(())
    }));

    world.tick(1.0).unwrap();
    let attached_after_first: usize = ids.iter().filter(|id| world.has(**id, &marker)).count();
    assert_eq!(attached_after_first, COMMAND_FLUSH_CAP);
    assert_eq!(world.pending_commands(), total - COMMAND_FLUSH_CAP);
    // FIFO: the earliest enqueued adds landed first.
    assert!(world.has(ids[0], &marker));
    assert!(!world.has(ids[total - 1], &marker));

    world.tick(1.0).unwrap();
    assert_eq!(world.pending_commands(), 0);
    assert!(ids.iter().all(|id| world.has(*id, &marker)));
}

#[test]
fn strict_mode_rejects_in_tick_mutations() {
    let mut world = World::new(WorldOptions {
        strict: true,
        ..WorldOptions::default()
    });
    let marker = marker();
    let id = world.create();

    let failures = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&failures);
    let def = marker.clone();
    world.set_scheduler(scheduler_of(move |world, _| {
        if let Err(error) = world.add(id, &def, Record::new()) {
            log.borrow_mut().push(error);
        }
        if let Err(error) = world.destroy(id) {
            log.borrow_mut().push(error);
        }
        Ok(())
    }));

    world.tick(1.0).unwrap();
    let failures = failures.borrow();
    assert_eq!(failures.len(), 2);
    assert!(failures
        .iter()
        .all(|e| matches!(e, EngineError::IllegalMutationDuringTick { .. })));
    assert!(world.is_alive(id));
    assert!(!world.has(id, &marker));
    assert_eq!(world.pending_commands(), 0);
}

#[test]
fn create_is_always_immediate() {
    let mut world = World::new(WorldOptions {
        strict: true,
        ..WorldOptions::default()
    });
    let spawned = Rc::new(RefCell::new(Vec::new()));
    let out = Rc::clone(&spawned);
    world.set_scheduler(scheduler_of(move |world, _| {
        if world.frame() == 1 {
            let id = world.create();
            assert!(world.is_alive(id));
            out.borrow_mut().push(id);
        }
        Ok(())
    }));

    world.tick(1.0).unwrap();
    let id = spawned.borrow()[0];
    assert!(world.is_alive(id));
}

#[test]
fn destroy_of_a_dead_id_does_not_defer() {
    let mut world = World::default();
    let id = world.create();
    world.destroy(id).unwrap();

    world.set_scheduler(scheduler_of(move |world, _| {
        assert_eq!(world.destroy(id).unwrap().applied(), Some(false));
        Ok(())
    }));
    world.tick(1.0).unwrap();
    assert_eq!(world.pending_commands(), 0);
}
