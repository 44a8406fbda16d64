//! Whole-world capture and restore.
//!
//! A snapshot is a plain serde-friendly value: metadata (seed, clock, store
//! kind), the sorted alive id list, and for every registered component type
//! a name-keyed list of `(entity, record)` rows. Capturing sorts everything,
//! so two captures of identical worlds serialize byte-identically.
//!
//! Restore rebuilds the id space exactly — every id the source world ever
//! allocated exists again at the same position, with the same holes — so
//! entity references inside records stay valid without any remapping pass.
//!
//! Component descriptors (validators, defaults, store layout) are code, not
//! data: restore takes the caller's live descriptors and matches them to the
//! snapshot by name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::component::ComponentDef;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::storage::StoreKind;
use crate::engine::types::{EntityId, Tick, SNAPSHOT_VERSION};
use crate::engine::value::Record;
use crate::engine::world::{World, WorldOptions};

/// World-level metadata carried by a snapshot.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Seed the captured world's generator started from.
    pub seed: u32,
    /// Tick counter at capture time.
    pub frame: Tick,
    /// Accumulated simulation time at capture time.
    pub time: f64,
    /// Store implementation of the captured world.
    pub store_kind: StoreKind,
}

/// Serializable capture of a world's full data state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version, checked on restore.
    pub version: u32,
    /// World-level metadata.
    pub meta: SnapshotMeta,
    /// Live ids at capture time, ascending.
    pub alive_ids: Vec<EntityId>,
    /// Per component type, `(entity, record)` rows sorted by entity.
    pub components: BTreeMap<String, Vec<(EntityId, Record)>>,
}

/// Captures the complete data state of `world`.
pub fn capture(world: &World) -> Snapshot {
    let components = world.component_entries().into_iter().collect();
    Snapshot {
        version: SNAPSHOT_VERSION,
        meta: SnapshotMeta {
            seed: world.seed(),
            frame: world.frame(),
            time: world.time(),
            store_kind: world.store_kind(),
        },
        alive_ids: world.alive_ids(),
        components,
    }
}

/// Rebuilds a world from `snapshot`.
///
/// `defs` supplies the live descriptor for every component name present in
/// the snapshot; a missing name fails with `UnknownComponent`, an
/// unrecognized format version with `UnsupportedSnapshot`. The restored
/// world has no scheduler installed and its generator is reseeded from the
/// captured seed.
pub fn restore(snapshot: &Snapshot, defs: &[&ComponentDef]) -> EngineResult<World> {
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(EngineError::UnsupportedSnapshot {
            version: snapshot.version,
        });
    }
    let mut world = World::new(WorldOptions {
        store_kind: snapshot.meta.store_kind,
        strict: false,
        seed: snapshot.meta.seed,
    });

    // Allocate the full id range, then carve the holes back out, so ids in
    // the snapshot land at their original positions.
    let max_id = snapshot.alive_ids.iter().copied().max().unwrap_or(0);
    let mut allocated = Vec::with_capacity(max_id as usize);
    for _ in 0..max_id {
        allocated.push(world.create());
    }
    for id in allocated {
        if !snapshot.alive_ids.contains(&id) {
            world.destroy(id)?;
        }
    }

    for def in defs {
        world.register(def);
    }
    for (name, rows) in &snapshot.components {
        let def = defs
            .iter()
            .find(|def| def.name() == name)
            .ok_or_else(|| EngineError::UnknownComponent { name: name.clone() })?;
        for (id, record) in rows {
            world.add(*id, def, record.clone())?;
        }
    }

    world.restore_clock(snapshot.meta.frame, snapshot.meta.time);
    world.clear_changed();
    Ok(world)
}
