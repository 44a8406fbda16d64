//! Parent/child relations layered on the core store.
//!
//! The hierarchy is a boundary collaborator, not engine machinery: it owns
//! an ordinary component type holding a single `"entity"` field referencing
//! the parent, and every edit goes through the world's public mutation API.
//! In-tick calls therefore defer (or fail in strict mode) exactly like any
//! other structural change, and destroying a subtree mid-tick serializes
//! into the command queue as individual destroys.
//!
//! ## Invariants
//! * The relation is acyclic: re-parenting onto a descendant (or onto the
//!   entity itself) is rejected before any mutation happens.
//! * A parent link to a destroyed entity is not auto-repaired; traversal
//!   treats a dead parent as detached.

use crate::engine::component::ComponentDef;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::{EntityId, NULL_ENTITY};
use crate::engine::value::{Record, Value};
use crate::engine::world::World;

const PARENT_FIELD: &str = "entity";

/// Parent/child relation manager.
pub struct Hierarchy {
    parent_def: ComponentDef,
}

impl Hierarchy {
    /// Creates a hierarchy backed by a component type named `parent`.
    pub fn new() -> Self {
        Self {
            parent_def: ComponentDef::new("parent")
                .with_default(PARENT_FIELD, Value::EntityRef(NULL_ENTITY)),
        }
    }

    /// The component type holding parent links, usable directly in queries.
    pub fn parent_def(&self) -> &ComponentDef {
        &self.parent_def
    }

    /// Links `child` under `parent`, replacing any existing link.
    ///
    /// Fails with `CycleOrSelfParenting` when `parent` is `child` itself or
    /// any of `child`'s current descendants. During a tick the link defers;
    /// cycle screening still runs against the pre-tick state.
    pub fn set_parent(
        &self,
        world: &mut World,
        child: EntityId,
        parent: EntityId,
    ) -> EngineResult<()> {
        if !world.is_alive(child) {
            return Err(EngineError::NotAlive {
                entity: child,
                op: "set_parent",
            });
        }
        if !world.is_alive(parent) {
            return Err(EngineError::NotAlive {
                entity: parent,
                op: "set_parent",
            });
        }
        if child == parent || self.is_ancestor(world, child, parent) {
            return Err(EngineError::CycleOrSelfParenting { child, parent });
        }
        let link = Record::new().with(PARENT_FIELD, Value::EntityRef(parent));
        if world.has(child, &self.parent_def) {
            world.set(child, &self.parent_def, link)?;
        } else {
            world.add(child, &self.parent_def, link)?;
        }
        Ok(())
    }

    /// The entity's live parent, if it has one.
    pub fn parent_of(&self, world: &World, child: EntityId) -> Option<EntityId> {
        let record = world.get(child, &self.parent_def)?;
        let parent = record.get(PARENT_FIELD)?.as_entity()?;
        (parent != NULL_ENTITY && world.is_alive(parent)).then_some(parent)
    }

    /// Direct children of `parent`, sorted ascending by id.
    pub fn children(&self, world: &World, parent: EntityId) -> EngineResult<Vec<EntityId>> {
        world
            .query()
            .with(&self.parent_def)
            .filter(move |_, records| {
                records[0]
                    .get(PARENT_FIELD)
                    .and_then(Value::as_entity)
                    .map(|p| p == parent)
                    .unwrap_or(false)
            })
            .ids()
    }

    /// Removes the entity's parent link. No-op for an unlinked entity.
    pub fn detach(&self, world: &mut World, child: EntityId) -> EngineResult<()> {
        if !world.is_alive(child) {
            return Err(EngineError::NotAlive {
                entity: child,
                op: "detach",
            });
        }
        world.remove(child, &self.parent_def)?;
        Ok(())
    }

    /// Destroys `root` and every descendant, children before parents.
    pub fn destroy_subtree(&self, world: &mut World, root: EntityId) -> EngineResult<()> {
        let mut order = Vec::new();
        self.collect_subtree(world, root, &mut order)?;
        for id in order.into_iter().rev() {
            world.destroy(id)?;
        }
        Ok(())
    }

    fn collect_subtree(
        &self,
        world: &World,
        node: EntityId,
        out: &mut Vec<EntityId>,
    ) -> EngineResult<()> {
        out.push(node);
        for child in self.children(world, node)? {
            self.collect_subtree(world, child, out)?;
        }
        Ok(())
    }

    // Walks ancestor links from `node`; the chain is bounded by the live
    // entity count so a stale cyclic link cannot hang the walk.
    fn is_ancestor(&self, world: &World, candidate: EntityId, node: EntityId) -> bool {
        let mut current = node;
        let mut steps = world.entity_count();
        while let Some(parent) = self.parent_of(world, current) {
            if parent == candidate {
                return true;
            }
            if steps == 0 {
                return false;
            }
            steps -= 1;
            current = parent;
        }
        false
    }
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::new()
    }
}
