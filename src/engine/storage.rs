//! Per-component record storage.
//!
//! Each component type registered on a world owns exactly one store. Two
//! interchangeable implementations exist behind the [`Store`] contract:
//!
//! - [`RecordStore`]: dense id-indexed slots holding whole records. Constant
//!   time lookup by entity id, structural clarity, the default choice.
//! - [`ColumnStore`]: one backing array per declared field plus a presence
//!   set. Favors numeric-heavy bulk iteration; per-field access goes through
//!   index-addressed accessors that fall back to the descriptor's default
//!   when a backing slot is unset, rather than allocating a proxy object per
//!   access.
//!
//! ## Contract
//! All callers treat stores as opaque through [`Store`]; the world never
//! special-cases a variant except at construction. `entity_ids` must return
//! ids sorted ascending — the query engine's merge-intersection depends on
//! it.
//!
//! ## Invariants
//! - A store never holds a record for a dead id; the world purges every
//!   store before an id returns to the free pool.
//! - Records handed out by `get` are deep copies; the store keeps exclusive
//!   ownership of the live record.

use serde::{Deserialize, Serialize};

use crate::engine::component::ComponentDef;
use crate::engine::types::EntityId;
use crate::engine::value::{Record, Value};

/// Which store implementation a world uses, chosen at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Whole-record slots ([`RecordStore`]).
    #[default]
    Record,
    /// Per-field backing arrays ([`ColumnStore`]).
    Columnar,
}

/// Storage contract shared by both store variants.
pub trait Store {
    /// Inserts or replaces the record for `id`.
    fn set(&mut self, id: EntityId, record: Record);

    /// Returns a deep copy of the record for `id`, if present.
    fn get(&self, id: EntityId) -> Option<Record>;

    /// Returns `true` if `id` has a record in this store.
    fn has(&self, id: EntityId) -> bool;

    /// Removes the record for `id`. Returns `true` if one was present.
    fn delete(&mut self, id: EntityId) -> bool;

    /// All ids with a record, sorted ascending.
    fn entity_ids(&self) -> Vec<EntityId>;

    /// Number of stored records.
    fn len(&self) -> usize;

    /// Returns `true` if no records are stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Access to the columnar accessor, when this store is one.
    fn as_columns(&self) -> Option<&ColumnStore> {
        None
    }
}

/// Builds the store variant `kind` selects for `def`.
pub fn make_store(kind: StoreKind, def: &ComponentDef) -> Box<dyn Store> {
    match kind {
        StoreKind::Record => Box::new(RecordStore::new()),
        StoreKind::Columnar => Box::new(ColumnStore::for_def(def)),
    }
}

/// Dense id-indexed record storage.
///
/// The slot vector is indexed directly by entity id, giving O(1) lookup at
/// the cost of slots for ids this component never touched. Ids are minted
/// densely by the world, so the waste stays bounded.
#[derive(Default)]
pub struct RecordStore {
    slots: Vec<Option<Record>>,
    len: usize,
}

impl RecordStore {
    /// Creates an empty record store.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: EntityId) -> Option<&Record> {
        self.slots.get(id as usize).and_then(|s| s.as_ref())
    }
}

impl Store for RecordStore {
    fn set(&mut self, id: EntityId, record: Record) {
        let index = id as usize;
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        if self.slots[index].replace(record).is_none() {
            self.len += 1;
        }
    }

    fn get(&self, id: EntityId) -> Option<Record> {
        self.slot(id).cloned()
    }

    fn has(&self, id: EntityId) -> bool {
        self.slot(id).is_some()
    }

    fn delete(&mut self, id: EntityId) -> bool {
        match self.slots.get_mut(id as usize) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                self.len -= 1;
                true
            }
            _ => false,
        }
    }

    fn entity_ids(&self) -> Vec<EntityId> {
        // Slot order is id order, so the result is already ascending.
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|_| id as EntityId))
            .collect()
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// Struct-of-arrays storage: one backing column per declared field.
///
/// Unset backing slots read as the descriptor's default for that field.
/// Fields outside the declared schema are dropped on `set`; a columnar store
/// only carries what its columns declare.
pub struct ColumnStore {
    field_names: Vec<String>,
    defaults: Vec<Value>,
    columns: Vec<Vec<Option<Value>>>,
    present: Vec<bool>,
    len: usize,
}

impl ColumnStore {
    /// Creates a columnar store with one column per field of `def`.
    pub fn for_def(def: &ComponentDef) -> Self {
        let mut field_names = Vec::new();
        let mut defaults = Vec::new();
        for (field, value) in def.defaults().iter() {
            field_names.push(field.to_owned());
            defaults.push(value.clone());
        }
        let columns = vec![Vec::new(); field_names.len()];
        Self {
            field_names,
            defaults,
            columns,
            present: Vec::new(),
            len: 0,
        }
    }

    fn grow(&mut self, index: usize) {
        if index >= self.present.len() {
            self.present.resize(index + 1, false);
            for column in &mut self.columns {
                column.resize(index + 1, None);
            }
        }
    }

    fn field_index(&self, field: &str) -> Option<usize> {
        self.field_names.iter().position(|f| f == field)
    }

    /// Reads one field of `id`, falling back to the field default when the
    /// backing slot is unset. Returns `None` if the entity has no record
    /// here or the field is not declared.
    pub fn field(&self, id: EntityId, field: &str) -> Option<Value> {
        let index = id as usize;
        if !self.present.get(index).copied().unwrap_or(false) {
            return None;
        }
        let f = self.field_index(field)?;
        Some(match &self.columns[f][index] {
            Some(value) => value.clone(),
            None => self.defaults[f].clone(),
        })
    }

    /// Writes one field of `id` directly into its backing column.
    ///
    /// Returns `false` if the entity has no record here or the field is not
    /// declared.
    pub fn set_field(&mut self, id: EntityId, field: &str, value: Value) -> bool {
        let index = id as usize;
        if !self.present.get(index).copied().unwrap_or(false) {
            return false;
        }
        match self.field_index(field) {
            Some(f) => {
                self.columns[f][index] = Some(value);
                true
            }
            None => false,
        }
    }

    /// Declared field names, in column order.
    pub fn fields(&self) -> &[String] {
        &self.field_names
    }
}

impl Store for ColumnStore {
    fn set(&mut self, id: EntityId, record: Record) {
        let index = id as usize;
        self.grow(index);
        if !self.present[index] {
            self.present[index] = true;
            self.len += 1;
        }
        for (f, field) in self.field_names.iter().enumerate() {
            self.columns[f][index] = record.get(field).cloned();
        }
    }

    fn get(&self, id: EntityId) -> Option<Record> {
        let index = id as usize;
        if !self.present.get(index).copied().unwrap_or(false) {
            return None;
        }
        let mut record = Record::new();
        for (f, field) in self.field_names.iter().enumerate() {
            let value = match &self.columns[f][index] {
                Some(value) => value.clone(),
                None => self.defaults[f].clone(),
            };
            record.set(field, value);
        }
        Some(record)
    }

    fn has(&self, id: EntityId) -> bool {
        self.present.get(id as usize).copied().unwrap_or(false)
    }

    fn delete(&mut self, id: EntityId) -> bool {
        let index = id as usize;
        if !self.present.get(index).copied().unwrap_or(false) {
            return false;
        }
        self.present[index] = false;
        for column in &mut self.columns {
            column[index] = None;
        }
        self.len -= 1;
        true
    }

    fn entity_ids(&self) -> Vec<EntityId> {
        self.present
            .iter()
            .enumerate()
            .filter_map(|(id, present)| present.then_some(id as EntityId))
            .collect()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn as_columns(&self) -> Option<&ColumnStore> {
        Some(self)
    }
}
