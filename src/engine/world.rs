//! # World — entity lifecycle, stores, and the tick loop
//!
//! The [`World`] is the central orchestration layer, responsible for:
//!
//! * owning the entity id space (free-list reuse before minting),
//! * owning one store per component type, keyed by descriptor token,
//! * coordinating structural and value mutation with cache coherence,
//! * deferring mutations requested while a tick is executing,
//! * driving the installed scheduler once per tick.
//!
//! ## Mutation model
//!
//! Structural changes (component existence: `add`, `remove`, `destroy`)
//! invalidate the whole query cache. Value changes (`set`, `mutate`) leave
//! the cache alone — membership is unaffected — and only mark the change
//! table consumed by `Changed` query terms.
//!
//! While the in-tick flag is set, every mutation other than `create` is
//! either rejected (`strict` mode, surfacing ordering bugs at the call
//! site) or serialized into the deferred command queue and applied at the
//! tick's synchronization point. This is what keeps store membership stable
//! under in-flight query iteration; there is no parallelism anywhere in the
//! engine, only reentrancy.
//!
//! ## Invariants
//! * An id is in exactly one of {free pool, alive set} at any time.
//! * A store never holds a record for a dead id.
//! * A cached query id-list is always consistent with current store
//!   membership (coarse whole-cache invalidation).
//! * The change table only holds marks made since the last tick boundary.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::engine::commands::{Command, Outcome};
use crate::engine::component::ComponentDef;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::query::QueryBuilder;
use crate::engine::random::Mulberry32;
use crate::engine::scheduler::Schedule;
use crate::engine::storage::{make_store, ColumnStore, Store, StoreKind};
use crate::engine::types::{ComponentId, EntityId, Tick, COMMAND_FLUSH_CAP};
use crate::engine::value::Record;

/// Default RNG seed for worlds constructed without an explicit one.
pub const DEFAULT_SEED: u32 = 0x9E37_79B9;

/// Construction-time configuration for a [`World`].
#[derive(Clone, Copy, Debug)]
pub struct WorldOptions {
    /// Store implementation used for every component type.
    pub store_kind: StoreKind,

    /// When `true`, mutations during a tick fail instead of deferring.
    pub strict: bool,

    /// Seed for the world's deterministic generator.
    pub seed: u32,
}

impl Default for WorldOptions {
    fn default() -> Self {
        Self {
            store_kind: StoreKind::Record,
            strict: false,
            seed: DEFAULT_SEED,
        }
    }
}

/// Per-tick summary handed to the instrumentation hook.
#[derive(Clone, Copy, Debug)]
pub struct TickReport {
    /// Tick counter after the step.
    pub frame: Tick,

    /// Delta supplied by the caller.
    pub dt: f64,

    /// Wall time the tick body took.
    pub elapsed: Duration,
}

type TickHook = Box<dyn FnMut(&TickReport)>;

/// The entity/component store and simulation stepper.
pub struct World {
    next_id: EntityId,
    free: Vec<EntityId>,
    alive: Vec<bool>,
    alive_count: usize,

    defs: BTreeMap<ComponentId, ComponentDef>,
    stores: BTreeMap<ComponentId, Box<dyn Store>>,

    cache: RefCell<HashMap<Vec<ComponentId>, Arc<Vec<EntityId>>>>,
    changed: BTreeMap<ComponentId, BTreeSet<EntityId>>,
    deferred: VecDeque<Command>,

    scheduler: Option<Box<dyn Schedule>>,
    on_tick: Option<TickHook>,

    in_tick: bool,
    strict: bool,
    frame: Tick,
    time: f64,

    store_kind: StoreKind,
    seed: u32,
    rng: Mulberry32,
}

impl World {
    /// Creates a world from explicit options.
    pub fn new(options: WorldOptions) -> Self {
        Self {
            next_id: 1,
            free: Vec::new(),
            alive: Vec::new(),
            alive_count: 0,
            defs: BTreeMap::new(),
            stores: BTreeMap::new(),
            cache: RefCell::new(HashMap::new()),
            changed: BTreeMap::new(),
            deferred: VecDeque::new(),
            scheduler: None,
            on_tick: None,
            in_tick: false,
            strict: options.strict,
            frame: 0,
            time: 0.0,
            store_kind: options.store_kind,
            seed: options.seed,
            rng: Mulberry32::new(options.seed),
        }
    }

    // ── Entity lifecycle ─────────────────────────────────────────────

    /// Allocates an entity id, reusing a freed id before minting a new one.
    ///
    /// Allowed inside a tick: creation alone cannot invalidate an iteration
    /// already in flight, though the universal "all alive" cache entry is
    /// cleared.
    pub fn create(&mut self) -> EntityId {
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
        };
        let index = id as usize;
        if index >= self.alive.len() {
            self.alive.resize(index + 1, false);
        }
        self.alive[index] = true;
        self.alive_count += 1;
        self.invalidate_cache();
        id
    }

    /// Returns `true` if `id` names a live entity.
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.alive.get(id as usize).copied().unwrap_or(false)
    }

    /// Destroys an entity, purging it from every store and returning its id
    /// to the free pool.
    ///
    /// Destroying a dead or unknown id is a no-op reporting `Applied(false)`.
    /// During a tick this defers (or fails in strict mode) like any other
    /// structural mutation.
    pub fn destroy(&mut self, id: EntityId) -> EngineResult<Outcome<bool>> {
        if !self.is_alive(id) {
            return Ok(Outcome::Applied(false));
        }
        if self.in_tick {
            return self.defer(Command::Destroy { entity: id }, "destroy");
        }
        self.apply_destroy(id).map(Outcome::Applied)
    }

    /// Live entity count.
    pub fn entity_count(&self) -> usize {
        self.alive_count
    }

    /// All live ids, sorted ascending.
    pub fn alive_ids(&self) -> Vec<EntityId> {
        self.alive
            .iter()
            .enumerate()
            .filter_map(|(id, alive)| alive.then_some(id as EntityId))
            .collect()
    }

    // ── Component mutation ───────────────────────────────────────────

    /// Registers `def` so its store exists even before the first `add`.
    ///
    /// Registration is idempotent and implied by `add`; it only matters for
    /// snapshot capture of empty component types and for columnar access.
    pub fn register(&mut self, def: &ComponentDef) {
        self.ensure_store(def);
    }

    /// Attaches a component: defaults deep-copied, overlaid with `data`,
    /// validated, stored. Marks the record changed and invalidates the
    /// query cache.
    pub fn add(
        &mut self,
        id: EntityId,
        def: &ComponentDef,
        data: Record,
    ) -> EngineResult<Outcome<Record>> {
        if !self.is_alive(id) {
            return Err(EngineError::NotAlive { entity: id, op: "add" });
        }
        if self.in_tick {
            return self.defer(
                Command::Add {
                    entity: id,
                    def: def.clone(),
                    data,
                },
                "add",
            );
        }
        self.apply_add(id, def, data).map(Outcome::Applied)
    }

    /// Returns a deep copy of the entity's record for `def`, if present.
    pub fn get(&self, id: EntityId, def: &ComponentDef) -> Option<Record> {
        self.stores.get(&def.id()).and_then(|store| store.get(id))
    }

    /// Returns `true` if the entity carries `def`.
    pub fn has(&self, id: EntityId, def: &ComponentDef) -> bool {
        self.stores
            .get(&def.id())
            .map(|store| store.has(id))
            .unwrap_or(false)
    }

    /// Detaches a component. Marks the change and invalidates the cache
    /// when something was actually removed.
    pub fn remove(&mut self, id: EntityId, def: &ComponentDef) -> EngineResult<Outcome<bool>> {
        if !self.is_alive(id) {
            return Err(EngineError::NotAlive { entity: id, op: "remove" });
        }
        if self.in_tick {
            return self.defer(
                Command::Remove {
                    entity: id,
                    def: def.clone(),
                },
                "remove",
            );
        }
        self.apply_remove(id, def).map(Outcome::Applied)
    }

    /// Merges `patch` into the existing record, re-validating the merged
    /// result. Fails with `MissingComponent` if the entity lacks the
    /// component. Marks the change but does **not** invalidate the query
    /// cache: component existence is unaffected.
    pub fn set(
        &mut self,
        id: EntityId,
        def: &ComponentDef,
        patch: Record,
    ) -> EngineResult<Outcome<Record>> {
        if !self.is_alive(id) {
            return Err(EngineError::NotAlive { entity: id, op: "set" });
        }
        if self.in_tick {
            return self.defer(
                Command::Set {
                    entity: id,
                    def: def.clone(),
                    patch,
                },
                "set",
            );
        }
        self.apply_set(id, def, patch).map(Outcome::Applied)
    }

    /// Applies an arbitrary edit to the live record. Deferral and change
    /// marking behave exactly like [`World::set`]; the edited record is
    /// re-validated before it is written back.
    pub fn mutate(
        &mut self,
        id: EntityId,
        def: &ComponentDef,
        edit: impl FnOnce(&mut Record) + 'static,
    ) -> EngineResult<Outcome<Record>> {
        if !self.is_alive(id) {
            return Err(EngineError::NotAlive { entity: id, op: "mutate" });
        }
        if self.in_tick {
            return self.defer(
                Command::Mutate {
                    entity: id,
                    def: def.clone(),
                    edit: Box::new(edit),
                },
                "mutate",
            );
        }
        self.apply_mutate(id, def, Box::new(edit)).map(Outcome::Applied)
    }

    /// Runs `f` with exclusive world access as one logical step.
    ///
    /// Scoped-execution hook for collaborators that group multi-step entity
    /// construction (archetype spawning).
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        f(self)
    }

    /// Read-only access to the columnar store for `def`, when the world was
    /// built with [`StoreKind::Columnar`].
    pub fn columns(&self, def: &ComponentDef) -> Option<&ColumnStore> {
        self.stores.get(&def.id()).and_then(|store| store.as_columns())
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Begins construction of a component query.
    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self)
    }

    // ── Tick ─────────────────────────────────────────────────────────

    /// Installs the scheduler driven by [`World::tick`].
    pub fn set_scheduler(&mut self, scheduler: impl Schedule + 'static) {
        self.scheduler = Some(Box::new(scheduler));
    }

    /// Installs an instrumentation hook invoked after every tick.
    pub fn on_tick(&mut self, hook: impl FnMut(&TickReport) + 'static) {
        self.on_tick = Some(Box::new(hook));
    }

    /// Advances the simulation by one step of `dt`.
    ///
    /// Sequence: advance clock, set in-tick, run the scheduler (errors are
    /// logged, never propagated — one misbehaving system must not halt the
    /// step), drain deferred commands (bounded), clear the change table,
    /// clear in-tick, report elapsed time to the instrumentation hook.
    pub fn tick(&mut self, dt: f64) -> EngineResult<()> {
        let mut scheduler = self.scheduler.take().ok_or(EngineError::NoScheduler)?;
        let started = Instant::now();

        self.time += dt;
        self.frame += 1;
        self.in_tick = true;

        if let Err(error) = scheduler.run(self, dt) {
            log::error!("frame {}: scheduler failed: {error}", self.frame);
        }
        self.scheduler = Some(scheduler);

        self.flush_deferred();
        self.changed.clear();
        self.in_tick = false;

        let report = TickReport {
            frame: self.frame,
            dt,
            elapsed: started.elapsed(),
        };
        if let Some(hook) = self.on_tick.as_mut() {
            hook(&report);
        }
        Ok(())
    }

    // ── Introspection ────────────────────────────────────────────────

    /// Tick counter.
    pub fn frame(&self) -> Tick {
        self.frame
    }

    /// Accumulated simulation time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Seed the world's generator started from.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Store implementation this world was built with.
    pub fn store_kind(&self) -> StoreKind {
        self.store_kind
    }

    /// Returns `true` when in-tick mutations fail instead of deferring.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Returns `true` while a tick is executing.
    pub fn in_tick(&self) -> bool {
        self.in_tick
    }

    /// Number of commands waiting for the next flush.
    pub fn pending_commands(&self) -> usize {
        self.deferred.len()
    }

    /// The world's deterministic generator.
    pub fn rng(&self) -> &Mulberry32 {
        &self.rng
    }

    /// Mutable access to the world's deterministic generator.
    pub fn rng_mut(&mut self) -> &mut Mulberry32 {
        &mut self.rng
    }

    /// Registered component types as `(name, sorted (id, record) list)`,
    /// sorted by name. This is the enumeration snapshot capture consumes.
    pub fn component_entries(&self) -> Vec<(String, Vec<(EntityId, Record)>)> {
        let mut entries: Vec<(String, Vec<(EntityId, Record)>)> = self
            .defs
            .values()
            .map(|def| {
                let rows = match self.stores.get(&def.id()) {
                    Some(store) => store
                        .entity_ids()
                        .into_iter()
                        .filter_map(|id| store.get(id).map(|record| (id, record)))
                        .collect(),
                    None => Vec::new(),
                };
                (def.name().to_owned(), rows)
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    // ── Internals ────────────────────────────────────────────────────

    fn defer<T>(&mut self, command: Command, op: &'static str) -> EngineResult<Outcome<T>> {
        if self.strict {
            return Err(EngineError::IllegalMutationDuringTick { op });
        }
        self.deferred.push_back(command);
        Ok(Outcome::Deferred)
    }

    fn ensure_store(&mut self, def: &ComponentDef) {
        self.defs.entry(def.id()).or_insert_with(|| def.clone());
        let kind = self.store_kind;
        self.stores
            .entry(def.id())
            .or_insert_with(|| make_store(kind, def));
    }

    fn mark_changed(&mut self, component: ComponentId, id: EntityId) {
        self.changed.entry(component).or_default().insert(id);
    }

    fn invalidate_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    pub(crate) fn store(&self, component: ComponentId) -> Option<&dyn Store> {
        self.stores.get(&component).map(|store| store.as_ref())
    }

    pub(crate) fn was_changed(&self, component: ComponentId, id: EntityId) -> bool {
        self.changed
            .get(&component)
            .map(|marks| marks.contains(&id))
            .unwrap_or(false)
    }

    pub(crate) fn cached_ids(&self, key: &[ComponentId]) -> Option<Arc<Vec<EntityId>>> {
        self.cache.borrow().get(key).cloned()
    }

    pub(crate) fn cache_ids(&self, key: Vec<ComponentId>, ids: Arc<Vec<EntityId>>) {
        self.cache.borrow_mut().insert(key, ids);
    }

    pub(crate) fn restore_clock(&mut self, frame: Tick, time: f64) {
        self.frame = frame;
        self.time = time;
    }

    /// The captured world's change table was empty at its last tick
    /// boundary; a rebuilt world must start the same way.
    pub(crate) fn clear_changed(&mut self) {
        self.changed.clear();
    }

    fn apply_destroy(&mut self, id: EntityId) -> EngineResult<bool> {
        if !self.is_alive(id) {
            return Ok(false);
        }
        // Purge before freeing: a store must never hold a record for an id
        // sitting in the free pool.
        let mut purged: Vec<ComponentId> = Vec::new();
        for (component, store) in self.stores.iter_mut() {
            if store.delete(id) {
                purged.push(*component);
            }
        }
        for component in purged {
            self.mark_changed(component, id);
        }
        self.alive[id as usize] = false;
        self.alive_count -= 1;
        self.free.push(id);
        self.invalidate_cache();
        Ok(true)
    }

    fn apply_add(&mut self, id: EntityId, def: &ComponentDef, data: Record) -> EngineResult<Record> {
        if !self.is_alive(id) {
            return Err(EngineError::NotAlive { entity: id, op: "add" });
        }
        let mut record = def.defaults().clone();
        record.merge(&data);
        def.validate(&record)?;
        self.ensure_store(def);
        if let Some(store) = self.stores.get_mut(&def.id()) {
            store.set(id, record.clone());
        }
        self.mark_changed(def.id(), id);
        self.invalidate_cache();
        Ok(record)
    }

    fn apply_remove(&mut self, id: EntityId, def: &ComponentDef) -> EngineResult<bool> {
        if !self.is_alive(id) {
            return Err(EngineError::NotAlive { entity: id, op: "remove" });
        }
        let removed = self
            .stores
            .get_mut(&def.id())
            .map(|store| store.delete(id))
            .unwrap_or(false);
        if removed {
            self.mark_changed(def.id(), id);
            self.invalidate_cache();
        }
        Ok(removed)
    }

    fn apply_set(&mut self, id: EntityId, def: &ComponentDef, patch: Record) -> EngineResult<Record> {
        if !self.is_alive(id) {
            return Err(EngineError::NotAlive { entity: id, op: "set" });
        }
        let Some(existing) = self.get(id, def) else {
            return Err(EngineError::MissingComponent {
                entity: id,
                component: def.name().to_owned(),
            });
        };
        let mut merged = existing;
        merged.merge(&patch);
        def.validate(&merged)?;
        if let Some(store) = self.stores.get_mut(&def.id()) {
            store.set(id, merged.clone());
        }
        self.mark_changed(def.id(), id);
        Ok(merged)
    }

    fn apply_mutate(
        &mut self,
        id: EntityId,
        def: &ComponentDef,
        edit: Box<dyn FnOnce(&mut Record)>,
    ) -> EngineResult<Record> {
        if !self.is_alive(id) {
            return Err(EngineError::NotAlive { entity: id, op: "mutate" });
        }
        let Some(mut record) = self.get(id, def) else {
            return Err(EngineError::MissingComponent {
                entity: id,
                component: def.name().to_owned(),
            });
        };
        edit(&mut record);
        def.validate(&record)?;
        if let Some(store) = self.stores.get_mut(&def.id()) {
            store.set(id, record.clone());
        }
        self.mark_changed(def.id(), id);
        Ok(record)
    }

    fn apply_command(&mut self, command: Command) -> EngineResult<()> {
        match command {
            Command::Destroy { entity } => self.apply_destroy(entity).map(|_| ()),
            Command::Add { entity, def, data } => self.apply_add(entity, &def, data).map(|_| ()),
            Command::Remove { entity, def } => self.apply_remove(entity, &def).map(|_| ()),
            Command::Set { entity, def, patch } => self.apply_set(entity, &def, patch).map(|_| ()),
            Command::Mutate { entity, def, edit } => {
                self.apply_mutate(entity, &def, edit).map(|_| ())
            }
        }
    }

    /// Applies up to [`COMMAND_FLUSH_CAP`] queued commands in FIFO order.
    ///
    /// Runs with the in-tick flag cleared so drained commands execute with
    /// full non-deferred semantics; anything enqueued while draining joins
    /// the tail for the next cycle, behind any capped overflow.
    fn flush_deferred(&mut self) {
        let take = self.deferred.len().min(COMMAND_FLUSH_CAP);
        if take == 0 {
            return;
        }
        let batch: Vec<Command> = self.deferred.drain(..take).collect();
        let leftover = self.deferred.len();
        if leftover > 0 {
            log::debug!(
                "frame {}: flush cap reached, {leftover} commands carried to next tick",
                self.frame
            );
        }
        let was_in_tick = self.in_tick;
        self.in_tick = false;
        for command in batch {
            let op = command.op();
            if let Err(error) = self.apply_command(command) {
                log::warn!("frame {}: deferred {op} dropped: {error}", self.frame);
            }
        }
        self.in_tick = was_in_tick;
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldOptions::default())
    }
}
