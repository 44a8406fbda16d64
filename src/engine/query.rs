//! Query construction and execution.
//!
//! A query is an ordered list of terms — required components, `without`
//! exclusions, `changed` marks — plus optional dynamic row filtering,
//! ordering, and paging.
//!
//! ## Execution model
//! 1. **Normalize**: terms split into `all` (positive), `none` (negated) and
//!    `changed`; the cache key is the deduplicated sorted token list of
//!    `all`. An empty positive list uses the universal key meaning "all
//!    alive entities".
//! 2. **Resolve** the base id list: reuse the world's cached list for this
//!    key, or compute it by successively merge-intersecting each store's
//!    sorted id list (two-pointer merge, O(sum of list lengths)),
//!    short-circuiting to empty as soon as an intersection step empties.
//!    The result is cached under the key.
//! 3. **Filter lazily**: negation, change marks, and the caller predicate
//!    depend on per-tick state the cache cannot capture, so they run per id
//!    as the result is consumed.
//! 4. **Order and page**: with `order_by` the filtered result is fully
//!    materialized, sorted with the caller comparator, then windowed by
//!    `offset`/`limit`. Without it, offset/limit stream.
//!
//! The cache coherence policy is deliberately coarse: any structural
//! mutation anywhere in the world clears the entire cache.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::engine::component::ComponentDef;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::{ComponentId, EntityId};
use crate::engine::value::Record;
use crate::engine::world::World;

/// Merge-intersects two ascending id lists with a two-pointer walk.
pub(crate) fn intersect_sorted(a: &[EntityId], b: &[EntityId]) -> Vec<EntityId> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// One matched entity with the records of the query's positive terms, in
/// declaration order.
#[derive(Clone, Debug)]
pub struct Row {
    /// Matched entity id.
    pub entity: EntityId,

    /// One deep-copied record per positive term.
    pub records: Vec<Record>,
}

impl Row {
    /// Record of the `index`-th positive term.
    pub fn record(&self, index: usize) -> &Record {
        &self.records[index]
    }
}

/// Which flavor of result count to compute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountMode {
    /// Length of the cached base list; ignores dynamic filters. Cheap.
    Structural,
    /// Count after every dynamic filter has run. Ignores paging.
    Filtered,
}

#[derive(Clone)]
struct Term {
    id: ComponentId,
    name: String,
}

impl Term {
    fn of(def: &ComponentDef) -> Self {
        Self {
            id: def.id(),
            name: def.name().to_owned(),
        }
    }
}

type RowFilter<'w> = Box<dyn Fn(EntityId, &[Record]) -> bool + 'w>;
type RowOrder<'w> = Box<dyn Fn(&Row, &Row) -> Ordering + 'w>;

struct QueryCore<'w> {
    world: &'w World,
    all: Vec<Term>,
    none: Vec<Term>,
    changed: Vec<Term>,
    filter: Option<RowFilter<'w>>,
}

impl<'w> QueryCore<'w> {
    /// Cached (or computed-and-cached) base id list for the positive terms.
    fn base_ids(&self) -> Arc<Vec<EntityId>> {
        let mut key: Vec<ComponentId> = self.all.iter().map(|term| term.id).collect();
        key.sort_unstable();
        key.dedup();

        if let Some(ids) = self.world.cached_ids(&key) {
            return ids;
        }

        let ids = if key.is_empty() {
            self.world.alive_ids()
        } else {
            let mut acc: Option<Vec<EntityId>> = None;
            for component in &key {
                let list = self
                    .world
                    .store(*component)
                    .map(|store| store.entity_ids())
                    .unwrap_or_default();
                let next = match acc {
                    None => list,
                    Some(prev) => intersect_sorted(&prev, &list),
                };
                let empty = next.is_empty();
                acc = Some(next);
                if empty {
                    break;
                }
            }
            acc.unwrap_or_default()
        };

        let ids = Arc::new(ids);
        self.world.cache_ids(key, ids.clone());
        ids
    }

    /// Applies the dynamic filters to one id, yielding its row if it
    /// survives.
    fn row_for(&self, id: EntityId) -> Option<Row> {
        for term in &self.none {
            let present = self
                .world
                .store(term.id)
                .map(|store| store.has(id))
                .unwrap_or(false);
            if present {
                return None;
            }
        }
        for term in &self.changed {
            if !self.world.was_changed(term.id, id) {
                return None;
            }
        }
        let mut records = Vec::with_capacity(self.all.len());
        for term in &self.all {
            records.push(self.world.store(term.id)?.get(id)?);
        }
        if let Some(filter) = &self.filter {
            if !filter(id, &records) {
                return None;
            }
        }
        Some(Row { entity: id, records })
    }
}

/// Builder for component queries. Consumed on execution.
pub struct QueryBuilder<'w> {
    core: QueryCore<'w>,
    order: Option<RowOrder<'w>>,
    offset: usize,
    limit: Option<usize>,
}

impl<'w> QueryBuilder<'w> {
    pub(crate) fn new(world: &'w World) -> Self {
        Self {
            core: QueryCore {
                world,
                all: Vec::new(),
                none: Vec::new(),
                changed: Vec::new(),
                filter: None,
            },
            order: None,
            offset: 0,
            limit: None,
        }
    }

    /// Requires the component to be present; its record joins each row.
    pub fn with(mut self, def: &ComponentDef) -> Self {
        self.core.all.push(Term::of(def));
        self
    }

    /// Requires the component to be absent.
    pub fn without(mut self, def: &ComponentDef) -> Self {
        self.core.none.push(Term::of(def));
        self
    }

    /// Requires the component to carry a change mark from this tick.
    pub fn changed(mut self, def: &ComponentDef) -> Self {
        self.core.changed.push(Term::of(def));
        self
    }

    /// Installs a predicate over the fetched records and id.
    pub fn filter(mut self, predicate: impl Fn(EntityId, &[Record]) -> bool + 'w) -> Self {
        self.core.filter = Some(Box::new(predicate));
        self
    }

    /// Installs a row comparator; forces full materialization.
    pub fn order_by(mut self, comparator: impl Fn(&Row, &Row) -> Ordering + 'w) -> Self {
        self.order = Some(Box::new(comparator));
        self
    }

    /// Skips the first `n` rows of the (possibly sorted) result.
    pub fn offset(mut self, n: usize) -> Self {
        self.offset = n;
        self
    }

    /// Truncates the result to `n` rows.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    fn validate(&self) -> EngineResult<()> {
        for positive in &self.core.all {
            if self.core.none.iter().any(|term| term.id == positive.id) {
                return Err(EngineError::MalformedQueryOptions {
                    reason: format!("'{}' is both required and excluded", positive.name),
                });
            }
        }
        for changed in &self.core.changed {
            if self.core.none.iter().any(|term| term.id == changed.id) {
                return Err(EngineError::MalformedQueryOptions {
                    reason: format!("'{}' is both change-filtered and excluded", changed.name),
                });
            }
        }
        Ok(())
    }

    /// Lazily iterates matching rows.
    ///
    /// With `order_by` installed the full filtered result is materialized
    /// and sorted up front; otherwise rows stream straight off the cached
    /// base list with offset/limit applied on the fly.
    pub fn iter(self) -> EngineResult<QueryIter<'w>> {
        self.validate()?;
        let Self {
            core,
            order,
            offset,
            limit,
        } = self;
        let base = core.base_ids();

        if let Some(order) = order {
            let mut rows: Vec<Row> = base.iter().filter_map(|&id| core.row_for(id)).collect();
            rows.sort_by(|a, b| order(a, b));
            let windowed: Vec<Row> = match limit {
                Some(n) => rows.into_iter().skip(offset).take(n).collect(),
                None => rows.into_iter().skip(offset).collect(),
            };
            Ok(QueryIter {
                inner: IterInner::Sorted(windowed.into_iter()),
            })
        } else {
            Ok(QueryIter {
                inner: IterInner::Stream {
                    core,
                    base,
                    index: 0,
                    skip: offset,
                    remaining: limit,
                },
            })
        }
    }

    /// Materializes every matching row.
    pub fn rows(self) -> EngineResult<Vec<Row>> {
        Ok(self.iter()?.collect())
    }

    /// Materializes the matching entity ids.
    pub fn ids(self) -> EngineResult<Vec<EntityId>> {
        Ok(self.iter()?.map(|row| row.entity).collect())
    }

    /// Eagerly applies `f` to every matching row.
    pub fn run(self, mut f: impl FnMut(&Row)) -> EngineResult<()> {
        for row in self.iter()? {
            f(&row);
        }
        Ok(())
    }

    /// Free-form row projection, respecting ordering and paging.
    pub fn map<R>(self, mut f: impl FnMut(Row) -> R) -> EngineResult<Vec<R>> {
        Ok(self.iter()?.map(&mut f).collect())
    }

    /// Counts matches, either structurally (cheap) or fully filtered.
    pub fn count(self, mode: CountMode) -> EngineResult<usize> {
        self.validate()?;
        match mode {
            CountMode::Structural => Ok(self.core.base_ids().len()),
            CountMode::Filtered => {
                let base = self.core.base_ids();
                Ok(base
                    .iter()
                    .filter(|&&id| self.core.row_for(id).is_some())
                    .count())
            }
        }
    }
}

enum IterInner<'w> {
    Stream {
        core: QueryCore<'w>,
        base: Arc<Vec<EntityId>>,
        index: usize,
        skip: usize,
        remaining: Option<usize>,
    },
    Sorted(std::vec::IntoIter<Row>),
}

/// Iterator over query rows. See [`QueryBuilder::iter`].
pub struct QueryIter<'w> {
    inner: IterInner<'w>,
}

impl Iterator for QueryIter<'_> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        match &mut self.inner {
            IterInner::Sorted(rows) => rows.next(),
            IterInner::Stream {
                core,
                base,
                index,
                skip,
                remaining,
            } => {
                if matches!(remaining, Some(0)) {
                    return None;
                }
                while *index < base.len() {
                    let id = base[*index];
                    *index += 1;
                    let Some(row) = core.row_for(id) else { continue };
                    if *skip > 0 {
                        *skip -= 1;
                        continue;
                    }
                    if let Some(n) = remaining {
                        *n -= 1;
                    }
                    return Some(row);
                }
                None
            }
        }
    }
}
