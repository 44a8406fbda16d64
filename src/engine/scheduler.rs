//! System registration and deterministic execution ordering.
//!
//! Systems are plain functions registered under caller-chosen **phases**
//! with optional `before`/`after` hints naming other systems. Each phase
//! resolves to a deterministic execution order:
//!
//! * hints build a directed graph where an edge `u → v` means *u runs
//!   before v*,
//! * a depth-first post-order traversal from every node (in insertion
//!   order), reversed, yields the order — the standard DFS topological
//!   sort, stable with respect to registration order,
//! * an explicit full ordering installed for a phase bypasses resolution
//!   entirely.
//!
//! Cyclic hints fail fast with
//! [`CycleDetected`](crate::engine::error::EngineError::CycleDetected)
//! instead of silently producing a partial order.
//!
//! ## Error isolation
//! Running a phase catches and logs each system's error rather than
//! propagating it: one misbehaving system must not abort the simulation
//! step. Direct API errors elsewhere in the engine always propagate; this
//! boundary is the deliberate exception.
//!
//! The scheduler is an explicit object with its own lifecycle (construct,
//! register, resolve, clear) — no module-level registries, so independent
//! worlds never share ordering state by accident.

use crate::engine::error::{CycleError, EngineResult};
use crate::engine::world::World;

/// Anything installable as a world's tick driver.
pub trait Schedule {
    /// Executes one simulation step against `world`.
    fn run(&mut self, world: &mut World, dt: f64) -> EngineResult<()>;
}

impl<F> Schedule for F
where
    F: FnMut(&mut World, f64) -> EngineResult<()>,
{
    fn run(&mut self, world: &mut World, dt: f64) -> EngineResult<()> {
        self(world, dt)
    }
}

/// Boxed system function.
pub type SystemFn = Box<dyn FnMut(&mut World, f64) -> EngineResult<()>>;

/// Ordering hints attached to a system at registration.
#[derive(Clone, Debug, Default)]
pub struct OrderHints {
    before: Vec<String>,
    after: Vec<String>,
}

impl OrderHints {
    /// No constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// This system must run before `system`.
    pub fn before(mut self, system: &str) -> Self {
        self.before.push(system.to_owned());
        self
    }

    /// This system must run after `system`.
    pub fn after(mut self, system: &str) -> Self {
        self.after.push(system.to_owned());
        self
    }
}

struct SystemEntry {
    name: String,
    hints: OrderHints,
    run: SystemFn,
}

struct Phase {
    name: String,
    systems: Vec<SystemEntry>,
    explicit: Option<Vec<String>>,
}

/// Registry of phased, interdependent system functions.
#[derive(Default)]
pub struct Scheduler {
    phases: Vec<Phase>,
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `system` under `phase`, creating the phase on first use.
    ///
    /// Phases run in the order they were first named; systems with no
    /// binding hints run in registration order.
    pub fn register(
        &mut self,
        phase: &str,
        name: &str,
        hints: OrderHints,
        system: impl FnMut(&mut World, f64) -> EngineResult<()> + 'static,
    ) {
        let phase = self.phase_mut(phase);
        phase.systems.push(SystemEntry {
            name: name.to_owned(),
            hints,
            run: Box::new(system),
        });
    }

    /// Installs an explicit full ordering for `phase`, bypassing automatic
    /// resolution. Names absent from the list do not run.
    pub fn set_phase_order(&mut self, phase: &str, order: &[&str]) {
        let phase = self.phase_mut(phase);
        phase.explicit = Some(order.iter().map(|s| (*s).to_owned()).collect());
    }

    /// Removes every phase and system.
    pub fn clear(&mut self) {
        self.phases.clear();
    }

    /// Registered phase names, in first-use order.
    pub fn phase_names(&self) -> Vec<String> {
        self.phases.iter().map(|p| p.name.clone()).collect()
    }

    /// Resolved execution order for `phase`. An unknown phase resolves to
    /// an empty order.
    pub fn ordered_systems(&self, phase: &str) -> EngineResult<Vec<String>> {
        let Some(phase) = self.phases.iter().find(|p| p.name == phase) else {
            return Ok(Vec::new());
        };
        if let Some(explicit) = &phase.explicit {
            return Ok(explicit.clone());
        }
        resolve_order(phase)
    }

    /// Runs one phase, executing its resolved system list in order.
    ///
    /// Per-system errors are logged and swallowed. A cyclic hint graph logs
    /// the cycle and runs nothing.
    pub fn run_phase(&mut self, phase: &str, world: &mut World, dt: f64) {
        let order = match self.ordered_systems(phase) {
            Ok(order) => order,
            Err(error) => {
                log::error!("phase '{phase}' not run: {error}");
                return;
            }
        };
        let Some(phase_entry) = self.phases.iter_mut().find(|p| p.name == phase) else {
            return;
        };
        for name in order {
            let Some(entry) = phase_entry.systems.iter_mut().find(|s| s.name == name) else {
                continue;
            };
            if let Err(error) = (entry.run)(world, dt) {
                log::error!("system '{name}' failed: {error}");
            }
        }
    }

    fn phase_mut(&mut self, name: &str) -> &mut Phase {
        if let Some(index) = self.phases.iter().position(|p| p.name == name) {
            return &mut self.phases[index];
        }
        self.phases.push(Phase {
            name: name.to_owned(),
            systems: Vec::new(),
            explicit: None,
        });
        let index = self.phases.len() - 1;
        &mut self.phases[index]
    }
}

impl Schedule for Scheduler {
    fn run(&mut self, world: &mut World, dt: f64) -> EngineResult<()> {
        let phases = self.phase_names();
        for phase in phases {
            self.run_phase(&phase, world, dt);
        }
        Ok(())
    }
}

/// DFS-based topological sort over one phase's hint graph.
///
/// Nodes are visited in insertion order; each node is appended after all of
/// its successors (post-order) and the output reversed, so the result is
/// stable across repeated resolution of the same registrations. Hints
/// naming unregistered systems are ignored.
fn resolve_order(phase: &Phase) -> EngineResult<Vec<String>> {
    let n = phase.systems.len();
    let index_of = |name: &str| phase.systems.iter().position(|s| s.name == name);

    // adjacency[u] holds v where u must run before v
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (u, entry) in phase.systems.iter().enumerate() {
        for target in &entry.hints.before {
            if let Some(v) = index_of(target) {
                adjacency[u].push(v);
            }
        }
        for source in &entry.hints.after {
            if let Some(v) = index_of(source) {
                adjacency[v].push(u);
            }
        }
    }

    const WHITE: u8 = 0;
    const GRAY: u8 = 1;
    const BLACK: u8 = 2;

    let mut color = vec![WHITE; n];
    let mut post_order: Vec<usize> = Vec::with_capacity(n);

    fn visit(
        node: usize,
        adjacency: &[Vec<usize>],
        color: &mut [u8],
        post_order: &mut Vec<usize>,
        phase: &Phase,
    ) -> EngineResult<()> {
        color[node] = GRAY;
        for &next in &adjacency[node] {
            match color[next] {
                WHITE => visit(next, adjacency, color, post_order, phase)?,
                GRAY => {
                    return Err(CycleError {
                        phase: phase.name.clone(),
                        system: phase.systems[next].name.clone(),
                    }
                    .into())
                }
                _ => {}
            }
        }
        color[node] = BLACK;
        post_order.push(node);
        Ok(())
    }

    // Roots are taken in reverse insertion order: the final reversal then
    // restores registration order for nodes no edge constrains.
    for node in (0..n).rev() {
        if color[node] == WHITE {
            visit(node, &adjacency, &mut color, &mut post_order, phase)?;
        }
    }

    post_order.reverse();
    Ok(post_order
        .into_iter()
        .map(|node| phase.systems[node].name.clone())
        .collect())
}
