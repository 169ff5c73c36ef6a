use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeMap, BTreeSet};

use tokio_util::sync::CancellationToken;

use crate::command::{Command, CommandSnapshot};
use crate::graph::{Graph, TopologyError};
use crate::state::State;
use crate::state_sync_status::StateSyncStatus;
use crate::task::{TaskHandle, TaskId};
use crate::updater::{StateUpdate, Updater};

/// Static dependency declaration of a [`Compute`]: `(state TypeIds,
/// compute TypeIds)` it reads during `compute()`.
pub type ComputeDeps = (&'static [TypeId], &'static [TypeId]);

/// A value derived from other states, or a command-updated cache.
///
/// Derived computes re-run during [`StateCtx::sync_computes`] whenever one of
/// their declared dependencies went dirty; they read through [`Dep`] and
/// publish their next value with [`Updater::set`]. Caches declare no
/// dependencies and leave `compute()` a no-op; commands feed them instead.
///
/// `compute()` must stay pure: it can run implicitly (first sync, dirty
/// propagation), so side effects belong in a [`Command`].
pub trait Compute: State {
    fn deps(&self) -> ComputeDeps;

    fn compute(&self, deps: Dep<'_>, updater: Updater);
}

/// Borrowed read-only view over the registered states, handed to a derived
/// compute while it runs.
pub struct Dep<'a> {
    entries: &'a BTreeMap<TypeId, Entry>,
}

impl<'a> Dep<'a> {
    pub fn get_state_ref<T: State>(&self) -> &'a T {
        self.try_state_ref::<T>().unwrap_or_else(|| {
            panic!("dependency {} is not registered", type_name::<T>())
        })
    }

    pub fn get_compute_ref<T: Compute>(&self) -> &'a T {
        self.get_state_ref::<T>()
    }

    pub fn try_state_ref<T: State>(&self) -> Option<&'a T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.slot.as_any().downcast_ref::<T>())
    }
}

enum Slot {
    Plain(Box<dyn State>),
    Derived(Box<dyn Compute>),
}

impl Slot {
    fn as_any(&self) -> &dyn Any {
        match self {
            Slot::Plain(state) => state.as_any(),
            Slot::Derived(compute) => compute.as_any(),
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        match self {
            Slot::Plain(state) => state.as_any_mut(),
            Slot::Derived(compute) => compute.as_any_mut(),
        }
    }

    fn snapshot(&self) -> Option<Box<dyn Any + Send>> {
        match self {
            Slot::Plain(state) => state.snapshot(),
            Slot::Derived(compute) => compute.snapshot(),
        }
    }

    fn assign_box(&mut self, new_self: Box<dyn Any + Send>) {
        match self {
            Slot::Plain(state) => state.assign_box(new_self),
            Slot::Derived(compute) => compute.assign_box(new_self),
        }
    }

    fn as_compute(&self) -> Option<&dyn Compute> {
        match self {
            Slot::Plain(_) => None,
            Slot::Derived(compute) => Some(compute.as_ref()),
        }
    }
}

struct Entry {
    slot: Slot,
    status: StateSyncStatus,
}

struct RunningTask {
    handle: TaskHandle,
    join: tokio::task::JoinHandle<()>,
}

/// Container owning every registered state, compute and command.
///
/// One `StateCtx` per logical application; create with [`StateCtx::new`] and
/// tear down with [`StateCtx::dispose`]. The context is an explicit handle
/// passed to whoever needs it; nothing here is a global.
pub struct StateCtx {
    entries: BTreeMap<TypeId, Entry>,
    commands: BTreeMap<TypeId, Box<dyn Command>>,
    graph: Graph<TypeId>,
    tx: flume::Sender<StateUpdate>,
    rx: flume::Receiver<StateUpdate>,
    tasks: Vec<RunningTask>,
    next_generation: u64,
}

impl Default for StateCtx {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCtx {
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            entries: BTreeMap::new(),
            commands: BTreeMap::new(),
            graph: Graph::new(),
            tx,
            rx,
            tasks: Vec::new(),
            next_generation: 0,
        }
    }

    pub fn add_state<T: State>(&mut self, state: T) {
        self.entries.insert(
            TypeId::of::<T>(),
            Entry {
                slot: Slot::Plain(Box::new(state)),
                status: StateSyncStatus::BeforeInit,
            },
        );
    }

    /// Register a compute and record its dependency edges.
    pub fn record_compute<T: Compute>(&mut self, compute: T) {
        let id = TypeId::of::<T>();
        let (state_deps, compute_deps) = compute.deps();
        for &dep in state_deps.iter().chain(compute_deps) {
            self.graph.route_to(dep, id);
        }
        self.entries.insert(
            id,
            Entry {
                slot: Slot::Derived(Box::new(compute)),
                status: StateSyncStatus::BeforeInit,
            },
        );
    }

    pub fn record_command<C: Command>(&mut self, command: C) {
        self.commands.insert(TypeId::of::<C>(), Box::new(command));
    }

    pub fn state<T: State>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.slot.as_any().downcast_ref::<T>())
    }

    /// Direct mutable access; marks the state dirty for the next sync.
    ///
    /// Panics when `T` was never registered — that is a wiring bug, and the
    /// callsites (UI event handlers, tests) have no useful recovery.
    pub fn state_mut<T: State>(&mut self) -> &mut T {
        let entry = self
            .entries
            .get_mut(&TypeId::of::<T>())
            .unwrap_or_else(|| panic!("state {} is not registered", type_name::<T>()));
        entry.status = StateSyncStatus::Dirty;
        entry
            .slot
            .as_any_mut()
            .downcast_mut::<T>()
            .unwrap_or_else(|| panic!("slot for {} holds another type", type_name::<T>()))
    }

    /// Synchronous in-place mutation, the single-writer path for reducer
    /// transitions dispatched from the event loop itself.
    pub fn update<T: State>(&mut self, f: impl FnOnce(&mut T)) {
        f(self.state_mut::<T>());
    }

    /// Read a compute's cached value.
    pub fn cached<T: Compute>(&self) -> Option<&T> {
        self.state::<T>()
    }

    pub fn updater(&self) -> Updater {
        Updater::new(self.tx.clone())
    }

    fn command_snapshot(&self) -> CommandSnapshot {
        let entries = self
            .entries
            .iter()
            .filter_map(|(&id, entry)| entry.slot.snapshot().map(|boxed| (id, boxed)))
            .collect();
        CommandSnapshot::new(entries)
    }

    /// Dispatch a registered command.
    ///
    /// Inside a tokio runtime the command is spawned and runs concurrently;
    /// callers then `sync_computes()` once results are expected. Without an
    /// ambient runtime (plain `#[test]`s, simple binaries) the command runs
    /// to completion on a throwaway current-thread runtime before returning.
    pub fn dispatch<C: Command>(&mut self) {
        if !self.commands.contains_key(&TypeId::of::<C>()) {
            log::error!("command {} is not registered", type_name::<C>());
            return;
        }

        let snap = self.command_snapshot();
        let updater = self.updater();
        let token = CancellationToken::new();
        self.next_generation += 1;
        let handle = TaskHandle::new(
            TaskId::new(TypeId::of::<C>(), self.next_generation),
            token.clone(),
        );

        let Some(command) = self.commands.get(&TypeId::of::<C>()) else {
            return;
        };
        let fut = command.run(snap, updater, token);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let join = runtime.spawn(fut);
                self.tasks.retain(|task| !task.join.is_finished());
                self.tasks.push(RunningTask { handle, join });
            }
            Err(_) => match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime.block_on(fut),
                Err(e) => log::error!("dispatch {}: no runtime available: {e}", type_name::<C>()),
            },
        }
    }

    /// Drain the update queue in send order, then re-run derived computes
    /// downstream of whatever changed.
    ///
    /// Each queued update applies atomically with respect to this
    /// single-threaded pass; two transitions never interleave partially.
    pub fn sync_computes(&mut self) {
        self.apply_queued();

        let dirty: BTreeSet<TypeId> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.status == StateSyncStatus::Dirty)
            .map(|(&id, _)| id)
            .collect();

        // First sync runs every derived compute once; afterwards only the
        // ones downstream of a dirty node.
        let mut affected: BTreeSet<TypeId> = self
            .entries
            .iter()
            .filter(|(_, entry)| {
                entry.slot.as_compute().is_some() && entry.status == StateSyncStatus::BeforeInit
            })
            .map(|(&id, _)| id)
            .collect();
        for &id in &dirty {
            for reached in self.graph.reachable(id) {
                affected.insert(reached);
            }
        }

        // Recompute in dependency order, flushing the queue between runs so a
        // chained compute reads its upstream's fresh value.
        let mut order: Vec<TypeId> = Vec::with_capacity(affected.len());
        match self.graph.topology_sort() {
            Ok(sorted) => {
                for id in sorted {
                    if affected.remove(&id) {
                        order.push(id);
                    }
                }
                // Dependency-free caches never enter the graph.
                order.extend(affected);
            }
            Err(e) => {
                log::error!("compute graph is invalid, syncing in arbitrary order: {e}");
                order.extend(affected);
            }
        }
        for id in order {
            self.apply_queued();
            // Take the compute out of storage so it can borrow the rest.
            let Some(mut entry) = self.entries.remove(&id) else {
                continue;
            };
            if let Some(compute) = entry.slot.as_compute() {
                entry.status = StateSyncStatus::Pending;
                compute.compute(
                    Dep {
                        entries: &self.entries,
                    },
                    self.updater(),
                );
            }
            self.entries.insert(id, entry);
        }

        // Apply whatever the computes just published.
        self.apply_queued();

        for entry in self.entries.values_mut() {
            entry.status = StateSyncStatus::Clean;
        }
    }

    fn apply_queued(&mut self) {
        while let Ok(update) = self.rx.try_recv() {
            let (id, apply): (TypeId, Box<dyn FnOnce(&mut Entry)>) = match update {
                StateUpdate::Assign(id, boxed) => {
                    (id, Box::new(move |entry: &mut Entry| entry.slot.assign_box(boxed)))
                }
                StateUpdate::Mutate(id, f) => {
                    (id, Box::new(move |entry: &mut Entry| f(entry.slot.as_any_mut())))
                }
            };
            match self.entries.get_mut(&id) {
                Some(entry) => {
                    apply(entry);
                    entry.status = StateSyncStatus::Dirty;
                }
                None => log::warn!("dropping queued update for unregistered state {id:?}"),
            }
        }
    }

    /// Validate the compute dependency graph.
    pub fn verify_deps(&mut self) -> Result<(), TopologyError<TypeId>> {
        self.graph.topology_sort().map(|_| ())
    }

    /// Number of command task handles still retained; settled tasks are
    /// pruned on the next dispatch.
    pub fn running_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Cancel outstanding command tasks and drop all stored state.
    pub fn dispose(&mut self) {
        for task in self.tasks.drain(..) {
            task.handle.cancel();
        }
        self.commands.clear();
        self.entries.clear();
    }
}

impl Drop for StateCtx {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.handle.cancel();
        }
    }
}
