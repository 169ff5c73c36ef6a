use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::{Compute, State, Updater};

/// Boxed future returned by [`Command::run`].
pub type CommandFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A manual-only action dispatched explicitly via
/// [`StateCtx::dispatch`](crate::StateCtx::dispatch).
///
/// Commands are the only place side effects (network IO, timers) are allowed
/// to live; derived computes can run implicitly and must stay pure. A command
/// receives an owned snapshot of the states that were registered at dispatch
/// time and publishes results through the [`Updater`].
///
/// The cancellation token is cancelled when the owning context is disposed;
/// long-lived commands may observe it, short mutations are free to ignore it.
pub trait Command: Send + Sync + Any {
    fn run(&self, snap: CommandSnapshot, updater: Updater, cancel: CancellationToken)
    -> CommandFuture;
}

/// Owned clones of every snapshot-capable state, captured at dispatch time.
///
/// Reads panic on a missing entry: a command asking for a state that was
/// never registered (or that does not implement `snapshot()`) is a wiring
/// bug, and failing loudly in tests beats limping along.
pub struct CommandSnapshot {
    entries: BTreeMap<TypeId, Box<dyn Any + Send>>,
}

impl CommandSnapshot {
    pub(crate) fn new(entries: BTreeMap<TypeId, Box<dyn Any + Send>>) -> Self {
        Self { entries }
    }

    pub fn state<T: State>(&self) -> &T {
        self.try_state::<T>().unwrap_or_else(|| {
            panic!(
                "command snapshot is missing {}; register it and implement snapshot()",
                std::any::type_name::<T>()
            )
        })
    }

    /// Compute caches snapshot through the same storage as plain states.
    pub fn compute<T: Compute>(&self) -> &T {
        self.state::<T>()
    }

    pub fn try_state<T: State>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }
}
