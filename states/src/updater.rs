use std::any::{Any, TypeId};

use flume::Sender;

use crate::State;

/// A single queued state transition.
pub(crate) enum StateUpdate {
    /// Replace the stored value wholesale.
    Assign(TypeId, Box<dyn Any + Send>),
    /// Mutate the stored value in place; the closure receives the slot's
    /// `as_any_mut()` and downcasts internally.
    Mutate(TypeId, Box<dyn FnOnce(&mut dyn Any) + Send>),
}

/// Cloneable handle for publishing state transitions from commands and
/// computes.
///
/// Updates are queued on an unbounded channel and applied in send order by
/// [`StateCtx::sync_computes`](crate::StateCtx::sync_computes). Sending never
/// blocks; updates sent after the owning context is disposed are dropped.
#[derive(Clone)]
pub struct Updater {
    tx: Sender<StateUpdate>,
}

impl Updater {
    pub(crate) fn new(tx: Sender<StateUpdate>) -> Self {
        Self { tx }
    }

    /// Queue a wholesale replacement of `T`.
    pub fn set<T: State>(&self, value: T) {
        let _ = self
            .tx
            .send(StateUpdate::Assign(TypeId::of::<T>(), Box::new(value)));
    }

    /// Queue an in-place mutation of `T`.
    ///
    /// This is the serializing path for reducer-style transitions: closures
    /// from any number of in-flight commands are applied one at a time, in
    /// the order they were sent, against the then-current value.
    pub fn update<T: State>(&self, f: impl FnOnce(&mut T) + Send + 'static) {
        let mutate = Box::new(move |any: &mut dyn Any| match any.downcast_mut::<T>() {
            Some(value) => f(value),
            None => log::error!(
                "queued mutation targets a {} but the slot holds another type",
                std::any::type_name::<T>()
            ),
        });
        let _ = self.tx.send(StateUpdate::Mutate(TypeId::of::<T>(), mutate));
    }
}
