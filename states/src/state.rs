use std::any::Any;

/// A piece of application state stored in a [`StateCtx`](crate::StateCtx).
///
/// States are addressed by their `TypeId`; one value per type. Implementors
/// provide the `Any` plumbing explicitly so the container never needs
/// unsafe pointer tricks.
///
/// `snapshot()` returns a boxed clone handed to commands at dispatch time.
/// The default returns `None`, which makes the state invisible to
/// [`CommandSnapshot`](crate::CommandSnapshot); states that commands read
/// must override it.
pub trait State: Any + Send {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Boxed clone used to build command snapshots.
    fn snapshot(&self) -> Option<Box<dyn Any + Send>> {
        None
    }

    /// Apply a queued replacement produced by [`Updater::set`](crate::Updater::set).
    ///
    /// Implement with [`state_assign_impl`].
    fn assign_box(&mut self, new_self: Box<dyn Any + Send>);
}

/// Downcast-and-replace helper backing every `assign_box` implementation.
///
/// A type mismatch is a registration bug, not a user error; it is logged and
/// the previous value is kept.
pub fn state_assign_impl<T: State>(dst: &mut T, new_self: Box<dyn Any + Send>) {
    match new_self.downcast::<T>() {
        Ok(value) => *dst = *value,
        Err(_) => log::error!(
            "state assign: update payload is not a {}",
            std::any::type_name::<T>()
        ),
    }
}
