use std::any::TypeId;

use tokio_util::sync::CancellationToken;

/// Identifier for a spawned command task: the command's `TypeId` plus a
/// monotonically increasing generation, so repeated dispatches of the same
/// command stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId {
    type_id: TypeId,
    generation: u64,
}

impl TaskId {
    pub fn new(type_id: TypeId, generation: u64) -> Self {
        Self {
            type_id,
            generation,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Higher generations are more recent dispatches.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Handle to a spawned command with cooperative cancellation.
///
/// Cancellation is a request, not an abort: the command must observe the
/// token (or simply finish). Disposing the owning context cancels every
/// outstanding handle.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    cancel_token: CancellationToken,
}

impl TaskHandle {
    pub fn new(id: TaskId, cancel_token: CancellationToken) -> Self {
        Self { id, cancel_token }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}
