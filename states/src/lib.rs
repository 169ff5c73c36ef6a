//! Typed state runtime for the portal client.
//!
//! The runtime keeps every piece of application state in a single [`StateCtx`]
//! container, addressed by type:
//!
//! - a [`State`] is plain data the caller mutates synchronously;
//! - a [`Compute`] is either a value derived from other states or a
//!   command-updated cache read through the same path;
//! - a [`Command`] is a manual-only async action (allowed to do network IO)
//!   that publishes results through an [`Updater`].
//!
//! All updates produced by commands and computes travel one `flume` channel
//! and are applied in send order by [`StateCtx::sync_computes`], so state
//! transitions stay atomic under an event-loop concurrency model without any
//! locking.

mod command;
mod ctx;
mod graph;
mod state;
mod state_sync_status;
mod task;
mod updater;

pub use command::{Command, CommandFuture, CommandSnapshot};
pub use ctx::{Compute, ComputeDeps, Dep, StateCtx};
pub use graph::{DepRoute, Graph, TopologyError};
pub use state::{State, state_assign_impl};
pub use state_sync_status::StateSyncStatus;
pub use task::{TaskHandle, TaskId};
pub use updater::Updater;

#[cfg(test)]
mod ctx_tests {
    use super::*;
    use std::any::{Any, TypeId};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Counter {
        value: i64,
    }

    impl State for Counter {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }

        fn snapshot(&self) -> Option<Box<dyn Any + Send>> {
            Some(Box::new(self.clone()))
        }

        fn assign_box(&mut self, new_self: Box<dyn Any + Send>) {
            state_assign_impl(self, new_self);
        }
    }

    /// Derived compute: doubles whatever `Counter` holds.
    #[derive(Debug, Clone, Default)]
    struct Doubled {
        value: i64,
    }

    impl State for Doubled {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }

        fn snapshot(&self) -> Option<Box<dyn Any + Send>> {
            Some(Box::new(self.clone()))
        }

        fn assign_box(&mut self, new_self: Box<dyn Any + Send>) {
            state_assign_impl(self, new_self);
        }
    }

    impl Compute for Doubled {
        fn deps(&self) -> ComputeDeps {
            const STATE_IDS: [TypeId; 1] = [TypeId::of::<Counter>()];
            const COMPUTE_IDS: [TypeId; 0] = [];
            (&STATE_IDS, &COMPUTE_IDS)
        }

        fn compute(&self, deps: Dep<'_>, updater: Updater) {
            let counter = deps.get_state_ref::<Counter>();
            updater.set(Doubled {
                value: counter.value * 2,
            });
        }
    }

    /// Second-level compute reading `Doubled` rather than the raw state.
    #[derive(Debug, Clone, Default)]
    struct Quadrupled {
        value: i64,
    }

    impl State for Quadrupled {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }

        fn snapshot(&self) -> Option<Box<dyn Any + Send>> {
            Some(Box::new(self.clone()))
        }

        fn assign_box(&mut self, new_self: Box<dyn Any + Send>) {
            state_assign_impl(self, new_self);
        }
    }

    impl Compute for Quadrupled {
        fn deps(&self) -> ComputeDeps {
            const STATE_IDS: [TypeId; 0] = [];
            const COMPUTE_IDS: [TypeId; 1] = [TypeId::of::<Doubled>()];
            (&STATE_IDS, &COMPUTE_IDS)
        }

        fn compute(&self, deps: Dep<'_>, updater: Updater) {
            let doubled = deps.get_compute_ref::<Doubled>();
            updater.set(Quadrupled {
                value: doubled.value * 2,
            });
        }
    }

    struct AddOneCommand;

    impl Command for AddOneCommand {
        fn run(
            &self,
            _snap: CommandSnapshot,
            updater: Updater,
            _cancel: tokio_util::sync::CancellationToken,
        ) -> CommandFuture {
            Box::pin(async move {
                updater.update::<Counter>(|c| c.value += 1);
            })
        }
    }

    #[test]
    fn derived_compute_follows_state() {
        let mut ctx = StateCtx::new();
        ctx.add_state(Counter::default());
        ctx.record_compute(Doubled::default());

        ctx.update::<Counter>(|c| c.value = 21);
        ctx.sync_computes();

        let doubled = ctx.cached::<Doubled>().expect("compute registered");
        assert_eq!(doubled.value, 42);
    }

    #[test]
    fn chained_compute_reads_fresh_upstream_value() {
        let mut ctx = StateCtx::new();
        ctx.add_state(Counter::default());
        ctx.record_compute(Doubled::default());
        ctx.record_compute(Quadrupled::default());

        ctx.update::<Counter>(|c| c.value = 5);
        ctx.sync_computes();

        assert_eq!(ctx.cached::<Doubled>().map(|d| d.value), Some(10));
        assert_eq!(ctx.cached::<Quadrupled>().map(|q| q.value), Some(20));
    }

    #[tokio::test]
    async fn settled_command_tasks_are_pruned_on_dispatch() {
        let mut ctx = StateCtx::new();
        ctx.add_state(Counter::default());
        ctx.record_command(AddOneCommand);

        for _ in 0..8 {
            ctx.dispatch::<AddOneCommand>();
            // Let the spawned task run to completion before the next round.
            tokio::task::yield_now().await;
        }
        ctx.sync_computes();

        assert_eq!(ctx.state::<Counter>().map(|c| c.value), Some(8));
        // The last dispatch pruned every earlier, already settled handle.
        assert_eq!(ctx.running_tasks(), 1);
    }

    #[test]
    fn queued_updates_apply_in_send_order() {
        let mut ctx = StateCtx::new();
        ctx.add_state(Counter::default());

        let updater = ctx.updater();
        updater.update::<Counter>(|c| c.value += 1);
        updater.update::<Counter>(|c| c.value *= 10);
        updater.set(Counter { value: 7 });
        updater.update::<Counter>(|c| c.value += 1);
        ctx.sync_computes();

        // (0 + 1) * 10 is replaced by 7, then incremented.
        assert_eq!(ctx.state::<Counter>().map(|c| c.value), Some(8));
    }

    #[test]
    fn verify_deps_rejects_compute_cycles() {
        #[derive(Debug, Clone, Default)]
        struct A;
        #[derive(Debug, Clone, Default)]
        struct B;

        macro_rules! cycle_compute {
            ($ty:ty, $dep:ty) => {
                impl State for $ty {
                    fn as_any(&self) -> &dyn Any {
                        self
                    }
                    fn as_any_mut(&mut self) -> &mut dyn Any {
                        self
                    }
                    fn assign_box(&mut self, new_self: Box<dyn Any + Send>) {
                        state_assign_impl(self, new_self);
                    }
                }
                impl Compute for $ty {
                    fn deps(&self) -> ComputeDeps {
                        const STATE_IDS: [TypeId; 0] = [];
                        const COMPUTE_IDS: [TypeId; 1] = [TypeId::of::<$dep>()];
                        (&STATE_IDS, &COMPUTE_IDS)
                    }
                    fn compute(&self, _deps: Dep<'_>, _updater: Updater) {}
                }
            };
        }

        cycle_compute!(A, B);
        cycle_compute!(B, A);

        let mut ctx = StateCtx::new();
        ctx.record_compute(A);
        ctx.record_compute(B);

        assert!(matches!(
            ctx.verify_deps(),
            Err(TopologyError::CycleDetected(_))
        ));
    }

    #[test]
    fn dispose_clears_storage() {
        let mut ctx = StateCtx::new();
        ctx.add_state(Counter { value: 3 });
        ctx.dispose();
        assert!(ctx.state::<Counter>().is_none());
    }
}
