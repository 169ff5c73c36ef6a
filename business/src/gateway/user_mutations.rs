//! Remote user creation.
//!
//! Success applies the service-assigned record to the local directory
//! through the reducer and invalidates the cached users collection, so both
//! consumption paths (local append, cache re-fetch) observe the new member.

use std::any::{Any, TypeId};

use flock_states::{
    Command, CommandFuture, CommandSnapshot, Compute, ComputeDeps, Dep, State, Updater,
    state_assign_impl,
};
use tokio_util::sync::CancellationToken;

use super::{GatewayInput, MutationOp, MutationState, api, cache::CollectionCaches, resolve_api_url};
use crate::config::PortalConfig;
use crate::directory::{DirectoryAction, DirectoryState};
use crate::notifications::Notifications;

/// Command-updated cache holding the latest user mutation's state machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserMutationCompute {
    pub state: MutationState,
}

impl State for UserMutationCompute {
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

impl Compute for UserMutationCompute {
    fn deps(&self) -> ComputeDeps {
        const STATE_IDS: [TypeId; 0] = [];
        const COMPUTE_IDS: [TypeId; 0] = [];
        (&STATE_IDS, &COMPUTE_IDS)
    }

    // Updated by CreateRemoteUserCommand, never derived.
    fn compute(&self, _deps: Dep<'_>, _updater: Updater) {}
}

/// POST the staged `GatewayInput::new_user` to the service.
#[derive(Debug, Default)]
pub struct CreateRemoteUserCommand;

impl Command for CreateRemoteUserCommand {
    fn run(
        &self,
        snap: CommandSnapshot,
        updater: Updater,
        _cancel: CancellationToken,
    ) -> CommandFuture {
        let input = snap.state::<GatewayInput>().clone();
        let api_url = resolve_api_url(&input, snap.state::<PortalConfig>());

        updater.set(UserMutationCompute {
            state: MutationState::Pending(MutationOp::CreateUser),
        });

        Box::pin(async move {
            let Some(user) = input.new_user else {
                fail(&updater, "no user to create".to_owned());
                return;
            };

            match api::create_user(&api_url, &user).await {
                Ok(created) => {
                    log::info!("remote user created: {}", created.id);
                    let full_name = created.full_name();
                    let appended = created.clone();
                    updater.update::<DirectoryState>(move |dir| {
                        dir.apply(DirectoryAction::AddUser(appended));
                    });
                    updater.update::<CollectionCaches>(|caches| caches.users.invalidate());
                    updater
                        .update::<Notifications>(move |n| n.push_info(format!("{full_name} added")));
                    updater.set(UserMutationCompute {
                        state: MutationState::Succeeded(MutationOp::CreateUser),
                    });
                }
                Err(e) => fail(&updater, e.message),
            }
        })
    }
}

fn fail(updater: &Updater, message: String) {
    log::warn!("user creation failed: {message}");
    let notice = message.clone();
    updater.update::<Notifications>(move |n| n.push_error(notice));
    updater.set(UserMutationCompute {
        state: MutationState::Failed {
            op: MutationOp::CreateUser,
            message,
        },
    });
}
