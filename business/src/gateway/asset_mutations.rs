//! Asset mutation commands and their shared state machine.

use std::any::{Any, TypeId};

use flock_states::{
    Command, CommandFuture, CommandSnapshot, Compute, ComputeDeps, Dep, State, Updater,
    state_assign_impl,
};
use tokio_util::sync::CancellationToken;

use super::{GatewayInput, MutationOp, MutationState, api, cache::CollectionCaches, resolve_api_url};
use crate::config::PortalConfig;
use crate::notifications::Notifications;

/// Command-updated cache holding the latest asset mutation's state machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetMutationCompute {
    pub state: MutationState,
}

impl State for AssetMutationCompute {
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

impl Compute for AssetMutationCompute {
    fn deps(&self) -> ComputeDeps {
        const STATE_IDS: [TypeId; 0] = [];
        const COMPUTE_IDS: [TypeId; 0] = [];
        (&STATE_IDS, &COMPUTE_IDS)
    }

    // Updated by the mutation commands, never derived.
    fn compute(&self, _deps: Dep<'_>, _updater: Updater) {}
}

fn settle_success(updater: &Updater, op: MutationOp, message: String) {
    updater.update::<CollectionCaches>(|caches| caches.assets.invalidate());
    updater.update::<Notifications>(move |n| n.push_info(message));
    updater.set(AssetMutationCompute {
        state: MutationState::Succeeded(op),
    });
}

fn settle_failure(updater: &Updater, op: MutationOp, message: String) {
    log::warn!("asset mutation failed: {message}");
    let notice = message.clone();
    updater.update::<Notifications>(move |n| n.push_error(notice));
    updater.set(AssetMutationCompute {
        state: MutationState::Failed { op, message },
    });
}

/// POST a new asset from `GatewayInput::new_asset`.
#[derive(Debug, Default)]
pub struct CreateAssetCommand;

impl Command for CreateAssetCommand {
    fn run(
        &self,
        snap: CommandSnapshot,
        updater: Updater,
        _cancel: CancellationToken,
    ) -> CommandFuture {
        let input = snap.state::<GatewayInput>().clone();
        let api_url = resolve_api_url(&input, snap.state::<PortalConfig>());

        updater.set(AssetMutationCompute {
            state: MutationState::Pending(MutationOp::CreateAsset),
        });

        Box::pin(async move {
            let Some(asset) = input.new_asset else {
                settle_failure(
                    &updater,
                    MutationOp::CreateAsset,
                    "no asset to create".to_owned(),
                );
                return;
            };

            match api::create_asset(&api_url, &asset).await {
                Ok(created) => settle_success(
                    &updater,
                    MutationOp::CreateAsset,
                    format!("Asset {} created", created.code),
                ),
                Err(e) => settle_failure(&updater, MutationOp::CreateAsset, e.message),
            }
        })
    }
}

/// PUT a partial update from `GatewayInput::asset_update`.
#[derive(Debug, Default)]
pub struct UpdateAssetCommand;

impl Command for UpdateAssetCommand {
    fn run(
        &self,
        snap: CommandSnapshot,
        updater: Updater,
        _cancel: CancellationToken,
    ) -> CommandFuture {
        let input = snap.state::<GatewayInput>().clone();
        let api_url = resolve_api_url(&input, snap.state::<PortalConfig>());

        updater.set(AssetMutationCompute {
            state: MutationState::Pending(MutationOp::UpdateAsset),
        });

        Box::pin(async move {
            let Some((id, patch)) = input.asset_update else {
                settle_failure(
                    &updater,
                    MutationOp::UpdateAsset,
                    "no asset update staged".to_owned(),
                );
                return;
            };

            match api::update_asset(&api_url, &id, &patch).await {
                Ok(updated) => settle_success(
                    &updater,
                    MutationOp::UpdateAsset,
                    format!("Asset {} updated", updated.code),
                ),
                Err(e) => settle_failure(&updater, MutationOp::UpdateAsset, e.message),
            }
        })
    }
}

/// DELETE the asset named by `GatewayInput::delete_asset_id`.
#[derive(Debug, Default)]
pub struct DeleteAssetCommand;

impl Command for DeleteAssetCommand {
    fn run(
        &self,
        snap: CommandSnapshot,
        updater: Updater,
        _cancel: CancellationToken,
    ) -> CommandFuture {
        let input = snap.state::<GatewayInput>().clone();
        let api_url = resolve_api_url(&input, snap.state::<PortalConfig>());

        updater.set(AssetMutationCompute {
            state: MutationState::Pending(MutationOp::DeleteAsset),
        });

        Box::pin(async move {
            let Some(id) = input.delete_asset_id else {
                settle_failure(
                    &updater,
                    MutationOp::DeleteAsset,
                    "no asset selected for deletion".to_owned(),
                );
                return;
            };

            match api::delete_asset(&api_url, &id).await {
                Ok(()) => settle_success(
                    &updater,
                    MutationOp::DeleteAsset,
                    "Asset deleted".to_owned(),
                ),
                Err(e) => settle_failure(&updater, MutationOp::DeleteAsset, e.message),
            }
        })
    }
}
