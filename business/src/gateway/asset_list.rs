//! The cached remote asset collection and its re-fetch path.

use std::any::{Any, TypeId};

use flock_states::{
    Command, CommandFuture, CommandSnapshot, Compute, ComputeDeps, Dep, State, Updater,
    state_assign_impl,
};
use tokio_util::sync::CancellationToken;

use super::{GatewayInput, api, cache::CollectionCaches, resolve_api_url};
use crate::config::PortalConfig;
use crate::model::Asset;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ListStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error(String),
}

/// Command-updated cache of the remote asset collection.
///
/// The client never merges mutation responses into this list; after a
/// mutation settles the cache goes stale and [`RefreshAssetsCommand`]
/// re-fetches whatever the service last committed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetListCompute {
    pub assets: Vec<Asset>,
    pub status: ListStatus,
}

impl State for AssetListCompute {
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

impl Compute for AssetListCompute {
    fn deps(&self) -> ComputeDeps {
        const STATE_IDS: [TypeId; 0] = [];
        const COMPUTE_IDS: [TypeId; 0] = [];
        (&STATE_IDS, &COMPUTE_IDS)
    }

    // Updated by RefreshAssetsCommand, never derived.
    fn compute(&self, _deps: Dep<'_>, _updater: Updater) {}
}

/// GET `/assets` and replace the cached collection.
#[derive(Debug, Default)]
pub struct RefreshAssetsCommand;

impl Command for RefreshAssetsCommand {
    fn run(
        &self,
        snap: CommandSnapshot,
        updater: Updater,
        _cancel: CancellationToken,
    ) -> CommandFuture {
        let input = snap.state::<GatewayInput>().clone();
        let api_url = resolve_api_url(&input, snap.state::<PortalConfig>());
        let previous = snap.compute::<AssetListCompute>().assets.clone();

        updater.set(AssetListCompute {
            assets: previous.clone(),
            status: ListStatus::Loading,
        });

        Box::pin(async move {
            match api::list_assets(&api_url).await {
                Ok(assets) => {
                    updater.set(AssetListCompute {
                        assets,
                        status: ListStatus::Loaded,
                    });
                    updater.update::<CollectionCaches>(|caches| caches.assets.mark_fresh());
                }
                Err(e) => {
                    log::warn!("asset refresh failed: {}", e.message);
                    // Keep showing the stale collection alongside the error.
                    updater.set(AssetListCompute {
                        assets: previous,
                        status: ListStatus::Error(e.message),
                    });
                }
            }
        })
    }
}
