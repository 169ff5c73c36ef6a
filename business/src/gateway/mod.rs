//! Remote Mutation Gateway: typed wrappers around the portal service's
//! mutation endpoints, driven by commands and observed through per-call
//! state machines and collection caches.
//!
//! Calls are fire-and-settle: no retry, no cancellation, no ordering
//! guarantee between concurrent calls. The service is the source of truth;
//! on success the relevant collection cache is invalidated rather than
//! merged locally, and a dependent view re-fetches.

mod api;
mod asset_list;
mod asset_mutations;
mod cache;
mod user_mutations;

use std::any::Any;

use flock_states::{State, state_assign_impl};

pub use api::{RemoteError, create_asset, create_user, delete_asset, list_assets, update_asset};
pub use asset_list::{AssetListCompute, ListStatus, RefreshAssetsCommand};
pub use asset_mutations::{
    AssetMutationCompute, CreateAssetCommand, DeleteAssetCommand, UpdateAssetCommand,
};
pub use cache::{CacheEntry, CollectionCaches};
pub use user_mutations::{CreateRemoteUserCommand, UserMutationCompute};

use crate::config::PortalConfig;
use crate::model::{Asset, AssetPatch, User};

/// Which remote mutation a state machine refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOp {
    CreateUser,
    CreateAsset,
    UpdateAsset,
    DeleteAsset,
}

/// Per-call mutation state machine. `Succeeded` and `Failed` are terminal;
/// a fresh dispatch restarts the machine from `Pending`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MutationState {
    #[default]
    Idle,
    Pending(MutationOp),
    Succeeded(MutationOp),
    Failed {
        op: MutationOp,
        message: String,
    },
}

impl MutationState {
    pub fn is_pending(&self) -> bool {
        matches!(self, MutationState::Pending(_))
    }
}

/// Inputs for the gateway commands; set the relevant field before
/// dispatching. `api_origin` overrides [`PortalConfig`] per call, which is
/// how tests point a single flow at a mock server.
#[derive(Debug, Clone, Default)]
pub struct GatewayInput {
    pub api_origin: Option<String>,
    pub new_user: Option<User>,
    pub new_asset: Option<Asset>,
    pub asset_update: Option<(String, AssetPatch)>,
    pub delete_asset_id: Option<String>,
}

impl State for GatewayInput {
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

fn resolve_api_url(input: &GatewayInput, config: &PortalConfig) -> String {
    match &input.api_origin {
        Some(origin) => format!("{origin}/api/sunday-school"),
        None => config.api_url().to_string(),
    }
}
