//! Domain layer for the Sunday School portal client.
//!
//! Four concerns live here, all built on the `flock-states` runtime:
//!
//! - the Directory Store ([`directory`]): the member roster behind a pure
//!   reducer over explicit actions;
//! - the Session Store ([`session`]): mock-grade sign-in/sign-up/sign-out
//!   flows with a pluggable credential check;
//! - the Remote Mutation Gateway ([`gateway`]): typed user/asset mutations
//!   against the portal service, with per-call state machines, collection
//!   cache invalidation and one-shot notifications;
//! - the persisted session ([`persisted`]): the signed-in user JSON record
//!   restored verbatim at startup.

pub mod config;
pub mod directory;
pub mod gateway;
pub mod http;
pub mod model;
pub mod notifications;
pub mod persisted;
pub mod session;

mod test_utils;

pub use config::PortalConfig;
pub use directory::{DirectoryAction, DirectoryState, DirectoryStatsCompute, reduce};
pub use gateway::{
    AssetListCompute, AssetMutationCompute, CacheEntry, CollectionCaches, CreateAssetCommand,
    CreateRemoteUserCommand, DeleteAssetCommand, GatewayInput, ListStatus, MutationOp,
    MutationState, RefreshAssetsCommand, RemoteError, UpdateAssetCommand, UserMutationCompute,
};
pub use model::{
    Asset, AssetCondition, AssetPatch, AssetStatus, Comment, MaritalStatus, Post, Role, Sex, User,
    UserPatch, UserStatus,
};
pub use notifications::{Notification, NotificationLevel, Notifications};
pub use persisted::{
    DirSessionStorage, MemorySessionStorage, PersistedSession, SESSION_STORAGE_KEY, SessionStorage,
    clear_session, persist_session, restore_session,
};
pub use session::{
    AuthError, CredentialVerifier, LoginCommand, LoginInput, LogoutCommand, MockVerifier,
    SessionFlow, SessionFlowCompute, SessionState, SignupCommand, SignupInput,
};

use flock_states::StateCtx;

/// Register every portal state, compute and command on a fresh context.
///
/// Individual commands can be re-recorded afterwards to swap in a different
/// verifier or latency.
pub fn register(ctx: &mut StateCtx) {
    ctx.add_state(PortalConfig::from_env());
    ctx.add_state(DirectoryState::default());
    ctx.add_state(SessionState::default());
    ctx.add_state(Notifications::default());
    ctx.add_state(CollectionCaches::default());
    ctx.add_state(LoginInput::default());
    ctx.add_state(SignupInput::default());
    ctx.add_state(GatewayInput::default());

    ctx.record_compute(DirectoryStatsCompute::default());
    ctx.record_compute(SessionFlowCompute::default());
    ctx.record_compute(UserMutationCompute::default());
    ctx.record_compute(AssetMutationCompute::default());
    ctx.record_compute(AssetListCompute::default());

    ctx.record_command(LoginCommand::default());
    ctx.record_command(SignupCommand::default());
    ctx.record_command(LogoutCommand);
    ctx.record_command(CreateRemoteUserCommand);
    ctx.record_command(CreateAssetCommand);
    ctx.record_command(UpdateAssetCommand);
    ctx.record_command(DeleteAssetCommand);
    ctx.record_command(RefreshAssetsCommand);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_wires_a_valid_graph() {
        let mut ctx = StateCtx::new();
        register(&mut ctx);
        assert!(ctx.verify_deps().is_ok());

        ctx.sync_computes();
        assert!(ctx.state::<DirectoryState>().is_some());
        assert!(ctx.cached::<SessionFlowCompute>().is_some());
        assert_eq!(
            ctx.cached::<AssetListCompute>().map(|c| c.assets.len()),
            Some(0)
        );
    }
}
