//! Session Store: who is signed in, and the login/signup/logout flows.
//!
//! Authentication here is deliberately mock-grade: a pluggable
//! [`CredentialVerifier`] checks credentials against the directory, and the
//! shipped [`MockVerifier`] accepts one fixed password. Real password
//! hashing and token lifecycles belong to the backend service, not this
//! client layer.

use std::any::{Any, TypeId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use flock_states::{
    Command, CommandFuture, CommandSnapshot, Compute, ComputeDeps, Dep, State, Updater,
    state_assign_impl,
};
use tokio_util::sync::CancellationToken;

use crate::directory::{DirectoryAction, DirectoryState};
use crate::model::{User, UserPatch};

/// Simulated verification latency for the mock auth path.
pub const MOCK_AUTH_LATENCY: Duration = Duration::from_millis(400);

/// Sentinel stored in `active_marker` while a session exists.
pub const ACTIVE_MARKER: &str = "active";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("an account with this email already exists")]
    DuplicateEmail,
}

/// Pluggable credential check against the current directory.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, users: &[User], email: &str, password: &str) -> Result<User, AuthError>;
}

/// The development verifier: exact email match, one fixed password.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockVerifier;

impl MockVerifier {
    const EXPECTED_PASSWORD: &'static str = "password";
}

impl CredentialVerifier for MockVerifier {
    fn verify(&self, users: &[User], email: &str, password: &str) -> Result<User, AuthError> {
        if password != Self::EXPECTED_PASSWORD {
            return Err(AuthError::InvalidCredentials);
        }
        users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(AuthError::InvalidCredentials)
    }
}

/// Signed-in session.
///
/// `is_signed_in` keys off the marker alone; `current_user` may outlive the
/// marker after logout when `clear_user_on_logout` is disabled, which some
/// screens use to prefill the next login.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub current_user: Option<User>,
    pub active_marker: Option<String>,
    pub clear_user_on_logout: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            current_user: None,
            active_marker: None,
            clear_user_on_logout: true,
        }
    }
}

impl SessionState {
    pub fn is_signed_in(&self) -> bool {
        self.active_marker.is_some()
    }

    pub fn sign_in(&mut self, user: User) {
        self.current_user = Some(user);
        self.active_marker = Some(ACTIVE_MARKER.to_owned());
    }

    pub fn sign_out(&mut self) {
        self.active_marker = None;
        if self.clear_user_on_logout {
            self.current_user = None;
        }
    }
}

impl State for SessionState {
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

/// Observable progress of the latest auth flow.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionFlow {
    #[default]
    Idle,
    Pending,
    Failed(AuthError),
    SignedIn {
        user_id: String,
    },
}

/// Command-updated cache holding the auth flow status. Callers check
/// `Pending` before dispatching again; the store itself does not serialize
/// duplicate submissions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionFlowCompute {
    pub status: SessionFlow,
}

impl SessionFlowCompute {
    pub fn is_pending(&self) -> bool {
        self.status == SessionFlow::Pending
    }
}

impl State for SessionFlowCompute {
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

impl Compute for SessionFlowCompute {
    fn deps(&self) -> ComputeDeps {
        const STATE_IDS: [TypeId; 0] = [];
        const COMPUTE_IDS: [TypeId; 0] = [];
        (&STATE_IDS, &COMPUTE_IDS)
    }

    // Updated by the auth commands, never derived.
    fn compute(&self, _deps: Dep<'_>, _updater: Updater) {}
}

/// Credentials entered on the login screen; set before dispatching
/// [`LoginCommand`].
#[derive(Debug, Clone, Default)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

impl State for LoginInput {
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

/// The filled-in registration form; set before dispatching [`SignupCommand`].
///
/// The mock path registers without a credential check, so no password is
/// carried here; a real backend would take one through its
/// [`CredentialVerifier`].
#[derive(Debug, Clone, Default)]
pub struct SignupInput {
    pub user: Option<User>,
}

impl State for SignupInput {
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

/// Verify [`LoginInput`] against the directory and sign the session in.
///
/// Failure publishes `SessionFlow::Failed` and leaves [`SessionState`] and
/// the directory untouched. Success signs the session in and touches the
/// member's `last_login` through the directory reducer.
pub struct LoginCommand {
    verifier: Arc<dyn CredentialVerifier>,
    latency: Duration,
}

impl Default for LoginCommand {
    fn default() -> Self {
        Self::new(Arc::new(MockVerifier))
    }
}

impl LoginCommand {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            verifier,
            latency: MOCK_AUTH_LATENCY,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl Command for LoginCommand {
    fn run(
        &self,
        snap: CommandSnapshot,
        updater: Updater,
        _cancel: CancellationToken,
    ) -> CommandFuture {
        let input = snap.state::<LoginInput>().clone();
        let directory = snap.state::<DirectoryState>().clone();
        let verifier = Arc::clone(&self.verifier);
        let latency = self.latency;

        updater.set(SessionFlowCompute {
            status: SessionFlow::Pending,
        });

        Box::pin(async move {
            tokio::time::sleep(latency).await;

            match verifier.verify(&directory.users, &input.email, &input.password) {
                Ok(user) => {
                    log::info!("login succeeded for {}", user.email);
                    let now = Utc::now();
                    let user_id = user.id.clone();
                    let touched_id = user.id.clone();
                    updater.update::<SessionState>(move |session| session.sign_in(user));
                    updater.update::<DirectoryState>(move |dir| {
                        dir.apply(DirectoryAction::UpdateUser {
                            id: touched_id,
                            patch: UserPatch {
                                last_login: Some(Some(now)),
                                ..UserPatch::default()
                            },
                        });
                    });
                    updater.set(SessionFlowCompute {
                        status: SessionFlow::SignedIn { user_id },
                    });
                }
                Err(err) => {
                    log::warn!("login failed for {}: {err}", input.email);
                    updater.set(SessionFlowCompute {
                        status: SessionFlow::Failed(err),
                    });
                }
            }
        })
    }
}

static LOCAL_ID_SEQ: AtomicU64 = AtomicU64::new(1);

fn next_local_id() -> String {
    format!("local-{}", LOCAL_ID_SEQ.fetch_add(1, Ordering::Relaxed))
}

/// Register the [`SignupInput`] user locally and sign the session in.
///
/// A duplicate email fails the flow without mutating the directory.
pub struct SignupCommand {
    latency: Duration,
}

impl Default for SignupCommand {
    fn default() -> Self {
        Self {
            latency: MOCK_AUTH_LATENCY,
        }
    }
}

impl SignupCommand {
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl Command for SignupCommand {
    fn run(
        &self,
        snap: CommandSnapshot,
        updater: Updater,
        _cancel: CancellationToken,
    ) -> CommandFuture {
        let input = snap.state::<SignupInput>().clone();
        let directory = snap.state::<DirectoryState>().clone();
        let latency = self.latency;

        updater.set(SessionFlowCompute {
            status: SessionFlow::Pending,
        });

        Box::pin(async move {
            tokio::time::sleep(latency).await;

            let Some(mut user) = input.user else {
                log::warn!("signup dispatched without a filled-in form");
                updater.set(SessionFlowCompute {
                    status: SessionFlow::Failed(AuthError::InvalidCredentials),
                });
                return;
            };

            if directory.email_exists(&user.email) {
                log::warn!("signup rejected, email already registered: {}", user.email);
                updater.set(SessionFlowCompute {
                    status: SessionFlow::Failed(AuthError::DuplicateEmail),
                });
                return;
            }

            if user.id.is_empty() {
                user.id = next_local_id();
            }
            let user_id = user.id.clone();
            let added = user.clone();
            updater.update::<DirectoryState>(move |dir| {
                dir.apply(DirectoryAction::AddUser(added));
            });
            updater.update::<SessionState>(move |session| session.sign_in(user));
            updater.set(SessionFlowCompute {
                status: SessionFlow::SignedIn { user_id },
            });
        })
    }
}

/// Clear the active session marker (and the user, per
/// `clear_user_on_logout`).
#[derive(Debug, Default)]
pub struct LogoutCommand;

impl Command for LogoutCommand {
    fn run(
        &self,
        _snap: CommandSnapshot,
        updater: Updater,
        _cancel: CancellationToken,
    ) -> CommandFuture {
        updater.update::<SessionState>(|session| session.sign_out());
        updater.set(SessionFlowCompute {
            status: SessionFlow::Idle,
        });
        Box::pin(async {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::test_utils::sample_user;
    use flock_states::StateCtx;

    fn admin_user() -> User {
        let mut user = sample_user("u-admin", "admin@sundayschool.org");
        user.role = Role::Admin;
        user
    }

    fn setup_ctx() -> StateCtx {
        let mut ctx = StateCtx::new();
        ctx.add_state(PortalDirectoryFixture::directory());
        ctx.add_state(SessionState::default());
        ctx.add_state(LoginInput::default());
        ctx.add_state(SignupInput::default());
        ctx.record_compute(SessionFlowCompute::default());
        ctx.record_command(LoginCommand::default().with_latency(Duration::ZERO));
        ctx.record_command(SignupCommand::default().with_latency(Duration::ZERO));
        ctx.record_command(LogoutCommand);
        ctx
    }

    struct PortalDirectoryFixture;

    impl PortalDirectoryFixture {
        fn directory() -> DirectoryState {
            DirectoryState {
                users: vec![admin_user(), sample_user("u-2", "ruth@sundayschool.org")],
                selected: None,
            }
        }
    }

    #[test]
    fn test_login_with_fixed_password_signs_in_admin() {
        let mut ctx = setup_ctx();

        ctx.update::<LoginInput>(|input| {
            input.email = "admin@sundayschool.org".to_owned();
            input.password = "password".to_owned();
        });
        ctx.dispatch::<LoginCommand>();
        ctx.sync_computes();

        let flow = ctx.cached::<SessionFlowCompute>().unwrap();
        assert_eq!(
            flow.status,
            SessionFlow::SignedIn {
                user_id: "u-admin".to_owned()
            }
        );

        let session = ctx.state::<SessionState>().unwrap();
        assert!(session.is_signed_in());
        let user = session.current_user.as_ref().unwrap();
        assert_eq!(user.role, Role::Admin);

        // last_login was touched through the reducer.
        let directory = ctx.state::<DirectoryState>().unwrap();
        assert!(directory.user_by_id("u-admin").unwrap().last_login.is_some());
    }

    #[test]
    fn test_wrong_password_fails_without_touching_session() {
        let mut ctx = setup_ctx();

        ctx.update::<LoginInput>(|input| {
            input.email = "admin@sundayschool.org".to_owned();
            input.password = "hunter2".to_owned();
        });
        ctx.dispatch::<LoginCommand>();
        ctx.sync_computes();

        let flow = ctx.cached::<SessionFlowCompute>().unwrap();
        assert_eq!(flow.status, SessionFlow::Failed(AuthError::InvalidCredentials));

        let session = ctx.state::<SessionState>().unwrap();
        assert!(!session.is_signed_in());
        assert!(session.current_user.is_none());
    }

    #[test]
    fn test_duplicate_email_signup_leaves_directory_untouched() {
        let mut ctx = setup_ctx();
        let before = ctx.state::<DirectoryState>().unwrap().clone();

        ctx.update::<SignupInput>(|input| {
            input.user = Some(sample_user("", "ruth@sundayschool.org"));
        });
        ctx.dispatch::<SignupCommand>();
        ctx.sync_computes();

        let flow = ctx.cached::<SessionFlowCompute>().unwrap();
        assert_eq!(flow.status, SessionFlow::Failed(AuthError::DuplicateEmail));
        assert_eq!(ctx.state::<DirectoryState>().unwrap(), &before);
        assert!(!ctx.state::<SessionState>().unwrap().is_signed_in());
    }

    #[test]
    fn test_signup_synthesizes_local_id_and_signs_in() {
        let mut ctx = setup_ctx();

        let mut user = sample_user("", "new@sundayschool.org");
        user.id.clear();
        ctx.update::<SignupInput>(|input| {
            input.user = Some(user);
        });
        ctx.dispatch::<SignupCommand>();
        ctx.sync_computes();

        let session = ctx.state::<SessionState>().unwrap();
        assert!(session.is_signed_in());
        let id = &session.current_user.as_ref().unwrap().id;
        assert!(id.starts_with("local-"), "synthesized id, got {id}");

        let directory = ctx.state::<DirectoryState>().unwrap();
        assert!(directory.email_exists("new@sundayschool.org"));
        assert_eq!(directory.users.len(), 3);
    }

    #[test]
    fn test_logout_clears_marker_and_user_by_default() {
        let mut ctx = setup_ctx();
        ctx.update::<SessionState>(|session| session.sign_in(admin_user()));

        ctx.dispatch::<LogoutCommand>();
        ctx.sync_computes();

        let session = ctx.state::<SessionState>().unwrap();
        assert!(!session.is_signed_in());
        assert!(session.current_user.is_none());
    }

    #[test]
    fn test_logout_can_retain_user_for_prefill() {
        let mut ctx = setup_ctx();
        ctx.update::<SessionState>(|session| {
            session.clear_user_on_logout = false;
            session.sign_in(admin_user());
        });

        ctx.dispatch::<LogoutCommand>();
        ctx.sync_computes();

        let session = ctx.state::<SessionState>().unwrap();
        assert!(!session.is_signed_in());
        assert_eq!(
            session.current_user.as_ref().map(|u| u.email.as_str()),
            Some("admin@sundayschool.org")
        );
    }
}
