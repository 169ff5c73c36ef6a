//! Directory Store: the member roster plus the currently selected record.
//!
//! All mutation goes through [`reduce`], a pure transition function over
//! explicit [`DirectoryAction`]s. Synchronous callers route through
//! [`DirectoryState::apply`]; async commands queue the same call as an
//! `Updater::update` closure, so every transition lands whole and in
//! dispatch order.

use std::any::{Any, TypeId};

use flock_states::{Compute, ComputeDeps, Dep, State, Updater, state_assign_impl};

use crate::model::{Role, User, UserPatch, UserStatus};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryState {
    pub users: Vec<User>,
    /// The record currently open in a detail view, kept in lockstep with
    /// `users` by the reducer.
    pub selected: Option<User>,
}

impl DirectoryState {
    pub fn user_by_id(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn email_exists(&self, email: &str) -> bool {
        self.users.iter().any(|u| u.email == email)
    }

    /// Apply an action in place via [`reduce`].
    pub fn apply(&mut self, action: DirectoryAction) {
        let current = std::mem::take(self);
        *self = reduce(current, action);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DirectoryAction {
    AddUser(User),
    UpdateUser { id: String, patch: UserPatch },
    DeleteUser { id: String },
    SetCurrentUser(Option<User>),
}

/// Pure reducer over the directory.
///
/// `AddUser` appends unconditionally; uniqueness of email and student id is
/// enforced where records enter the system, not here. `UpdateUser` merges
/// the patch into both the matching record and the selection when the ids
/// match, so the two views never diverge. Deleting an unknown id is a no-op.
pub fn reduce(mut state: DirectoryState, action: DirectoryAction) -> DirectoryState {
    match action {
        DirectoryAction::AddUser(user) => {
            state.users.push(user);
        }
        DirectoryAction::UpdateUser { id, patch } => {
            if let Some(user) = state.users.iter_mut().find(|u| u.id == id) {
                patch.apply_to(user);
            }
            if let Some(selected) = state.selected.as_mut()
                && selected.id == id
            {
                patch.apply_to(selected);
            }
        }
        DirectoryAction::DeleteUser { id } => {
            state.users.retain(|u| u.id != id);
            if state.selected.as_ref().is_some_and(|s| s.id == id) {
                state.selected = None;
            }
        }
        DirectoryAction::SetCurrentUser(user) => {
            state.selected = user;
        }
    }
    state
}

impl State for DirectoryState {
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

/// Derived headline counts over the directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryStatsCompute {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub admins: usize,
}

impl State for DirectoryStatsCompute {
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

impl Compute for DirectoryStatsCompute {
    fn deps(&self) -> ComputeDeps {
        const STATE_IDS: [TypeId; 1] = [TypeId::of::<DirectoryState>()];
        const COMPUTE_IDS: [TypeId; 0] = [];
        (&STATE_IDS, &COMPUTE_IDS)
    }

    fn compute(&self, deps: Dep<'_>, updater: Updater) {
        let directory = deps.get_state_ref::<DirectoryState>();
        let active = directory
            .users
            .iter()
            .filter(|u| u.status == UserStatus::Active)
            .count();
        updater.set(DirectoryStatsCompute {
            total: directory.users.len(),
            active,
            inactive: directory.users.len() - active,
            admins: directory
                .users
                .iter()
                .filter(|u| u.role == Role::Admin)
                .count(),
        });
    }
}
