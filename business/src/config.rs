use std::any::Any;

use flock_states::{State, state_assign_impl};
use ustr::Ustr;

pub const API_ORIGIN_ENV: &str = "SUNDAY_SCHOOL_API_ORIGIN";

const DEFAULT_ORIGIN: &str = "http://localhost:8080";

/// Registered configuration state for the portal client.
///
/// Commands resolve the API base from a per-call override first and fall back
/// to this config, so tests can point individual calls at a mock server
/// without touching global state.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub api_base_url: String,
}

impl PortalConfig {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            api_base_url: origin.into(),
        }
    }

    /// Read the origin from `SUNDAY_SCHOOL_API_ORIGIN`, falling back to the
    /// local dev origin.
    pub fn from_env() -> Self {
        match std::env::var(API_ORIGIN_ENV) {
            Ok(origin) if !origin.is_empty() => Self::new(origin),
            _ => Self::default(),
        }
    }

    pub fn api_url(&self) -> Ustr {
        if self.api_base_url.is_empty() {
            Ustr::from("/api/sunday-school")
        } else {
            Ustr::from(&format!("{}/api/sunday-school", self.api_base_url))
        }
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ORIGIN)
    }
}

impl State for PortalConfig {
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
