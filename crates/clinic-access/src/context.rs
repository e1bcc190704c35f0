//! Session context: the active role and clinic
//!
//! This module provides the [`CurrentUser`] value the resolver evaluates and
//! the [`SessionContext`] that reads and writes its two parts from session
//! storage. Both parts fall back to safe defaults when unset: the configured
//! default role and no clinic restriction.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::AccessConfig;
use crate::store::KeyValueStore;
use clinic_rbac::ClinicId;

/// The user a permission question is asked for.
///
/// Composed at query time; never stored as an entity.
///
/// # Examples
///
/// ```
/// use clinic_access::CurrentUser;
/// use clinic_rbac::ClinicId;
///
/// let user = CurrentUser::new("medico").in_clinic(ClinicId::Number(42));
/// assert_eq!(user.role_id, "medico");
/// assert_eq!(user.clinic_id, Some(ClinicId::Number(42)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Active role identifier
    pub role_id: String,

    /// Active clinic; `None` means no clinic restriction
    pub clinic_id: Option<ClinicId>,
}

impl CurrentUser {
    /// Creates a user with a role and no clinic.
    pub fn new(role_id: impl Into<String>) -> Self {
        Self {
            role_id: role_id.into(),
            clinic_id: None,
        }
    }

    /// Scope the user to a clinic.
    pub fn in_clinic(mut self, clinic_id: ClinicId) -> Self {
        self.clinic_id = Some(clinic_id);
        self
    }
}

/// Reads and writes the active role and clinic in session storage.
///
/// Writes are best-effort: a storage failure is logged and the previous
/// value stays in effect.
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn KeyValueStore>,
    role_key: String,
    clinic_key: String,
    default_role_id: String,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("role_key", &self.role_key)
            .field("clinic_key", &self.clinic_key)
            .field("default_role_id", &self.default_role_id)
            .finish()
    }
}

impl SessionContext {
    /// Creates a session context over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, config: &AccessConfig) -> Self {
        Self {
            store,
            role_key: config.keys.current_role.clone(),
            clinic_key: config.keys.current_clinic.clone(),
            default_role_id: config.default_role_id.clone(),
        }
    }

    /// Get the active role id.
    ///
    /// Unset, blank or unreadable values yield the default role.
    pub fn get_user_role(&self) -> String {
        match self.store.get(&self.role_key) {
            Ok(Some(role)) if !role.trim().is_empty() => role.trim().to_string(),
            Ok(_) => self.default_role_id.clone(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    key = %self.role_key,
                    "Failed to read active role; using default"
                );
                self.default_role_id.clone()
            }
        }
    }

    /// Record the active role id.
    pub fn set_user_role(&self, role_id: &str) {
        if let Err(e) = self.store.set(&self.role_key, role_id) {
            tracing::warn!(error = %e, role_id, "Failed to store active role");
        }
    }

    /// Get the active clinic, if any.
    ///
    /// Unset, blank, unparseable or unreadable values yield `None`.
    pub fn get_current_clinic(&self) -> Option<ClinicId> {
        let raw = match self.store.get(&self.clinic_key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, key = %self.clinic_key, "Failed to read active clinic");
                return None;
            }
        };

        if raw.trim().is_empty() {
            return None;
        }

        match raw.parse() {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unparseable active clinic id");
                None
            }
        }
    }

    /// Record the active clinic.
    pub fn set_current_clinic(&self, clinic_id: &ClinicId) {
        if let Err(e) = self.store.set(&self.clinic_key, &clinic_id.to_string()) {
            tracing::warn!(error = %e, clinic_id = %clinic_id, "Failed to store active clinic");
        }
    }

    /// Forget the active clinic, lifting the clinic restriction.
    pub fn clear_current_clinic(&self) {
        if let Err(e) = self.store.set(&self.clinic_key, "") {
            tracing::warn!(error = %e, "Failed to clear active clinic");
        }
    }

    /// Compose the current user from session storage.
    pub fn current_user(&self) -> CurrentUser {
        CurrentUser {
            role_id: self.get_user_role(),
            clinic_id: self.get_current_clinic(),
        }
    }
}
