//! Role registry
//!
//! The role set is process-wide: every clinic reads the same roles. It is
//! replaced as a whole by an administrator action; there is no per-role
//! patch. Until something is saved, the built-in roles apply.

use serde_json::Value;
use std::sync::Arc;

use crate::config::AccessConfig;
use crate::context::SessionContext;
use crate::store::KeyValueStore;
use clinic_events::{AccessEvent, NotificationBus};
use clinic_rbac::Role;

/// Durable store of the role set.
#[derive(Clone)]
pub struct RoleRegistry {
    store: Arc<dyn KeyValueStore>,
    bus: Arc<dyn NotificationBus>,
    session: SessionContext,
    key: String,
}

impl std::fmt::Debug for RoleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleRegistry").field("key", &self.key).finish()
    }
}

impl RoleRegistry {
    /// Creates a role registry.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        bus: Arc<dyn NotificationBus>,
        session: SessionContext,
        config: &AccessConfig,
    ) -> Self {
        Self {
            store,
            bus,
            session,
            key: config.keys.roles.clone(),
        }
    }

    /// Get every role, in stored order.
    ///
    /// Falls back to [`Role::builtin`] when nothing is stored or the slot is
    /// not a JSON array. Array elements that do not decode as a role are
    /// skipped, so a damaged entry denies rather than reverting the whole set
    /// to the built-ins.
    pub fn get_all_roles(&self) -> Vec<Role> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Role::builtin(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    key = %self.key,
                    "Failed to read roles; using built-in roles"
                );
                return Role::builtin();
            }
        };

        let entries = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) => {
                tracing::warn!(key = %self.key, "Roles slot is not an array; using built-in roles");
                return Role::builtin();
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    key = %self.key,
                    "Corrupt roles slot; using built-in roles"
                );
                return Role::builtin();
            }
        };

        entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<Role>(entry) {
                Ok(role) => Some(role),
                Err(e) => {
                    tracing::warn!(error = %e, index, "Skipping malformed stored role");
                    None
                }
            })
            .collect()
    }

    /// Find a role by id.
    pub fn find_role(&self, role_id: &str) -> Option<Role> {
        self.get_all_roles().into_iter().find(|role| role.id == role_id)
    }

    /// Replace the whole role set.
    ///
    /// On success a `roles.changed` event is published; on storage failure
    /// the change is logged and dropped.
    pub fn save_roles(&self, roles: &[Role]) {
        let encoded = match serde_json::to_string(roles) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode roles");
                return;
            }
        };

        if let Err(e) = self.store.set(&self.key, &encoded) {
            tracing::warn!(
                error = %e,
                code = e.error_code(),
                roles = roles.len(),
                "Failed to store roles; change not applied"
            );
            return;
        }

        if let Err(e) = self.bus.publish(AccessEvent::RolesChanged.to_event()) {
            tracing::warn!(error = %e, "Failed to announce roles change");
        }
    }

    /// Store the built-in roles, discarding any customisation.
    pub fn reset_to_defaults(&self) {
        self.save_roles(&Role::builtin());
    }

    /// Get the active role id from the session.
    pub fn get_user_role(&self) -> String {
        self.session.get_user_role()
    }

    /// Record the active role id in the session.
    pub fn set_user_role(&self, role_id: &str) {
        self.session.set_user_role(role_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use clinic_events::MemoryNotificationBus;
    use clinic_rbac::{Module, ModulePermissions, PermissionKind, PermissionMatrix};

    fn fixture() -> (RoleRegistry, Arc<MemoryStore>, Arc<MemoryNotificationBus>) {
        let config = AccessConfig::default();
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(MemoryNotificationBus::new());
        let session = SessionContext::new(store.clone(), &config);
        let registry = RoleRegistry::new(store.clone(), bus.clone(), session, &config);
        (registry, store, bus)
    }

    fn auditor() -> Role {
        Role::new("auditor", "Auditor").with_permissions(
            PermissionMatrix::new()
                .with(Module::Relatorios, ModulePermissions::view_only())
                .with(Module::Financeiro, ModulePermissions::view_only()),
        )
    }

    #[test]
    fn test_builtin_roles_when_nothing_stored() {
        let (registry, _, _) = fixture();
        assert_eq!(registry.get_all_roles(), Role::builtin());
    }

    #[test]
    fn test_save_round_trip_preserves_order() {
        let (registry, _, _) = fixture();
        let roles = vec![auditor(), Role::medico(), Role::admin()];

        registry.save_roles(&roles);
        assert_eq!(registry.get_all_roles(), roles);
    }

    #[test]
    fn test_empty_role_set_is_kept() {
        let (registry, _, _) = fixture();
        registry.save_roles(&[]);
        assert!(registry.get_all_roles().is_empty());
        assert!(registry.find_role("admin").is_none());
    }

    #[test]
    fn test_save_publishes_roles_changed() {
        let (registry, _, bus) = fixture();
        let mut sub = bus.subscribe("roles.*").unwrap();

        registry.save_roles(&[auditor()]);
        registry.reset_to_defaults();

        let events = sub.drain();
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| AccessEvent::from_event(e) == Some(AccessEvent::RolesChanged)));
        assert_eq!(registry.get_all_roles(), Role::builtin());
    }

    #[test]
    fn test_corrupt_slot_falls_back_to_builtin() {
        let (registry, store, _) = fixture();
        store.set("custom_roles", "not json").unwrap();
        assert_eq!(registry.get_all_roles(), Role::builtin());

        store.set("custom_roles", r#"{"admin": {}}"#).unwrap();
        assert_eq!(registry.get_all_roles(), Role::builtin());
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let (registry, store, _) = fixture();
        store
            .set(
                "custom_roles",
                r#"[
                    {"name": "no id"},
                    {"id": "auditor", "name": "Auditor", "modulePermissions": {
                        "Relatórios": {"view": true}
                    }}
                ]"#,
            )
            .unwrap();

        let roles = registry.get_all_roles();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].id, "auditor");
        assert!(roles[0]
            .module_permissions
            .allows(Module::Relatorios, PermissionKind::View));
        assert!(!roles[0]
            .module_permissions
            .allows(Module::Relatorios, PermissionKind::Create));
    }

    #[test]
    fn test_find_role() {
        let (registry, _, _) = fixture();
        assert_eq!(registry.find_role("financeiro"), Some(Role::financeiro()));
        assert_eq!(registry.find_role("dentista"), None);
    }

    #[test]
    fn test_user_role_delegates_to_session() {
        let (registry, store, _) = fixture();
        assert_eq!(registry.get_user_role(), "admin");

        registry.set_user_role("recepcionista");
        assert_eq!(registry.get_user_role(), "recepcionista");
        assert_eq!(store.get("userRole").unwrap().as_deref(), Some("recepcionista"));
    }
}
