//! Permission checks against stored state.
//!
//! [`PermissionResolver`] reads the clinic's module switches and the role set
//! at query time and evaluates them with [`resolve_permission`]. Nothing is
//! cached, so a check issued after a write observes that write.

use tracing::{debug, instrument};

use crate::clinic_modules::ClinicModuleStore;
use crate::context::{CurrentUser, SessionContext};
use crate::roles::RoleRegistry;
use clinic_rbac::{
    effective_matrix, resolve_permission, visible_modules, ClinicId, Module, PermissionKind,
    PermissionMatrix,
};

/// Answers "may the current user do X in module M".
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    modules: ClinicModuleStore,
    roles: RoleRegistry,
    session: SessionContext,
}

impl PermissionResolver {
    /// Creates a resolver over the given stores.
    pub fn new(modules: ClinicModuleStore, roles: RoleRegistry, session: SessionContext) -> Self {
        Self {
            modules,
            roles,
            session,
        }
    }

    /// Check a permission for an explicit user.
    ///
    /// A module disabled for the user's clinic is denied before roles are
    /// consulted, so no role (admin included) can reach it.
    #[instrument(level = "debug", skip(self), fields(role = %user.role_id))]
    pub fn check(&self, user: &CurrentUser, module: Module, kind: PermissionKind) -> bool {
        let settings = self.modules.settings_for(user.clinic_id.as_ref());
        if !settings.is_enabled(module) {
            debug!(clinic_id = ?user.clinic_id, "Denied: module disabled for clinic");
            return false;
        }

        let roles = self.roles.get_all_roles();
        let allowed = resolve_permission(&settings, &roles, &user.role_id, module, kind);
        if !allowed {
            debug!("Denied by role permissions");
        }
        allowed
    }

    /// Check a permission for the session's role.
    ///
    /// `clinic_id` overrides the session's active clinic when given.
    pub fn has_module_permission(
        &self,
        module: Module,
        kind: PermissionKind,
        clinic_id: Option<&ClinicId>,
    ) -> bool {
        let user = self.user_for(clinic_id);
        self.check(&user, module, kind)
    }

    /// Check view permission for the session's role.
    pub fn can_view_module(&self, module: Module, clinic_id: Option<&ClinicId>) -> bool {
        self.has_module_permission(module, PermissionKind::View, clinic_id)
    }

    /// Check create permission for the session's role.
    pub fn can_create_in_module(&self, module: Module, clinic_id: Option<&ClinicId>) -> bool {
        self.has_module_permission(module, PermissionKind::Create, clinic_id)
    }

    /// Check edit permission for the session's role.
    pub fn can_edit_in_module(&self, module: Module, clinic_id: Option<&ClinicId>) -> bool {
        self.has_module_permission(module, PermissionKind::Edit, clinic_id)
    }

    /// Check delete permission for the session's role.
    pub fn can_delete_in_module(&self, module: Module, clinic_id: Option<&ClinicId>) -> bool {
        self.has_module_permission(module, PermissionKind::Delete, clinic_id)
    }

    /// Modules the user may view, in navigation order.
    pub fn visible_modules(&self, user: &CurrentUser) -> Vec<Module> {
        let settings = self.modules.settings_for(user.clinic_id.as_ref());
        visible_modules(&settings, &self.roles.get_all_roles(), &user.role_id)
    }

    /// Everything the user may do, as a matrix. Modules with no grant are
    /// left out.
    pub fn effective_permissions(&self, user: &CurrentUser) -> PermissionMatrix {
        let settings = self.modules.settings_for(user.clinic_id.as_ref());
        effective_matrix(&settings, &self.roles.get_all_roles(), &user.role_id)
    }

    /// The user described by session storage.
    pub fn current_user(&self) -> CurrentUser {
        self.session.current_user()
    }

    fn user_for(&self, clinic_id: Option<&ClinicId>) -> CurrentUser {
        let mut user = self.session.current_user();
        if let Some(id) = clinic_id {
            user.clinic_id = Some(*id);
        }
        user
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccessConfig;
    use crate::store::{KeyValueStore, MemoryStore};
    use clinic_events::MemoryNotificationBus;
    use clinic_rbac::{ClinicModuleSettings, ModulePermissions, Role};
    use std::sync::Arc;

    struct Fixture {
        resolver: PermissionResolver,
        modules: ClinicModuleStore,
        roles: RoleRegistry,
        session: SessionContext,
    }

    fn fixture() -> Fixture {
        let config = AccessConfig::default();
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let bus = Arc::new(MemoryNotificationBus::new());
        let session = SessionContext::new(store.clone(), &config);
        let modules = ClinicModuleStore::new(store.clone(), bus.clone(), session.clone(), &config);
        let roles = RoleRegistry::new(store, bus, session.clone(), &config);
        Fixture {
            resolver: PermissionResolver::new(modules.clone(), roles.clone(), session.clone()),
            modules,
            roles,
            session,
        }
    }

    #[test]
    fn test_default_session_is_admin_everywhere() {
        let f = fixture();
        for module in Module::all() {
            assert!(f.resolver.can_view_module(module, None));
            assert!(f.resolver.can_delete_in_module(module, None));
        }
    }

    #[test]
    fn test_builtin_medico_checks() {
        let f = fixture();
        f.session.set_user_role("medico");

        assert!(f.resolver.can_view_module(Module::Agenda, None));
        assert!(f.resolver.can_create_in_module(Module::Consulta, None));
        assert!(f.resolver.can_edit_in_module(Module::Consulta, None));
        assert!(!f.resolver.can_delete_in_module(Module::Consulta, None));
        assert!(!f.resolver.can_view_module(Module::Financeiro, None));
        assert!(!f.resolver.can_view_module(Module::Equipe, None));
    }

    #[test]
    fn test_explicit_clinic_overrides_session() {
        let f = fixture();
        f.session.set_current_clinic(&ClinicId::Number(1));
        f.modules.set_enabled_modules(
            &ClinicId::Number(2),
            &ClinicModuleSettings::disabling([Module::Crm]),
        );

        assert!(f.resolver.can_view_module(Module::Crm, None));
        assert!(!f.resolver.can_view_module(Module::Crm, Some(&ClinicId::Number(2))));

        f.session.set_current_clinic(&ClinicId::Number(2));
        assert!(!f.resolver.can_view_module(Module::Crm, None));
    }

    #[test]
    fn test_disabled_module_denies_admin() {
        let f = fixture();
        let user = CurrentUser::new("admin").in_clinic(ClinicId::Number(5));
        f.modules.set_enabled_modules(
            &ClinicId::Number(5),
            &ClinicModuleSettings::disabling([Module::Estoque]),
        );

        for kind in PermissionKind::all() {
            assert!(!f.resolver.check(&user, Module::Estoque, kind));
            assert!(f.resolver.check(&user, Module::Agenda, kind));
        }
    }

    #[test]
    fn test_unknown_role_is_denied() {
        let f = fixture();
        let user = CurrentUser::new("dentista");
        assert!(f.resolver.visible_modules(&user).is_empty());
        assert!(f.resolver.effective_permissions(&user).is_empty());
    }

    #[test]
    fn test_admin_without_stored_role_is_denied() {
        let f = fixture();
        f.roles.save_roles(&[Role::medico()]);
        assert!(!f.resolver.can_view_module(Module::Dashboard, None));
    }

    #[test]
    fn test_custom_role_takes_effect_immediately() {
        let f = fixture();
        f.session.set_user_role("auditor");
        assert!(!f.resolver.can_view_module(Module::Relatorios, None));

        let auditor = Role::new("auditor", "Auditor").with_permissions(
            PermissionMatrix::new().with(Module::Relatorios, ModulePermissions::view_only()),
        );
        let mut roles = Role::builtin();
        roles.push(auditor);
        f.roles.save_roles(&roles);

        assert!(f.resolver.can_view_module(Module::Relatorios, None));
        assert!(!f.resolver.can_create_in_module(Module::Relatorios, None));
        assert_eq!(
            f.resolver.visible_modules(&f.resolver.current_user()),
            vec![Module::Relatorios]
        );
    }

    #[test]
    fn test_effective_permissions_respect_clinic_switches() {
        let f = fixture();
        let clinic = ClinicId::Number(9);
        f.modules
            .set_enabled_modules(&clinic, &ClinicModuleSettings::disabling([Module::Pagamentos]));

        let user = CurrentUser::new("recepcionista").in_clinic(clinic);
        let matrix = f.resolver.effective_permissions(&user);

        assert!(matrix.get(Module::Pagamentos).is_none());
        assert_eq!(matrix.get(Module::Agenda), Some(&ModulePermissions::full()));
        assert!(!f.resolver.visible_modules(&user).contains(&Module::Pagamentos));
    }
}
