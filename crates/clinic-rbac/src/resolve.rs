//! # Permission resolution
//!
//! Combines a clinic's module switches with the role set to answer
//! "may this role perform this operation on this module".
//!
//! The answer is `enabled AND permitted`, evaluated in this order:
//!
//! 1. module disabled for the clinic → deny, for every role including admin
//! 2. role id not in the role set → deny
//! 3. role id is [`ADMIN_ROLE_ID`] → allow
//! 4. module not declared in the role's matrix → deny
//! 5. the stored flag for the operation

use crate::actions::PermissionKind;
use crate::clinic::ClinicModuleSettings;
use crate::modules::Module;
use crate::permissions::{ModulePermissions, PermissionMatrix};
use crate::roles::{find_role, Role, ADMIN_ROLE_ID};

/// Resolve a single permission.
///
/// # Example
///
/// ```
/// use clinic_rbac::{resolve_permission, ClinicModuleSettings, Module, PermissionKind, Role};
///
/// let roles = Role::builtin();
/// let settings = ClinicModuleSettings::disabling([Module::Financeiro]);
///
/// let can_view = |module| {
///     resolve_permission(&settings, &roles, "financeiro", module, PermissionKind::View)
/// };
/// assert!(!can_view(Module::Financeiro));
/// assert!(can_view(Module::Pagamentos));
/// ```
pub fn resolve_permission(
    settings: &ClinicModuleSettings,
    roles: &[Role],
    role_id: &str,
    module: Module,
    kind: PermissionKind,
) -> bool {
    if !settings.is_enabled(module) {
        return false;
    }

    let Some(role) = find_role(roles, role_id) else {
        return false;
    };

    if role_id == ADMIN_ROLE_ID {
        return true;
    }

    role.module_permissions.allows(module, kind)
}

/// Resolve every operation on every module for a role.
///
/// Modules where nothing is granted are left out, so the result reads like
/// a role matrix: absent means denied.
pub fn effective_matrix(
    settings: &ClinicModuleSettings,
    roles: &[Role],
    role_id: &str,
) -> PermissionMatrix {
    Module::all()
        .into_iter()
        .filter_map(|module| {
            let mut perms = ModulePermissions::none();
            for kind in PermissionKind::all() {
                perms.set(kind, resolve_permission(settings, roles, role_id, module, kind));
            }
            (!perms.is_empty()).then_some((module, perms))
        })
        .collect()
}

/// Modules a role may view, in registry order.
pub fn visible_modules(
    settings: &ClinicModuleSettings,
    roles: &[Role],
    role_id: &str,
) -> Vec<Module> {
    Module::all()
        .into_iter()
        .filter(|module| {
            resolve_permission(settings, roles, role_id, *module, PermissionKind::View)
        })
        .collect()
}
