//! # Roles
//!
//! A role is a named bundle of per-module grants. Four roles ship built in;
//! administrators may replace the whole set at runtime.

use serde::{Deserialize, Serialize};

use crate::modules::Module;
use crate::permissions::{ModulePermissions, PermissionMatrix};

/// Identifier of the role that bypasses its own matrix.
pub const ADMIN_ROLE_ID: &str = "admin";

/// Built-in physician role.
pub const MEDICO_ROLE_ID: &str = "medico";

/// Built-in front-desk role.
pub const RECEPCIONISTA_ROLE_ID: &str = "recepcionista";

/// Built-in finance role.
pub const FINANCEIRO_ROLE_ID: &str = "financeiro";

/// A role and its permission matrix.
///
/// # Examples
///
/// ```
/// use clinic_rbac::roles::Role;
/// use clinic_rbac::modules::Module;
/// use clinic_rbac::actions::PermissionKind;
///
/// let medico = Role::medico();
/// assert_eq!(medico.id, "medico");
/// assert!(medico.module_permissions.allows(Module::Pacientes, PermissionKind::View));
/// assert!(!medico.module_permissions.allows(Module::Pacientes, PermissionKind::Edit));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Role identifier (e.g. "medico").
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Per-module grants.
    #[serde(default)]
    pub module_permissions: PermissionMatrix,
}

impl Role {
    /// Create a role with an empty matrix.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            module_permissions: PermissionMatrix::new(),
        }
    }

    /// Replace the matrix.
    pub fn with_permissions(mut self, module_permissions: PermissionMatrix) -> Self {
        self.module_permissions = module_permissions;
        self
    }

    /// Check if this is the admin role.
    pub fn is_admin(&self) -> bool {
        self.id == ADMIN_ROLE_ID
    }

    /// Built-in administrator: everything on every module.
    pub fn admin() -> Self {
        Self::new(ADMIN_ROLE_ID, "Administrador").with_permissions(PermissionMatrix::full())
    }

    /// Built-in physician.
    pub fn medico() -> Self {
        let vce = ModulePermissions::new(true, true, true, false);
        let vc = ModulePermissions::new(true, true, false, false);
        let v = ModulePermissions::view_only();

        Self::new(MEDICO_ROLE_ID, "Médico").with_permissions(
            PermissionMatrix::new()
                .with(Module::Dashboard, v)
                .with(Module::Agenda, vce)
                .with(Module::Consulta, vce)
                .with(Module::Pacientes, v)
                .with(Module::Estoque, v)
                .with(Module::Comunicacao, vc)
                .with(Module::Relatorios, v)
                .with(Module::Suporte, vc)
                .with(Module::Convenios, v),
        )
    }

    /// Built-in front desk.
    pub fn recepcionista() -> Self {
        let vce = ModulePermissions::new(true, true, true, false);
        let vc = ModulePermissions::new(true, true, false, false);
        let v = ModulePermissions::view_only();

        Self::new(RECEPCIONISTA_ROLE_ID, "Recepcionista").with_permissions(
            PermissionMatrix::new()
                .with(Module::Dashboard, v)
                .with(Module::Agenda, ModulePermissions::full())
                .with(Module::Consulta, v)
                .with(Module::Pacientes, vce)
                .with(Module::Crm, vce)
                .with(Module::Pagamentos, vc)
                .with(Module::Estoque, v)
                .with(Module::Comunicacao, vc)
                .with(Module::Suporte, vc)
                .with(Module::Convenios, v),
        )
    }

    /// Built-in finance staff.
    pub fn financeiro() -> Self {
        let vce = ModulePermissions::new(true, true, true, false);
        let vc = ModulePermissions::new(true, true, false, false);
        let v = ModulePermissions::view_only();

        Self::new(FINANCEIRO_ROLE_ID, "Financeiro").with_permissions(
            PermissionMatrix::new()
                .with(Module::Dashboard, v)
                .with(Module::Pacientes, v)
                .with(Module::Financeiro, ModulePermissions::full())
                .with(Module::Pagamentos, vce)
                .with(Module::Estoque, v)
                .with(Module::Comunicacao, vc)
                .with(Module::Relatorios, vc)
                .with(Module::Suporte, vc)
                .with(Module::Convenios, vce),
        )
    }

    /// The built-in role set, in display order.
    pub fn builtin() -> Vec<Role> {
        vec![
            Self::admin(),
            Self::medico(),
            Self::recepcionista(),
            Self::financeiro(),
        ]
    }
}

/// Find a role by id.
pub fn find_role<'a>(roles: &'a [Role], id: &str) -> Option<&'a Role> {
    roles.iter().find(|role| role.id == id)
}
