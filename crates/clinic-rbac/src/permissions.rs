//! # Permissions
//!
//! The four-boolean grant per module and the per-role matrix of those grants.
//!
//! Decoding is fail-closed: a missing or non-boolean flag decodes as `false`,
//! and matrix entries that cannot be decoded (or name an unknown module) are
//! dropped, which denies the module entirely.

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::actions::PermissionKind;
use crate::modules::Module;

/// Grants for a single module.
///
/// # Example
///
/// ```
/// use clinic_rbac::permissions::ModulePermissions;
/// use clinic_rbac::actions::PermissionKind;
///
/// let perms = ModulePermissions::new(true, true, false, false);
/// assert!(perms.allows(PermissionKind::Create));
/// assert!(!perms.allows(PermissionKind::Delete));
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ModulePermissions {
    /// View the module.
    #[serde(default, deserialize_with = "strict_true")]
    pub view: bool,
    /// Create records.
    #[serde(default, deserialize_with = "strict_true")]
    pub create: bool,
    /// Edit records.
    #[serde(default, deserialize_with = "strict_true")]
    pub edit: bool,
    /// Delete records.
    #[serde(default, deserialize_with = "strict_true")]
    pub delete: bool,
}

/// Only a literal JSON `true` grants.
fn strict_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(matches!(value, serde_json::Value::Bool(true)))
}

impl ModulePermissions {
    /// Create a grant from the four flags.
    pub fn new(view: bool, create: bool, edit: bool, delete: bool) -> Self {
        Self {
            view,
            create,
            edit,
            delete,
        }
    }

    /// Every operation granted.
    pub fn full() -> Self {
        Self::new(true, true, true, true)
    }

    /// Nothing granted.
    pub fn none() -> Self {
        Self::default()
    }

    /// View only.
    pub fn view_only() -> Self {
        Self::new(true, false, false, false)
    }

    /// Check whether the given operation is granted.
    pub fn allows(&self, kind: PermissionKind) -> bool {
        match kind {
            PermissionKind::View => self.view,
            PermissionKind::Create => self.create,
            PermissionKind::Edit => self.edit,
            PermissionKind::Delete => self.delete,
        }
    }

    /// Set a single operation.
    pub fn set(&mut self, kind: PermissionKind, granted: bool) {
        match kind {
            PermissionKind::View => self.view = granted,
            PermissionKind::Create => self.create = granted,
            PermissionKind::Edit => self.edit = granted,
            PermissionKind::Delete => self.delete = granted,
        }
    }

    /// Check if no operation is granted.
    pub fn is_empty(&self) -> bool {
        !(self.view || self.create || self.edit || self.delete)
    }
}

/// Per-module grants for a role.
///
/// Modules absent from the matrix are fully denied.
///
/// # Example
///
/// ```
/// use clinic_rbac::permissions::{ModulePermissions, PermissionMatrix};
/// use clinic_rbac::modules::Module;
/// use clinic_rbac::actions::PermissionKind;
///
/// let mut matrix = PermissionMatrix::new();
/// matrix.insert(Module::Agenda, ModulePermissions::view_only());
///
/// assert!(matrix.allows(Module::Agenda, PermissionKind::View));
/// assert!(!matrix.allows(Module::Agenda, PermissionKind::Edit));
/// assert!(!matrix.allows(Module::Financeiro, PermissionKind::View));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<String, serde_json::Value>")]
pub struct PermissionMatrix {
    entries: BTreeMap<Module, ModulePermissions>,
}

impl PermissionMatrix {
    /// Create an empty matrix.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Create a matrix granting everything on every module.
    pub fn full() -> Self {
        Module::all()
            .into_iter()
            .map(|module| (module, ModulePermissions::full()))
            .collect()
    }

    /// Insert or replace the grants for a module.
    pub fn insert(&mut self, module: Module, permissions: ModulePermissions) {
        self.entries.insert(module, permissions);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, module: Module, permissions: ModulePermissions) -> Self {
        self.insert(module, permissions);
        self
    }

    /// Remove a module, denying it entirely.
    ///
    /// # Returns
    ///
    /// The previous grants, if the module was present
    pub fn remove(&mut self, module: Module) -> Option<ModulePermissions> {
        self.entries.remove(&module)
    }

    /// Get the grants for a module, if declared.
    pub fn get(&self, module: Module) -> Option<&ModulePermissions> {
        self.entries.get(&module)
    }

    /// Check a single operation; undeclared modules deny.
    pub fn allows(&self, module: Module, kind: PermissionKind) -> bool {
        self.get(module).is_some_and(|perms| perms.allows(kind))
    }

    /// Iterate declared modules in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (Module, &ModulePermissions)> {
        self.entries.iter().map(|(module, perms)| (*module, perms))
    }

    /// Get the count of declared modules.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(Module, ModulePermissions)> for PermissionMatrix {
    fn from_iter<T: IntoIterator<Item = (Module, ModulePermissions)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<String, serde_json::Value>> for PermissionMatrix {
    fn from(raw: BTreeMap<String, serde_json::Value>) -> Self {
        raw.into_iter()
            .filter_map(|(key, value)| {
                let module = Module::from_key(&key)?;
                let perms = serde_json::from_value::<ModulePermissions>(value).ok()?;
                Some((module, perms))
            })
            .collect()
    }
}

impl Serialize for PermissionMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (module, perms) in &self.entries {
            map.serialize_entry(module.as_str(), perms)?;
        }
        map.end()
    }
}
