//! # Permission kinds
//!
//! The four operations a role may be granted on a module.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operations that can be granted per module.
///
/// - **View**: see the module in navigation and read its data
/// - **Create**: add new records
/// - **Edit**: modify existing records
/// - **Delete**: remove records
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    /// View the module and its data.
    View,

    /// Create records in the module.
    Create,

    /// Edit records in the module.
    Edit,

    /// Delete records in the module.
    Delete,
}

impl PermissionKind {
    /// Get the string representation of the permission kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionKind::View => "view",
            PermissionKind::Create => "create",
            PermissionKind::Edit => "edit",
            PermissionKind::Delete => "delete",
        }
    }

    /// Parse a permission kind from string representation.
    ///
    /// # Example
    ///
    /// ```
    /// use clinic_rbac::actions::PermissionKind;
    ///
    /// assert_eq!(PermissionKind::parse("view"), Some(PermissionKind::View));
    /// assert_eq!(PermissionKind::parse("UPDATE"), Some(PermissionKind::Edit));
    /// assert_eq!(PermissionKind::parse("manage"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "view" | "read" => Some(PermissionKind::View),
            "create" => Some(PermissionKind::Create),
            "edit" | "update" => Some(PermissionKind::Edit),
            "delete" | "remove" => Some(PermissionKind::Delete),
            _ => None,
        }
    }

    /// Get all permission kinds.
    pub fn all() -> [Self; 4] {
        [
            PermissionKind::View,
            PermissionKind::Create,
            PermissionKind::Edit,
            PermissionKind::Delete,
        ]
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
