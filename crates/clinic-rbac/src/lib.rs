//! # Clinic RBAC (Role-Based Access Control)
//!
//! This crate provides the permission model for the clinic-management
//! application: which feature modules exist, which of them a clinic has
//! switched on, and what each role may do in them.
//!
//! ## Overview
//!
//! The clinic-rbac crate handles:
//! - **Modules**: The closed set of 14 feature areas
//! - **Permission kinds**: View, create, edit, delete
//! - **Permission matrices**: Per-role, per-module grants
//! - **Roles**: Built-in roles and custom role sets
//! - **Clinic switches**: Per-clinic enabled modules
//! - **Resolution**: `enabled AND permitted`
//!
//! ## Architecture
//!
//! ```text
//! ClinicModuleSettings ──┐
//!                        ├─→ resolve_permission(module, kind) ─→ bool
//! [Role] + role id ──────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use clinic_rbac::{resolve_permission, ClinicModuleSettings, Module, PermissionKind, Role};
//!
//! let roles = Role::builtin();
//! let settings = ClinicModuleSettings::default();
//!
//! let pacientes = |kind| resolve_permission(&settings, &roles, "medico", Module::Pacientes, kind);
//! assert!(pacientes(PermissionKind::View));
//! assert!(!pacientes(PermissionKind::Delete));
//! ```
//!
//! ## Fail-closed decoding
//!
//! Stored matrices decode leniently but never widen access: missing or
//! non-boolean flags deny, unknown modules are dropped. Stored module switches
//! only disable a module on a literal `false`.

pub mod actions;
pub mod clinic;
pub mod modules;
pub mod permissions;
pub mod resolve;
pub mod roles;

// Re-export main types for convenience
pub use actions::PermissionKind;
pub use clinic::{ClinicId, ClinicModuleSettings, InvalidClinicId};
pub use modules::Module;
pub use permissions::{ModulePermissions, PermissionMatrix};
pub use resolve::{effective_matrix, resolve_permission, visible_modules};
pub use roles::{find_role, Role, ADMIN_ROLE_ID};
