//! # Clinic Access
//!
//! This crate provides the stateful side of clinic access control: where the
//! module switches and roles are kept, who the current user is, and the
//! checks the navigation and action gates call.
//!
//! ## Overview
//!
//! The clinic-access crate handles:
//! - **Storage**: A string key-value seam with memory and JSON-file backends
//! - **Clinic modules**: Per-clinic enabled modules
//! - **Roles**: The process-wide role set, built-ins until customised
//! - **Session**: Active role and clinic
//! - **Resolution**: `enabled AND permitted` checks for the current user
//!
//! ## Architecture
//!
//! ```text
//! KeyValueStore
//!   ├─ ClinicModuleStore ──┐        ┌─→ NotificationBus
//!   ├─ RoleRegistry ───────┼─ writes┘
//!   └─ SessionContext      │
//!            └─────────────┴─→ PermissionResolver
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use clinic_access::ClinicAccess;
//! use clinic_rbac::{ClinicId, ClinicModuleSettings, Module};
//!
//! let access = ClinicAccess::in_memory();
//! let clinic = ClinicId::Number(42);
//!
//! access.session().set_user_role("financeiro");
//! access.session().set_current_clinic(&clinic);
//! assert!(access.resolver().can_view_module(Module::Financeiro, None));
//!
//! access
//!     .modules()
//!     .set_enabled_modules(&clinic, &ClinicModuleSettings::disabling([Module::Financeiro]));
//! assert!(!access.resolver().can_view_module(Module::Financeiro, None));
//! assert!(access.resolver().can_view_module(Module::Pagamentos, None));
//! ```
//!
//! ## Failure behaviour
//!
//! Reads never fail: unreadable or corrupt state falls back to defaults
//! (all modules enabled, built-in roles, the configured default role).
//! Writes are best-effort: a storage failure is logged with `tracing` and
//! no change notification is published.

pub mod clinic_modules;
pub mod config;
pub mod context;
pub mod error;
pub mod resolver;
pub mod roles;
pub mod store;

use std::sync::Arc;

use clinic_events::{MemoryNotificationBus, NotificationBus};

// Re-export main types for convenience
pub use clinic_modules::ClinicModuleStore;
pub use config::{AccessConfig, StorageKeys};
pub use context::{CurrentUser, SessionContext};
pub use error::{ConfigError, StoreError, StoreResult};
pub use resolver::PermissionResolver;
pub use roles::RoleRegistry;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};

/// All access-control services wired over one store and one bus.
#[derive(Clone)]
pub struct ClinicAccess {
    modules: ClinicModuleStore,
    roles: RoleRegistry,
    session: SessionContext,
    resolver: PermissionResolver,
    bus: Arc<dyn NotificationBus>,
}

impl std::fmt::Debug for ClinicAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClinicAccess")
            .field("modules", &self.modules)
            .field("roles", &self.roles)
            .field("session", &self.session)
            .finish()
    }
}

impl ClinicAccess {
    /// Wire the services over `store`, announcing changes on `bus`.
    ///
    /// `config.channel_capacity` is not applied here; it sizes the bus built
    /// by [`ClinicAccess::in_memory`], and callers passing their own bus size
    /// it themselves.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] from [`AccessConfig::validate`], so two
    /// stores can never share a storage slot.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        bus: Arc<dyn NotificationBus>,
        config: &AccessConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::wire(store, bus, config))
    }

    /// Services over a fresh in-memory store and bus, with default config.
    pub fn in_memory() -> Self {
        let config = AccessConfig::default();
        Self::wire(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryNotificationBus::with_capacity(config.channel_capacity)),
            &config,
        )
    }

    fn wire(
        store: Arc<dyn KeyValueStore>,
        bus: Arc<dyn NotificationBus>,
        config: &AccessConfig,
    ) -> Self {
        let session = SessionContext::new(store.clone(), config);
        let modules = ClinicModuleStore::new(store.clone(), bus.clone(), session.clone(), config);
        let roles = RoleRegistry::new(store, bus.clone(), session.clone(), config);
        let resolver = PermissionResolver::new(modules.clone(), roles.clone(), session.clone());

        tracing::debug!(
            modules_key = %config.keys.clinic_modules,
            roles_key = %config.keys.roles,
            default_role = %config.default_role_id,
            "Clinic access services wired"
        );

        Self {
            modules,
            roles,
            session,
            resolver,
            bus,
        }
    }

    /// Per-clinic module switches.
    pub fn modules(&self) -> &ClinicModuleStore {
        &self.modules
    }

    /// The process-wide role set.
    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    /// Active role and clinic.
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Permission checks over the stores above.
    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// The bus change notifications are published on.
    pub fn bus(&self) -> &Arc<dyn NotificationBus> {
        &self.bus
    }
}
