//! Access-control configuration.
//!
//! Names the four storage slots the stores read and write, the role assumed
//! when the session has none, and the notification channel capacity.
//! Configuration is loaded from environment variables with defaults that
//! match the keys the web client already writes.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ConfigError;
use clinic_rbac::ADMIN_ROLE_ID;

/// Well-known storage keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageKeys {
    /// Serialized clinic id → module switches map.
    pub clinic_modules: String,

    /// Serialized role list.
    pub roles: String,

    /// Scalar: active role id.
    pub current_role: String,

    /// Scalar: active clinic id.
    pub current_clinic: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            clinic_modules: "clinic_modules".to_string(),
            roles: "custom_roles".to_string(),
            current_role: "userRole".to_string(),
            current_clinic: "currentClinicId".to_string(),
        }
    }
}

/// Configuration for the access-control stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Storage slot names.
    pub keys: StorageKeys,

    /// Role assumed when the session has none.
    pub default_role_id: String,

    /// Capacity of each notification subscription channel.
    pub channel_capacity: usize,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            keys: StorageKeys::default(),
            default_role_id: ADMIN_ROLE_ID.to_string(),
            channel_capacity: 256,
        }
    }
}

impl AccessConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CLINIC_ACCESS_MODULES_KEY`: clinic module map key (default: clinic_modules)
    /// - `CLINIC_ACCESS_ROLES_KEY`: role list key (default: custom_roles)
    /// - `CLINIC_ACCESS_ROLE_KEY`: active role key (default: userRole)
    /// - `CLINIC_ACCESS_CLINIC_KEY`: active clinic key (default: currentClinicId)
    /// - `CLINIC_ACCESS_DEFAULT_ROLE`: role when none is set (default: admin)
    /// - `CLINIC_ACCESS_CHANNEL_CAPACITY`: subscription channel capacity (default: 256)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            keys: StorageKeys {
                clinic_modules: std::env::var("CLINIC_ACCESS_MODULES_KEY")
                    .unwrap_or(default.keys.clinic_modules),
                roles: std::env::var("CLINIC_ACCESS_ROLES_KEY").unwrap_or(default.keys.roles),
                current_role: std::env::var("CLINIC_ACCESS_ROLE_KEY")
                    .unwrap_or(default.keys.current_role),
                current_clinic: std::env::var("CLINIC_ACCESS_CLINIC_KEY")
                    .unwrap_or(default.keys.current_clinic),
            },
            default_role_id: std::env::var("CLINIC_ACCESS_DEFAULT_ROLE")
                .unwrap_or(default.default_role_id),
            channel_capacity: std::env::var("CLINIC_ACCESS_CHANNEL_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.channel_capacity),
        }
    }

    /// Validate the configuration.
    ///
    /// Keys must be non-empty and distinct, the default role non-empty and
    /// the channel capacity positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let keys = [
            ("keys.clinic_modules", &self.keys.clinic_modules),
            ("keys.roles", &self.keys.roles),
            ("keys.current_role", &self.keys.current_role),
            ("keys.current_clinic", &self.keys.current_clinic),
        ];

        let mut seen = HashSet::new();
        for (name, value) in keys {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: name.to_string(),
                    message: "must not be empty".to_string(),
                });
            }
            if !seen.insert(value.as_str()) {
                return Err(ConfigError::DuplicateKey(value.clone()));
            }
        }

        if self.default_role_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "default_role_id".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        if self.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "channel_capacity".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}
