//! Clinic identifiers and per-clinic module switches
//!
//! A clinic is the tenant. Clinics created by the legacy back office carry
//! integer ids; newer ones carry UUIDs. Both forms coexist in storage.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::modules::Module;

/// Identifier of a clinic.
///
/// Serialized untagged: a JSON number for integer ids, a string for UUIDs.
///
/// # Examples
///
/// ```
/// use clinic_rbac::clinic::ClinicId;
///
/// let id: ClinicId = "42".parse().unwrap();
/// assert_eq!(id, ClinicId::Number(42));
/// assert_eq!(id.to_string(), "42");
///
/// assert!("not-a-clinic".parse::<ClinicId>().is_err());
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(untagged)]
pub enum ClinicId {
    /// Integer id.
    Number(i64),
    /// UUID id.
    Uuid(Uuid),
}

/// Error returned when a string is neither an integer nor a UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidClinicId(pub String);

impl fmt::Display for InvalidClinicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid clinic id: {:?}", self.0)
    }
}

impl std::error::Error for InvalidClinicId {}

impl FromStr for ClinicId {
    type Err = InvalidClinicId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return Ok(ClinicId::Number(n));
        }
        Uuid::parse_str(trimmed)
            .map(ClinicId::Uuid)
            .map_err(|_| InvalidClinicId(s.to_string()))
    }
}

impl fmt::Display for ClinicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClinicId::Number(n) => write!(f, "{}", n),
            ClinicId::Uuid(id) => write!(f, "{}", id),
        }
    }
}

impl From<i64> for ClinicId {
    fn from(n: i64) -> Self {
        ClinicId::Number(n)
    }
}

impl From<Uuid> for ClinicId {
    fn from(id: Uuid) -> Self {
        ClinicId::Uuid(id)
    }
}

/// Which modules a clinic has switched on.
///
/// Modules without an entry are enabled, so an empty value (the default)
/// enables everything. Stored values other than `false` decode as enabled;
/// unknown module keys are dropped.
///
/// # Examples
///
/// ```
/// use clinic_rbac::clinic::ClinicModuleSettings;
/// use clinic_rbac::modules::Module;
///
/// let mut settings = ClinicModuleSettings::all_enabled();
/// settings.set(Module::Financeiro, false);
///
/// assert!(!settings.is_enabled(Module::Financeiro));
/// assert!(settings.is_enabled(Module::Pagamentos));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<String, serde_json::Value>")]
pub struct ClinicModuleSettings {
    modules: BTreeMap<Module, bool>,
}

impl ClinicModuleSettings {
    /// Settings with every module explicitly enabled.
    pub fn all_enabled() -> Self {
        Module::all().into_iter().map(|m| (m, true)).collect()
    }

    /// Settings with only the given modules explicitly disabled.
    pub fn disabling<I>(modules: I) -> Self
    where
        I: IntoIterator<Item = Module>,
    {
        modules.into_iter().map(|m| (m, false)).collect()
    }

    /// Check if a module is enabled; missing entries are enabled.
    pub fn is_enabled(&self, module: Module) -> bool {
        self.modules.get(&module).copied().unwrap_or(true)
    }

    /// Switch a module on or off.
    pub fn set(&mut self, module: Module, enabled: bool) {
        self.modules.insert(module, enabled);
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, module: Module, enabled: bool) -> Self {
        self.set(module, enabled);
        self
    }

    /// Get the stored flag for a module, if any.
    pub fn get(&self, module: Module) -> Option<bool> {
        self.modules.get(&module).copied()
    }

    /// Modules switched off, in registry order.
    pub fn disabled_modules(&self) -> Vec<Module> {
        self.modules
            .iter()
            .filter(|(_, enabled)| !**enabled)
            .map(|(module, _)| *module)
            .collect()
    }

    /// Modules switched on (explicitly or by default), in registry order.
    pub fn enabled_modules(&self) -> Vec<Module> {
        Module::all()
            .into_iter()
            .filter(|m| self.is_enabled(*m))
            .collect()
    }

    /// Iterate stored entries in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (Module, bool)> + '_ {
        self.modules.iter().map(|(m, enabled)| (*m, *enabled))
    }
}

impl FromIterator<(Module, bool)> for ClinicModuleSettings {
    fn from_iter<T: IntoIterator<Item = (Module, bool)>>(iter: T) -> Self {
        Self {
            modules: iter.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<String, serde_json::Value>> for ClinicModuleSettings {
    fn from(raw: BTreeMap<String, serde_json::Value>) -> Self {
        raw.into_iter()
            .filter_map(|(key, value)| {
                let module = Module::from_key(&key)?;
                Some((module, value != serde_json::Value::Bool(false)))
            })
            .collect()
    }
}

impl Serialize for ClinicModuleSettings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.modules.len()))?;
        for (module, enabled) in &self.modules {
            map.serialize_entry(module.as_str(), enabled)?;
        }
        map.end()
    }
}
