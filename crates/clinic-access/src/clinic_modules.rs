//! Per-clinic module switches
//!
//! All clinics share one storage slot holding a JSON object from clinic id
//! to that clinic's [`ClinicModuleSettings`]. Reads are total: a missing or
//! unreadable slot, or a missing or malformed clinic entry, reads as "all
//! modules enabled". Writes are best-effort and announce themselves on the
//! notification bus.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::AccessConfig;
use crate::context::SessionContext;
use crate::error::StoreResult;
use crate::store::KeyValueStore;
use clinic_events::{AccessEvent, NotificationBus};
use clinic_rbac::{ClinicId, ClinicModuleSettings, Module};

/// Store of enabled modules per clinic.
#[derive(Clone)]
pub struct ClinicModuleStore {
    store: Arc<dyn KeyValueStore>,
    bus: Arc<dyn NotificationBus>,
    session: SessionContext,
    key: String,
}

impl std::fmt::Debug for ClinicModuleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClinicModuleStore")
            .field("key", &self.key)
            .finish()
    }
}

impl ClinicModuleStore {
    /// Creates a module store.
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
            key: config.keys.clinic_modules.clone(),
        }
    }

    /// Read the raw clinic map.
    ///
    /// A missing slot, or one that is not a JSON object, reads as empty. A
    /// failed read is returned so writers can abort instead of replacing
    /// other clinics' entries with nothing.
    fn load_map(&self) -> StoreResult<Map<String, Value>> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(Map::new());
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => {
                tracing::warn!(
                    key = %self.key,
                    "Clinic modules slot is not an object; using defaults"
                );
                Ok(Map::new())
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    key = %self.key,
                    "Corrupt clinic modules slot; using defaults"
                );
                Ok(Map::new())
            }
        }
    }

    /// Read the clinic map for a write, or `None` if the slot is unreadable.
    fn load_map_for_write(&self, clinic_id: &ClinicId) -> Option<Map<String, Value>> {
        match self.load_map() {
            Ok(map) => Some(map),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    code = e.error_code(),
                    clinic_id = %clinic_id,
                    "Failed to read clinic modules; change not applied"
                );
                None
            }
        }
    }

    /// Write the raw clinic map and announce the change.
    fn store_map(&self, clinic_id: &ClinicId, map: Map<String, Value>) {
        let encoded = match serde_json::to_string(&Value::Object(map)) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    clinic_id = %clinic_id,
                    "Failed to encode clinic modules"
                );
                return;
            }
        };

        if let Err(e) = self.store.set(&self.key, &encoded) {
            tracing::warn!(
                error = %e,
                code = e.error_code(),
                clinic_id = %clinic_id,
                "Failed to store clinic modules; change not applied"
            );
            return;
        }

        let event = AccessEvent::ClinicModulesChanged {
            clinic_id: *clinic_id,
        };
        if let Err(e) = self.bus.publish(event.to_event()) {
            tracing::warn!(
                error = %e,
                clinic_id = %clinic_id,
                "Failed to announce clinic modules change"
            );
        }
    }

    /// Get a clinic's module switches.
    ///
    /// Never fails: clinics without stored settings, or with settings that
    /// cannot be decoded, get the all-enabled default.
    pub fn get_enabled_modules(&self, clinic_id: &ClinicId) -> ClinicModuleSettings {
        let mut map = self.load_map().unwrap_or_else(|e| {
            tracing::warn!(
                error = %e,
                key = %self.key,
                "Failed to read clinic modules; using defaults"
            );
            Map::new()
        });
        let Some(entry) = map.remove(&clinic_id.to_string()) else {
            return ClinicModuleSettings::default();
        };

        serde_json::from_value(entry).unwrap_or_else(|e| {
            tracing::warn!(
                error = %e,
                clinic_id = %clinic_id,
                "Corrupt module settings for clinic; using defaults"
            );
            ClinicModuleSettings::default()
        })
    }

    /// Replace a clinic's module switches wholesale.
    ///
    /// Other clinics' entries are kept as stored. On success a
    /// `clinic.modules_changed` event is published, once per call; on storage
    /// failure the change is logged and dropped.
    pub fn set_enabled_modules(&self, clinic_id: &ClinicId, settings: &ClinicModuleSettings) {
        let entry = match serde_json::to_value(settings) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    clinic_id = %clinic_id,
                    "Failed to encode module settings"
                );
                return;
            }
        };

        let Some(mut map) = self.load_map_for_write(clinic_id) else {
            return;
        };
        map.insert(clinic_id.to_string(), entry);
        self.store_map(clinic_id, map);
    }

    /// Drop a clinic's stored switches, returning it to the all-enabled
    /// default. Publishes the same change event as a write.
    pub fn clear_enabled_modules(&self, clinic_id: &ClinicId) {
        let Some(mut map) = self.load_map_for_write(clinic_id) else {
            return;
        };
        map.remove(&clinic_id.to_string());
        self.store_map(clinic_id, map);
    }

    /// Settings that apply to a clinic scope; no clinic means no restriction.
    pub fn settings_for(&self, clinic_id: Option<&ClinicId>) -> ClinicModuleSettings {
        match clinic_id {
            Some(id) => self.get_enabled_modules(id),
            None => ClinicModuleSettings::default(),
        }
    }

    /// Check if a module is enabled for a clinic.
    ///
    /// Without a clinic id, the session's active clinic is used.
    pub fn is_module_enabled(&self, module: Module, clinic_id: Option<&ClinicId>) -> bool {
        let current;
        let clinic_id = match clinic_id {
            Some(id) => Some(id),
            None => {
                current = self.session.get_current_clinic();
                current.as_ref()
            }
        };
        self.settings_for(clinic_id).is_enabled(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryStore;
    use clinic_events::MemoryNotificationBus;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn fixture() -> (ClinicModuleStore, Arc<MemoryStore>, Arc<MemoryNotificationBus>) {
        let config = AccessConfig::default();
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(MemoryNotificationBus::new());
        let session = SessionContext::new(store.clone(), &config);
        let modules = ClinicModuleStore::new(store.clone(), bus.clone(), session, &config);
        (modules, store, bus)
    }

    fn disabling<const N: usize>(modules: [Module; N]) -> ClinicModuleSettings {
        ClinicModuleSettings::disabling(modules)
    }

    #[test]
    fn test_unknown_clinic_is_all_enabled() {
        let (modules, _, _) = fixture();
        let settings = modules.get_enabled_modules(&ClinicId::Number(99));
        for module in Module::all() {
            assert!(settings.is_enabled(module));
            assert!(modules.is_module_enabled(module, Some(&ClinicId::Number(99))));
        }
    }

    #[test]
    fn test_set_replaces_wholesale() {
        let (modules, _, _) = fixture();
        let clinic = ClinicId::Number(1);

        modules.set_enabled_modules(&clinic, &disabling([Module::Crm, Module::Estoque]));
        modules.set_enabled_modules(&clinic, &disabling([Module::Agenda]));

        let settings = modules.get_enabled_modules(&clinic);
        assert_eq!(settings.disabled_modules(), vec![Module::Agenda]);
        assert!(settings.is_enabled(Module::Crm));
    }

    #[test]
    fn test_clinics_are_isolated() {
        let (modules, _, _) = fixture();
        let (first, second) = (ClinicId::Number(1), ClinicId::Number(2));
        modules.set_enabled_modules(&first, &disabling([Module::Crm]));
        modules.set_enabled_modules(&second, &disabling([Module::Estoque]));

        assert!(!modules.is_module_enabled(Module::Crm, Some(&first)));
        assert!(modules.is_module_enabled(Module::Estoque, Some(&first)));
        assert!(modules.is_module_enabled(Module::Crm, Some(&second)));
        assert!(!modules.is_module_enabled(Module::Estoque, Some(&second)));
    }

    #[test]
    fn test_each_write_publishes() {
        let (modules, _, bus) = fixture();
        let mut sub = bus.subscribe("clinic.modules_changed").unwrap();
        let clinic = ClinicId::Number(42);
        let settings = disabling([Module::Financeiro]);

        modules.set_enabled_modules(&clinic, &settings);
        modules.set_enabled_modules(&clinic, &settings);

        let events = sub.drain();
        assert_eq!(events.len(), 2);
        for event in &events {
            assert_eq!(
                AccessEvent::from_event(event),
                Some(AccessEvent::ClinicModulesChanged { clinic_id: clinic })
            );
        }
        assert_eq!(modules.get_enabled_modules(&clinic), settings);
    }

    #[test]
    fn test_uses_session_clinic_when_omitted() {
        let (modules, store, _) = fixture();
        modules.set_enabled_modules(&ClinicId::Number(7), &disabling([Module::Suporte]));

        assert!(modules.is_module_enabled(Module::Suporte, None));

        store.set("currentClinicId", "7").unwrap();
        assert!(!modules.is_module_enabled(Module::Suporte, None));
        assert!(modules.is_module_enabled(Module::Suporte, Some(&ClinicId::Number(8))));
    }

    #[test]
    fn test_corrupt_slot_reads_as_defaults() {
        let (modules, store, _) = fixture();
        let clinic = ClinicId::Number(1);
        store.set("clinic_modules", "{not json").unwrap();
        assert_eq!(
            modules.get_enabled_modules(&clinic),
            ClinicModuleSettings::default()
        );

        store.set("clinic_modules", "[]").unwrap();
        assert!(modules.is_module_enabled(Module::Agenda, Some(&clinic)));

        // A later write replaces the corrupt slot.
        modules.set_enabled_modules(&clinic, &disabling([Module::Agenda]));
        assert!(!modules.is_module_enabled(Module::Agenda, Some(&clinic)));
    }

    #[test]
    fn test_corrupt_entry_only_affects_its_clinic() {
        let (modules, store, _) = fixture();
        store
            .set("clinic_modules", r#"{"1": "broken", "2": {"Agenda": false}}"#)
            .unwrap();

        assert!(modules.is_module_enabled(Module::Agenda, Some(&ClinicId::Number(1))));
        assert!(!modules.is_module_enabled(Module::Agenda, Some(&ClinicId::Number(2))));
    }

    #[test]
    fn test_clear_restores_defaults_and_publishes() {
        let (modules, _, bus) = fixture();
        let clinic = ClinicId::Number(3);
        modules.set_enabled_modules(&clinic, &disabling([Module::Crm]));

        let mut sub = bus.subscribe("#").unwrap();
        modules.clear_enabled_modules(&clinic);

        assert!(modules.is_module_enabled(Module::Crm, Some(&clinic)));
        assert_eq!(sub.drain().len(), 1);
    }

    /// Store whose writes always fail.
    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> StoreResult<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable("read-only".to_string()))
        }

        fn remove(&self, _key: &str) -> StoreResult<()> {
            Err(StoreError::Unavailable("read-only".to_string()))
        }
    }

    /// Store whose reads fail while `failing` is set.
    #[derive(Default)]
    struct FlakyReadStore {
        inner: MemoryStore,
        failing: AtomicBool,
    }

    impl KeyValueStore for FlakyReadStore {
        fn get(&self, key: &str) -> StoreResult<Option<String>> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("read timed out".to_string()));
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> StoreResult<()> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> StoreResult<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_failed_write_is_silent_and_unannounced() {
        let config = AccessConfig::default();
        let store: Arc<dyn KeyValueStore> = Arc::new(ReadOnlyStore(MemoryStore::new()));
        let bus = Arc::new(MemoryNotificationBus::new());
        let session = SessionContext::new(store.clone(), &config);
        let modules = ClinicModuleStore::new(store, bus.clone(), session, &config);
        let mut sub = bus.subscribe("#").unwrap();

        modules.set_enabled_modules(&ClinicId::Number(1), &disabling([Module::Crm]));

        assert!(modules.is_module_enabled(Module::Crm, Some(&ClinicId::Number(1))));
        assert!(sub.drain().is_empty());
        assert_eq!(bus.stats().events_published, 0);
    }

    #[test]
    fn test_unreadable_slot_aborts_write_and_keeps_other_clinics() {
        let config = AccessConfig::default();
        let store = Arc::new(FlakyReadStore::default());
        let bus = Arc::new(MemoryNotificationBus::new());
        let session = SessionContext::new(store.clone(), &config);
        let modules = ClinicModuleStore::new(store.clone(), bus.clone(), session, &config);
        let (first, second) = (ClinicId::Number(1), ClinicId::Number(2));

        modules.set_enabled_modules(&first, &disabling([Module::Financeiro]));
        let mut sub = bus.subscribe("#").unwrap();

        store.failing.store(true, Ordering::SeqCst);
        modules.set_enabled_modules(&second, &disabling([Module::Crm]));
        modules.clear_enabled_modules(&first);
        store.failing.store(false, Ordering::SeqCst);

        assert!(!modules.is_module_enabled(Module::Financeiro, Some(&first)));
        assert!(modules.is_module_enabled(Module::Crm, Some(&second)));
        assert!(sub.drain().is_empty());
    }
}
