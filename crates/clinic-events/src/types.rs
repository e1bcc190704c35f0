//! Event types for change notifications
//!
//! This module defines the event envelope and the typed events published
//! when a clinic's module switches or the role set change.

use chrono::{DateTime, Utc};
use clinic_rbac::ClinicId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Event type published after a clinic's module switches are written.
pub const CLINIC_MODULES_CHANGED: &str = "clinic.modules_changed";

/// Event type published after the role set is replaced.
pub const ROLES_CHANGED: &str = "roles.changed";

/// Notification envelope.
///
/// All events are wrapped in this envelope which provides metadata
/// for routing and tracing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID
    pub id: Uuid,

    /// Event type (e.g., "clinic.modules_changed"); also the routing topic
    pub event_type: String,

    /// Timestamp when event was created
    pub timestamp: DateTime<Utc>,

    /// Clinic the change applies to, if clinic-scoped
    pub clinic_id: Option<ClinicId>,

    /// Correlation ID for tracing
    pub correlation_id: Option<String>,

    /// Event version for schema evolution
    pub version: u32,

    /// Event payload
    pub payload: serde_json::Value,

    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Event {
    /// Create a new event.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The event type string
    /// * `payload` - The event payload
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            clinic_id: None,
            correlation_id: None,
            version: 1,
            payload,
            metadata: HashMap::new(),
        }
    }

    /// Set clinic context.
    pub fn with_clinic(mut self, clinic_id: ClinicId) -> Self {
        self.clinic_id = Some(clinic_id);
        self
    }

    /// Set correlation ID.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Add metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Get the routing topic for this event.
    pub fn topic(&self) -> &str {
        &self.event_type
    }

    /// Parse the payload into a specific type.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Changes to the access-control data that dependents re-query on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccessEvent {
    /// A clinic's enabled modules were written.
    ClinicModulesChanged { clinic_id: ClinicId },
    /// The role set was replaced. Process-wide, not clinic-scoped.
    RolesChanged,
}

#[derive(Deserialize)]
struct ClinicPayload {
    clinic_id: ClinicId,
}

impl AccessEvent {
    /// Get the event type string.
    pub fn event_type(&self) -> &'static str {
        match self {
            AccessEvent::ClinicModulesChanged { .. } => CLINIC_MODULES_CHANGED,
            AccessEvent::RolesChanged => ROLES_CHANGED,
        }
    }

    /// Convert to generic event.
    pub fn to_event(&self) -> Event {
        match self {
            AccessEvent::ClinicModulesChanged { clinic_id } => Event::new(
                self.event_type(),
                serde_json::json!({ "clinic_id": clinic_id }),
            )
            .with_clinic(*clinic_id),
            AccessEvent::RolesChanged => Event::new(self.event_type(), serde_json::Value::Null),
        }
    }

    /// Recover the typed event from an envelope.
    ///
    /// Returns `None` for other event types or unreadable payloads.
    pub fn from_event(event: &Event) -> Option<Self> {
        match event.event_type.as_str() {
            CLINIC_MODULES_CHANGED => {
                let clinic_id = match event.clinic_id {
                    Some(id) => id,
                    None => event.parse_payload::<ClinicPayload>().ok()?.clinic_id,
                };
                Some(AccessEvent::ClinicModulesChanged { clinic_id })
            }
            ROLES_CHANGED => Some(AccessEvent::RolesChanged),
            _ => None,
        }
    }
}
