//! # Clinic Events
//!
//! This crate provides the change notifications for the clinic access
//! control data, so that navigation and action gates re-query permissions
//! after an administrator changes something.
//!
//! ## Overview
//!
//! The clinic-events crate handles:
//! - **Event Types**: An envelope plus typed access-control events
//! - **Notification Bus**: Publish/subscribe messaging
//! - **Handlers**: Inline callbacks run on the publishing thread
//!
//! ## Event Types
//!
//! - `clinic.modules_changed`: A clinic's enabled modules were written
//!   (payload: clinic id)
//! - `roles.changed`: The role set was replaced (no payload)
//!
//! ## Usage
//!
//! ### Publishing and subscribing
//!
//! ```rust
//! use clinic_events::{AccessEvent, MemoryNotificationBus, NotificationBus};
//! use clinic_rbac::ClinicId;
//!
//! let bus = MemoryNotificationBus::new();
//! let mut sub = bus.subscribe("clinic.*").unwrap();
//!
//! let event = AccessEvent::ClinicModulesChanged { clinic_id: ClinicId::Number(42) };
//! bus.publish(event.to_event()).unwrap();
//!
//! let received = sub.try_recv().unwrap().unwrap();
//! assert_eq!(AccessEvent::from_event(&received), Some(event));
//! ```
//!
//! ## Topic Patterns
//!
//! Topics are the event type, split on `.`:
//! - `clinic.modules_changed` - Specific event
//! - `clinic.*` - All clinic events
//! - `#` - All events
//!
//! Wildcards:
//! - `*` matches exactly one segment
//! - `#` matches zero or more segments
//!
//! ## Delivery
//!
//! Fire-and-forget. A subscriber registered after an event was published
//! never sees it, and nothing is persisted or replayed.

pub mod bus;
pub mod types;

// Re-export main types
pub use bus::{
    topic_matches, EventBusError, EventBusResult, EventBusStats, EventHandler, FnHandler,
    MemoryNotificationBus, NotificationBus, Subscription,
};
pub use types::{AccessEvent, Event, CLINIC_MODULES_CHANGED, ROLES_CHANGED};
