//! Notification bus implementation
//!
//! This module provides the notification bus abstraction and an in-memory
//! implementation for publishing and subscribing to change events.
//!
//! Delivery is fire-and-forget: only subscribers registered at publish time
//! see an event, nothing is persisted, and there is no ordering guarantee
//! across topics. Handlers run inline on the publishing thread.

use crate::types::Event;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// Notification bus error types.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// Failed to publish event
    #[error("Failed to publish event: {0}")]
    PublishError(String),

    /// Failed to subscribe
    #[error("Failed to subscribe: {0}")]
    SubscribeError(String),

    /// No subscription or handler with this ID
    #[error("Unknown subscription: {0}")]
    UnknownSubscription(String),

    /// Handler rejected an event
    #[error("Handler failed: {0}")]
    HandlerError(String),

    /// Channel closed
    #[error("Channel closed")]
    ChannelClosed,

    /// Receiver fell behind and missed events
    #[error("Subscriber lagged behind by {0} events")]
    Lagged(u64),
}

/// Result type for notification bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Subscription handle for receiving events.
pub struct Subscription {
    /// Subscription ID
    pub id: String,
    /// Topic pattern
    pub topic: String,
    /// Event receiver
    pub receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Receive the next event.
    pub async fn recv(&mut self) -> EventBusResult<Event> {
        self.receiver.recv().await.map_err(|e| match e {
            RecvError::Closed => EventBusError::ChannelClosed,
            RecvError::Lagged(n) => EventBusError::Lagged(n),
        })
    }

    /// Take the next event if one is already queued.
    pub fn try_recv(&mut self) -> EventBusResult<Option<Event>> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => Err(EventBusError::ChannelClosed),
            Err(TryRecvError::Lagged(n)) => Err(EventBusError::Lagged(n)),
        }
    }

    /// Take every queued event, skipping over any lag gap.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        loop {
            match self.try_recv() {
                Ok(Some(event)) => events.push(event),
                Err(EventBusError::Lagged(_)) => continue,
                Ok(None) | Err(_) => break,
            }
        }
        events
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .finish()
    }
}

/// Event handler trait for processing events inline.
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    fn handle(&self, event: &Event) -> EventBusResult<()>;

    /// Get the topics this handler is interested in.
    fn topics(&self) -> Vec<String>;
}

/// Closure-backed handler for a single topic pattern.
pub struct FnHandler<F> {
    topic: String,
    callback: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&Event) + Send + Sync,
{
    /// Wrap a closure as a handler for `topic`.
    pub fn new(topic: impl Into<String>, callback: F) -> Self {
        Self {
            topic: topic.into(),
            callback,
        }
    }
}

impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&Event) + Send + Sync,
{
    fn handle(&self, event: &Event) -> EventBusResult<()> {
        (self.callback)(event);
        Ok(())
    }

    fn topics(&self) -> Vec<String> {
        vec![self.topic.clone()]
    }
}

/// Notification bus trait for publish/subscribe operations.
pub trait NotificationBus: Send + Sync {
    /// Publish an event.
    fn publish(&self, event: Event) -> EventBusResult<()>;

    /// Subscribe to a topic pattern through a channel.
    ///
    /// Topic patterns support wildcards:
    /// - `*` matches any single segment
    /// - `#` matches zero or more segments
    ///
    /// Examples:
    /// - `clinic.*` matches `clinic.modules_changed`
    /// - `#` matches every event
    fn subscribe(&self, topic: &str) -> EventBusResult<Subscription>;

    /// Register an inline event handler.
    ///
    /// # Returns
    ///
    /// The handler ID, accepted by [`unsubscribe`](Self::unsubscribe)
    fn register_handler(&self, handler: Arc<dyn EventHandler>) -> EventBusResult<String>;

    /// Remove a channel subscription or handler.
    fn unsubscribe(&self, subscription_id: &str) -> EventBusResult<()>;

    /// Get notification bus stats.
    fn stats(&self) -> EventBusStats;
}

/// Notification bus statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventBusStats {
    /// Total events published
    pub events_published: u64,
    /// Total deliveries (channel sends plus successful handler calls)
    pub events_delivered: u64,
    /// Active channel subscriptions
    pub active_subscriptions: usize,
    /// Registered handlers
    pub registered_handlers: usize,
}

struct ChannelSubscriber {
    pattern: String,
    sender: broadcast::Sender<Event>,
}

struct RegisteredHandler {
    id: String,
    handler: Arc<dyn EventHandler>,
}

/// In-memory notification bus.
///
/// Each channel subscription owns a bounded broadcast channel; a subscriber
/// that falls more than `channel_capacity` events behind observes
/// [`EventBusError::Lagged`].
pub struct MemoryNotificationBus {
    /// Channel subscribers by subscription ID
    subscribers: RwLock<HashMap<String, ChannelSubscriber>>,
    /// Registered handlers, in registration order
    handlers: RwLock<Vec<RegisteredHandler>>,
    /// Statistics
    events_published: AtomicU64,
    events_delivered: AtomicU64,
    /// Per-subscription channel capacity
    channel_capacity: usize,
}

impl std::fmt::Debug for MemoryNotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNotificationBus")
            .field("channel_capacity", &self.channel_capacity)
            .finish()
    }
}

impl MemoryNotificationBus {
    /// Create a new in-memory notification bus.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create with custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            handlers: RwLock::new(Vec::new()),
            events_published: AtomicU64::new(0),
            events_delivered: AtomicU64::new(0),
            channel_capacity: capacity.max(1),
        }
    }

    /// Register a closure for a topic pattern.
    ///
    /// # Returns
    ///
    /// The handler ID, accepted by [`NotificationBus::unsubscribe`]
    ///
    /// # Example
    ///
    /// ```
    /// use clinic_events::{AccessEvent, MemoryNotificationBus, NotificationBus};
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// let bus = MemoryNotificationBus::new();
    /// let seen = Arc::new(AtomicUsize::new(0));
    /// let counter = seen.clone();
    /// let id = bus.on("roles.*", move |_| {
    ///     counter.fetch_add(1, Ordering::SeqCst);
    /// }).unwrap();
    ///
    /// bus.publish(AccessEvent::RolesChanged.to_event()).unwrap();
    /// bus.unsubscribe(&id).unwrap();
    /// bus.publish(AccessEvent::RolesChanged.to_event()).unwrap();
    ///
    /// assert_eq!(seen.load(Ordering::SeqCst), 1);
    /// ```
    pub fn on<F>(&self, topic: &str, callback: F) -> EventBusResult<String>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register_handler(Arc::new(FnHandler::new(topic, callback)))
    }
}

impl Default for MemoryNotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBus for MemoryNotificationBus {
    fn publish(&self, event: Event) -> EventBusResult<()> {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        let topic = event.topic().to_string();
        let mut delivered = 0u64;

        // Notify matching channel subscribers
        {
            let subscribers = self
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            for subscriber in subscribers.values() {
                if topic_matches(&subscriber.pattern, &topic)
                    && subscriber.sender.send(event.clone()).is_ok()
                {
                    delivered += 1;
                }
            }
        }

        // Snapshot handlers so a handler may publish or unsubscribe re-entrantly
        let matching: Vec<Arc<dyn EventHandler>> = {
            let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
            handlers
                .iter()
                .filter(|h| {
                    h.handler
                        .topics()
                        .iter()
                        .any(|pattern| topic_matches(pattern, &topic))
                })
                .map(|h| h.handler.clone())
                .collect()
        };

        for handler in matching {
            match handler.handle(&event) {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(error = %e, topic = %topic, "Event handler failed"),
            }
        }

        self.events_delivered.fetch_add(delivered, Ordering::Relaxed);

        tracing::debug!(
            topic = %topic,
            event_id = %event.id,
            delivered,
            "Event published"
        );

        Ok(())
    }

    fn subscribe(&self, topic: &str) -> EventBusResult<Subscription> {
        if topic.is_empty() {
            return Err(EventBusError::SubscribeError(
                "topic pattern must not be empty".to_string(),
            ));
        }

        let id = uuid::Uuid::now_v7().to_string();
        let (sender, receiver) = broadcast::channel(self.channel_capacity);

        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id.clone(),
                ChannelSubscriber {
                    pattern: topic.to_string(),
                    sender,
                },
            );

        Ok(Subscription {
            id,
            topic: topic.to_string(),
            receiver,
        })
    }

    fn register_handler(&self, handler: Arc<dyn EventHandler>) -> EventBusResult<String> {
        let id = uuid::Uuid::now_v7().to_string();
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RegisteredHandler {
                id: id.clone(),
                handler,
            });
        Ok(id)
    }

    fn unsubscribe(&self, subscription_id: &str) -> EventBusResult<()> {
        let removed_channel = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(subscription_id)
            .is_some();
        if removed_channel {
            return Ok(());
        }

        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let before = handlers.len();
        handlers.retain(|h| h.id != subscription_id);
        if handlers.len() < before {
            Ok(())
        } else {
            Err(EventBusError::UnknownSubscription(subscription_id.to_string()))
        }
    }

    fn stats(&self) -> EventBusStats {
        EventBusStats {
            events_published: self.events_published.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            active_subscriptions: self
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
            registered_handlers: self
                .handlers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
        }
    }
}

/// Check if a topic matches a pattern.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let pattern_parts: Vec<&str> = pattern.split('.').collect();
    let topic_parts: Vec<&str> = topic.split('.').collect();
    segments_match(&pattern_parts, &topic_parts)
}

fn segments_match(pattern: &[&str], topic: &[&str]) -> bool {
    match (pattern.split_first(), topic.split_first()) {
        (None, None) => true,
        (Some((&"#", rest)), _) => {
            // Zero or more segments
            (0..=topic.len()).any(|skip| segments_match(rest, &topic[skip..]))
        }
        (Some((&"*", rest)), Some((_, topic_rest))) => segments_match(rest, topic_rest),
        (Some((segment, rest)), Some((head, topic_rest))) => {
            segment == head && segments_match(rest, topic_rest)
        }
        _ => false,
    }
}

// ============================================================================
// Tests
// ============================================================================
