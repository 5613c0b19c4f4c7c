//! # Lifecycle Event Bus
//!
//! A listener that forwards events into a bounded channel, so work triggered
//! by lifecycle changes can run on another thread, outside the container lock.
//!
//! ```text
//! ┌─────────────┐  entity_*()  ┌────────────────┐  drain()  ┌─────────────┐
//! │  Container  │─────────────>│ LifecycleSender│─────────> │  Consumer   │
//! │ (write lock)│              │   (bounded)    │           │ (any thread)│
//! └─────────────┘              └────────────────┘           └─────────────┘
//! ```

use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use uuid::Uuid;

use super::{EntityEvent, EntityListener};
use crate::error::{ListenerError, ListenerResult};

/// A lifecycle event tagged with what happened.
#[derive(Clone, Debug)]
pub enum LifecycleEvent {
    /// See [`EntityListener::entity_created`].
    Created(EntityEvent),
    /// See [`EntityListener::entity_killed`].
    Killed(EntityEvent),
    /// See [`EntityListener::entity_received`].
    Received(EntityEvent),
    /// See [`EntityListener::entity_transferred`].
    Transferred(EntityEvent),
}

impl LifecycleEvent {
    /// The underlying event.
    #[must_use]
    pub fn event(&self) -> &EntityEvent {
        match self {
            Self::Created(e) | Self::Killed(e) | Self::Received(e) | Self::Transferred(e) => e,
        }
    }

    /// Id of the entity the event is about.
    #[must_use]
    pub fn entity_id(&self) -> Uuid {
        self.event().entity().id()
    }
}

/// Bounded channel of lifecycle events.
pub struct LifecycleBus {
    sender: Sender<LifecycleEvent>,
    receiver: Receiver<LifecycleEvent>,
}

impl LifecycleBus {
    /// Creates a bus holding at most `capacity` undelivered events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// A listener feeding this bus, ready to register on a container.
    #[must_use]
    pub fn sender(&self) -> Arc<LifecycleSender> {
        Arc::new(LifecycleSender {
            sender: self.sender.clone(),
        })
    }

    /// A receiving handle (clone for multiple consumers).
    #[must_use]
    pub fn receiver(&self) -> LifecycleReceiver {
        LifecycleReceiver {
            receiver: self.receiver.clone(),
        }
    }

    /// Creates a connected sender and receiver.
    #[must_use]
    pub fn create_pair(capacity: usize) -> (Arc<LifecycleSender>, LifecycleReceiver) {
        let bus = Self::new(capacity);
        (bus.sender(), bus.receiver())
    }
}

/// Listener end of a [`LifecycleBus`].
pub struct LifecycleSender {
    sender: Sender<LifecycleEvent>,
}

impl LifecycleSender {
    fn send(&self, event: LifecycleEvent) -> ListenerResult {
        match self.sender.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => Ok(()),
            Err(TrySendError::Full(event)) => Err(ListenerError::new(format!(
                "lifecycle bus full, dropped event for entity {}",
                event.entity_id()
            ))),
        }
    }
}

impl EntityListener for LifecycleSender {
    fn entity_created(&self, event: &EntityEvent) -> ListenerResult {
        self.send(LifecycleEvent::Created(event.clone()))
    }

    fn entity_killed(&self, event: &EntityEvent) -> ListenerResult {
        self.send(LifecycleEvent::Killed(event.clone()))
    }

    fn entity_received(&self, event: &EntityEvent) -> ListenerResult {
        self.send(LifecycleEvent::Received(event.clone()))
    }

    fn entity_transferred(&self, event: &EntityEvent) -> ListenerResult {
        self.send(LifecycleEvent::Transferred(event.clone()))
    }
}

/// Consumer end of a [`LifecycleBus`].
#[derive(Clone)]
pub struct LifecycleReceiver {
    receiver: Receiver<LifecycleEvent>,
}

impl LifecycleReceiver {
    /// Takes every pending event without blocking.
    #[must_use]
    pub fn drain(&self) -> Vec<LifecycleEvent> {
        self.receiver.try_iter().collect()
    }

    /// Takes one pending event without blocking.
    #[must_use]
    pub fn try_recv(&self) -> Option<LifecycleEvent> {
        self.receiver.try_recv().ok()
    }

    /// Number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns whether any event is pending.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}
