//! # Lifecycle Listeners
//!
//! Observers of entity creation, death, and movement.
//!
//! ## Delivery
//!
//! Events are delivered synchronously, on the thread performing the mutation,
//! after the container's map changed and while its write lock is still held.
//! A listener therefore never sees a second mutation of that container
//! interleaved with its handling.
//!
//! Because the lock is held, a listener must not call back into the container
//! that emitted the event. Hand the event to another thread instead
//! (see [`LifecycleBus`]). `Debug` formatting of a container or entity is the
//! exception: it never waits for the lock.

mod channel;
mod set;

use std::fmt;

use crate::container::ContainerRef;
use crate::entity::EntityRef;
use crate::error::ListenerResult;

pub use channel::{LifecycleBus, LifecycleEvent, LifecycleReceiver, LifecycleSender};
pub use set::ListenerSet;

/// A lifecycle notification.
#[derive(Clone)]
pub struct EntityEvent {
    container: ContainerRef,
    entity: EntityRef,
    destination: Option<ContainerRef>,
}

impl EntityEvent {
    /// Event raised by `container` about `entity`.
    #[must_use]
    pub fn new(container: ContainerRef, entity: EntityRef) -> Self {
        Self {
            container,
            entity,
            destination: None,
        }
    }

    /// Event raised by `container` after `entity` moved to `destination`.
    #[must_use]
    pub fn transferred(container: ContainerRef, entity: EntityRef, destination: ContainerRef) -> Self {
        Self {
            container,
            entity,
            destination: Some(destination),
        }
    }

    /// The container that raised the event, as it reports itself.
    #[must_use]
    pub fn container(&self) -> &ContainerRef {
        &self.container
    }

    /// The entity the event is about.
    #[must_use]
    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    /// Where the entity went, for transfer events.
    #[must_use]
    pub fn destination(&self) -> Option<&ContainerRef> {
        self.destination.as_ref()
    }
}

impl fmt::Debug for EntityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityEvent")
            .field("container", &self.container.container_id())
            .field("entity", &self.entity.id())
            .field(
                "destination",
                &self.destination.as_ref().map(|d| d.container_id()),
            )
            .finish()
    }
}

/// Observer of one container's entity lifecycle.
///
/// Every method defaults to accepting the event. Returning an error does not
/// undo the mutation; the error is handed to the caller of the operation.
pub trait EntityListener: Send + Sync {
    /// An entity was created in the container.
    fn entity_created(&self, _event: &EntityEvent) -> ListenerResult {
        Ok(())
    }

    /// An entity was killed.
    fn entity_killed(&self, _event: &EntityEvent) -> ListenerResult {
        Ok(())
    }

    /// An entity arrived from another tree.
    fn entity_received(&self, _event: &EntityEvent) -> ListenerResult {
        Ok(())
    }

    /// An entity left for [`EntityEvent::destination`].
    fn entity_transferred(&self, _event: &EntityEvent) -> ListenerResult {
        Ok(())
    }
}
