//! # Entity Containers
//!
//! A container owns the id → entity map of one node of the tree.
//!
//! ## Operations
//!
//! | Operation          | Lock  | Outcome on benign refusal |
//! |--------------------|-------|---------------------------|
//! | `entity`, counts   | read  | -                         |
//! | `new_entity`       | write | error (already associated)|
//! | `kill_entity`      | write | `Ok(false)`               |
//! | `transfer_entity`  | write | `Ok(false)`               |
//! | `receive_entity`   | write | `Ok(false)`               |
//!
//! ## Lock ordering
//!
//! `transfer_entity` holds the source's write lock while it calls
//! `receive_entity` on the destination, which takes the destination's write
//! lock. Both containers' [`TransferGate`]s are taken first, in
//! [`ContainerId`] order, so two transfers in opposite directions between the
//! same pair serialize instead of deadlocking. A receipt from another tree
//! also rebinds the containers below the moved entity, one lock at a time.
//!
//! Kills hold one container lock at a time. The killed entity's descendants
//! are killed after that lock is released, so a kill cannot deadlock against
//! a transfer in either direction.
//!
//! Callers must not restructure the subtree of an entity while that entity is
//! moving between trees: entities created below it during the move can stay
//! in the old tree's bookkeeping.

mod builder;
mod default;
mod gate;

use std::collections::HashSet;
use std::sync::Arc;

use canopy_attributes::AttributeContainer;
use uuid::Uuid;

use crate::entity::{ContainerId, EntityRef, EntityType, EntityTypeId, TypedEntity};
use crate::error::ContainerResult;
use crate::listener::EntityListener;

pub use builder::ContainerBuilder;
pub use default::DefaultEntityContainer;
pub use gate::{TransferGate, TransferGuard};

/// Shared handle to any container.
pub type ContainerRef = Arc<dyn EntityContainer>;

/// A registry of entities.
///
/// All operations are safe to call concurrently from any thread.
pub trait EntityContainer: Send + Sync {
    /// The identity this container reports in events and to its factory.
    fn container_id(&self) -> ContainerId;

    /// Gate ordering cross-container transfers. Wrappers return the gate of
    /// the container they wrap.
    fn transfer_gate(&self) -> &TransferGate;

    /// Looks up an entity.
    fn entity(&self, id: Uuid) -> Option<EntityRef>;

    /// Number of entities held.
    fn entity_count(&self) -> usize;

    /// Copy of the ids currently held.
    fn entity_ids(&self) -> HashSet<Uuid>;

    /// Copy of the entities currently held.
    fn entities(&self) -> EntitySnapshot;

    /// Copy of the registered listeners.
    fn entity_listeners(&self) -> Vec<Arc<dyn EntityListener>>;

    /// Registers a listener. Returns `false` if it is already registered.
    fn add_entity_listener(&self, listener: Arc<dyn EntityListener>) -> bool;

    /// Unregisters a listener. Returns `false` if it was not registered.
    fn remove_entity_listener(&self, listener: &Arc<dyn EntityListener>) -> bool;

    /// Unregisters every listener.
    fn remove_entity_listeners(&self);

    /// Creates an entity seeded with copies of `attributes`.
    ///
    /// # Errors
    ///
    /// Fails if `id` is nil or already held, if the factory refuses, or if a
    /// listener fails after the entity was created.
    fn new_entity(&self, id: Uuid, attributes: &AttributeContainer) -> ContainerResult<EntityRef>;

    /// Creates an entity marked with `entity_type`.
    ///
    /// # Errors
    ///
    /// As [`EntityContainer::new_entity`], plus a type mismatch if the entity
    /// does not carry the marker after creation.
    fn new_entity_of_type(
        &self,
        id: Uuid,
        entity_type: EntityTypeId,
        attributes: &AttributeContainer,
    ) -> ContainerResult<EntityRef>;

    /// Kills an entity and then its descendants. Unknown ids and refused
    /// kills return `Ok(false)`.
    ///
    /// Descendants are killed once this container's lock is released. One
    /// moved out of the subtree before the cascade reaches it survives in its
    /// new container.
    ///
    /// # Errors
    ///
    /// Only listener failures, after the kill committed.
    fn kill_entity(&self, id: Uuid) -> ContainerResult<bool>;

    /// Kills every entity held. Entities the factory refuses to kill stay.
    ///
    /// # Errors
    ///
    /// The first listener failure, after every kill was attempted.
    fn kill_entities(&self) -> ContainerResult<()>;

    /// Moves an entity to `destination`. Unknown ids and refused receipts
    /// return `Ok(false)`.
    ///
    /// A move into another tree takes the entity's descendants along, and the
    /// destination's `entity_received` fires before this container's
    /// `entity_transferred`.
    ///
    /// # Errors
    ///
    /// Fails on transfers to the same container or into the entity itself,
    /// with [`ContainerError::ExportedNotTransferred`] if the entity left its
    /// tree but the destination refused it, and on listener failures.
    ///
    /// [`ContainerError::ExportedNotTransferred`]: crate::ContainerError::ExportedNotTransferred
    fn transfer_entity(&self, id: Uuid, destination: &ContainerRef) -> ContainerResult<bool>;

    /// Takes ownership of an entity leaving another container. Duplicates and
    /// entities the factory will not hand over return `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Fails if the entity is this container's own identity, and on listener
    /// failures after receipt.
    fn receive_entity(&self, entity: &EntityRef) -> ContainerResult<bool>;
}

/// Conveniences available on every container.
pub trait EntityContainerExt: EntityContainer {
    /// Returns whether an entity is held.
    fn has_entity(&self, id: Uuid) -> bool {
        self.entity(id).is_some()
    }

    /// Creates an entity with no attributes.
    ///
    /// # Errors
    ///
    /// See [`EntityContainer::new_entity`].
    fn new_empty_entity(&self, id: Uuid) -> ContainerResult<EntityRef> {
        self.new_entity(id, &AttributeContainer::new())
    }

    /// Creates an entity with a random id and no attributes.
    ///
    /// # Errors
    ///
    /// See [`EntityContainer::new_entity`].
    fn new_random_entity(&self) -> ContainerResult<EntityRef> {
        self.new_empty_entity(Uuid::new_v4())
    }

    /// Creates an entity marked as `T`.
    ///
    /// # Errors
    ///
    /// See [`EntityContainer::new_entity_of_type`].
    fn new_entity_as<T: EntityType>(
        &self,
        id: Uuid,
        attributes: &AttributeContainer,
    ) -> ContainerResult<TypedEntity<T>> {
        let entity = self.new_entity_of_type(id, EntityTypeId::of::<T>(), attributes)?;
        TypedEntity::new(entity)
    }

    /// Looks up an entity carrying marker `T`.
    fn entity_as<T: EntityType>(&self, id: Uuid) -> Option<TypedEntity<T>> {
        self.entity(id).and_then(|e| TypedEntity::new(e).ok())
    }

    /// All held entities carrying marker `T`.
    fn entities_of_type<T: EntityType>(&self) -> Vec<TypedEntity<T>> {
        self.entities()
            .into_iter()
            .filter_map(|e| TypedEntity::new(e).ok())
            .collect()
    }

    /// Moves every held entity to `destination`, returning how many moved.
    ///
    /// # Errors
    ///
    /// Stops at the first failing transfer.
    fn transfer_entities(&self, destination: &ContainerRef) -> ContainerResult<usize> {
        let mut moved = 0;
        for id in self.entity_ids() {
            if self.transfer_entity(id, destination)? {
                moved += 1;
            }
        }
        Ok(moved)
    }
}

impl<C: EntityContainer + ?Sized> EntityContainerExt for C {}

/// Point-in-time copy of a container's entities.
///
/// Iterating does not hold any lock and can be repeated.
#[derive(Clone, Debug, Default)]
pub struct EntitySnapshot {
    entities: Vec<EntityRef>,
}

impl EntitySnapshot {
    pub(crate) fn new(entities: Vec<EntityRef>) -> Self {
        Self { entities }
    }

    /// Iterates the snapshot.
    pub fn iter(&self) -> std::slice::Iter<'_, EntityRef> {
        self.entities.iter()
    }

    /// Number of entities in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl IntoIterator for EntitySnapshot {
    type Item = EntityRef;
    type IntoIter = std::vec::IntoIter<EntityRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

impl<'a> IntoIterator for &'a EntitySnapshot {
    type Item = &'a EntityRef;
    type IntoIter = std::slice::Iter<'a, EntityRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}
