//! # Entities
//!
//! An entity is an addressable unit with:
//! - A stable 128-bit id
//! - A set of marker types
//! - A property bag
//! - A child container, which is what makes the graph a tree
//!
//! Which container holds an entity is not stored on the entity. The owning
//! container's map and the factory's bookkeeping are the only records of it.

mod id;
mod typed;

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use canopy_attributes::{AttributeContainer, AttributeView};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::container::{
    ContainerRef, DefaultEntityContainer, EntityContainer, EntitySnapshot, TransferGate,
};
use crate::error::ContainerResult;
use crate::factory::EntityFactory;
use crate::listener::EntityListener;

pub use id::{ContainerId, EntityType, EntityTypeId};
pub use typed::TypedEntity;

/// Shared handle to an entity.
pub type EntityRef = Arc<Entity>;

/// Where an entity is in its life.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Lifecycle {
    /// Owned by a container and tracked by its tree.
    Alive = 0,
    /// Released by its tree, waiting to be imported by another.
    Exported = 1,
    /// Killed. Terminal.
    Dead = 2,
}

impl Lifecycle {
    #[inline]
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Alive,
            1 => Self::Exported,
            _ => Self::Dead,
        }
    }
}

/// An entity in the tree.
///
/// Entities are minted by an [`EntityFactory`] and always handled through
/// [`EntityRef`]. Every entity is itself an [`EntityContainer`]: its children
/// live in a [`DefaultEntityContainer`] that reports the entity as its
/// identity.
pub struct Entity {
    id: Uuid,
    lifecycle: AtomicU8,
    types: RwLock<HashSet<EntityTypeId>>,
    attributes: Arc<AttributeContainer>,
    children: DefaultEntityContainer,
}

impl Entity {
    /// Creates a live entity whose children are managed by `factory`.
    ///
    /// Intended for [`EntityFactory`] implementations.
    #[must_use]
    pub fn new(id: Uuid, factory: Arc<dyn EntityFactory>, capacity: usize) -> EntityRef {
        Arc::new_cyclic(|this: &Weak<Entity>| {
            let delegate: Weak<dyn EntityContainer> = this.clone();
            Self {
                id,
                lifecycle: AtomicU8::new(Lifecycle::Alive as u8),
                types: RwLock::new(HashSet::new()),
                attributes: Arc::new(AttributeContainer::new()),
                children: DefaultEntityContainer::with_delegate(
                    factory,
                    delegate,
                    ContainerId::of_entity(id),
                    capacity,
                ),
            }
        })
    }

    /// The entity's id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.lifecycle.load(Ordering::Acquire))
    }

    /// Returns whether the entity is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.lifecycle() == Lifecycle::Alive
    }

    /// Moves the lifecycle from `from` to `to` if it is currently `from`.
    ///
    /// Returns `false` if another state was observed. Factories use this to
    /// make kill, export and import race-free.
    pub fn transition(&self, from: Lifecycle, to: Lifecycle) -> bool {
        self.lifecycle
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// The entity's property bag.
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &AttributeContainer {
        &self.attributes
    }

    /// Read-only view of the property bag.
    #[must_use]
    pub fn attribute_view(&self) -> AttributeView {
        self.attributes.view()
    }

    /// The container holding this entity's children.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &DefaultEntityContainer {
        &self.children
    }

    /// Records a marker type. Returns `false` if it was already recorded.
    pub fn mark_as_type(&self, entity_type: EntityTypeId) -> bool {
        self.types.write().insert(entity_type)
    }

    /// Removes a marker type. Returns `false` if it was not recorded.
    pub fn unmark_as_type(&self, entity_type: EntityTypeId) -> bool {
        self.types.write().remove(&entity_type)
    }

    /// Returns whether a marker type is recorded.
    #[must_use]
    pub fn is_marked_as(&self, entity_type: EntityTypeId) -> bool {
        self.types.read().contains(&entity_type)
    }

    /// Returns whether marker `T` is recorded.
    #[must_use]
    pub fn is<T: EntityType>(&self) -> bool {
        self.is_marked_as(EntityTypeId::of::<T>())
    }

    /// All recorded marker types.
    #[must_use]
    pub fn marked_types(&self) -> Vec<EntityTypeId> {
        self.types.read().iter().copied().collect()
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Entity {}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: Vec<_> = self.types.read().iter().map(|t| t.name()).collect();
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("lifecycle", &self.lifecycle())
            .field("types", &types)
            .field("children", &self.children)
            .finish()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity [{}]", self.id)
    }
}

// Children are reached through the entity itself.
impl EntityContainer for Entity {
    fn container_id(&self) -> ContainerId {
        self.children.container_id()
    }

    fn transfer_gate(&self) -> &TransferGate {
        self.children.transfer_gate()
    }

    fn entity(&self, id: Uuid) -> Option<EntityRef> {
        self.children.entity(id)
    }

    fn entity_count(&self) -> usize {
        self.children.entity_count()
    }

    fn entity_ids(&self) -> HashSet<Uuid> {
        self.children.entity_ids()
    }

    fn entities(&self) -> EntitySnapshot {
        self.children.entities()
    }

    fn entity_listeners(&self) -> Vec<Arc<dyn EntityListener>> {
        self.children.entity_listeners()
    }

    fn add_entity_listener(&self, listener: Arc<dyn EntityListener>) -> bool {
        self.children.add_entity_listener(listener)
    }

    fn remove_entity_listener(&self, listener: &Arc<dyn EntityListener>) -> bool {
        self.children.remove_entity_listener(listener)
    }

    fn remove_entity_listeners(&self) {
        self.children.remove_entity_listeners();
    }

    fn new_entity(&self, id: Uuid, attributes: &AttributeContainer) -> ContainerResult<EntityRef> {
        self.children.new_entity(id, attributes)
    }

    fn new_entity_of_type(
        &self,
        id: Uuid,
        entity_type: EntityTypeId,
        attributes: &AttributeContainer,
    ) -> ContainerResult<EntityRef> {
        self.children.new_entity_of_type(id, entity_type, attributes)
    }

    fn kill_entity(&self, id: Uuid) -> ContainerResult<bool> {
        self.children.kill_entity(id)
    }

    fn kill_entities(&self) -> ContainerResult<()> {
        self.children.kill_entities()
    }

    fn transfer_entity(&self, id: Uuid, destination: &ContainerRef) -> ContainerResult<bool> {
        self.children.transfer_entity(id, destination)
    }

    fn receive_entity(&self, entity: &EntityRef) -> ContainerResult<bool> {
        self.children.receive_entity(entity)
    }
}
