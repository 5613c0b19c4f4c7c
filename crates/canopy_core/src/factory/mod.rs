//! # Entity Factories
//!
//! A factory mints entities for the containers it backs and decides whether
//! entities may be killed, moved within the tree, or handed to another tree.
//!
//! ## Trees
//!
//! ```text
//!   container ──owns──> entity A ──owns──> entity B
//!       │                  │
//!       └── root           └── child container of A (same factory)
//! ```
//!
//! Everything reachable through owner links shares a root. Moves between two
//! owners with the same root stay inside the tree; any other move is an
//! export followed by an import, and the moved entity's descendants change
//! tree with it.

mod default;

use uuid::Uuid;

use crate::container::EntityContainer;
use crate::entity::{Entity, EntityRef};
use crate::error::ContainerResult;

pub use default::DefaultEntityFactory;

/// Creates entities and arbitrates their moves.
///
/// Containers call the factory while holding their own write lock, so
/// implementations must not call back into the container they are given.
pub trait EntityFactory: Send + Sync {
    /// Creates an entity owned by `owner`.
    ///
    /// # Errors
    ///
    /// Fails if `id` is already live in the tree or the tree is full.
    fn new_entity(&self, id: Uuid, owner: &dyn EntityContainer) -> ContainerResult<EntityRef>;

    /// Marks an entity dead and forgets it. Returns `false` if the entity is
    /// not live in this tree.
    ///
    /// The killing container takes the entity's descendants down afterwards,
    /// once its own lock is released.
    fn try_kill_entity(&self, entity: &Entity) -> bool;

    /// Returns whether two containers belong to the same tree.
    fn within_same_tree(&self, one: &dyn EntityContainer, two: &dyn EntityContainer) -> bool;

    /// Moves an entity to `owner` inside the tree. Returns `false` if the
    /// move would leave the tree or place the entity under itself.
    fn try_take_from_tree(&self, entity: &Entity, owner: &dyn EntityContainer) -> bool;

    /// Adopts an exported entity and its descendants into this tree under
    /// `owner`, rebinding the containers below the entity to this factory.
    fn try_import_entity(&self, entity: &Entity, owner: &dyn EntityContainer) -> bool;

    /// Releases an entity and its descendants from this tree ahead of an
    /// import elsewhere.
    fn export_entity(&self, entity: &Entity);
}
