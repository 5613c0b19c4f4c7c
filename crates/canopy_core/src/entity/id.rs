//! # Identities
//!
//! Entities are identified by 128-bit UUIDs. Containers carry a
//! [`ContainerId`] of the same width; an entity's own child container uses the
//! entity's id, which is how "moving an entity into itself" is detected.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

use uuid::Uuid;

/// Identity reported by a container.
///
/// Totally ordered, so cross-container operations can lock in a fixed order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ContainerId(Uuid);

impl ContainerId {
    /// A fresh random identity for a standalone container.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// The identity of an entity's child container.
    #[inline]
    #[must_use]
    pub const fn of_entity(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for ContainerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Marker types that can be recorded on an entity.
///
/// ```rust,ignore
/// struct Sheep;
/// impl EntityType for Sheep {}
/// ```
pub trait EntityType: 'static {}

/// Runtime handle for an [`EntityType`].
#[derive(Clone, Copy, Debug)]
pub struct EntityTypeId {
    type_id: TypeId,
    name: &'static str,
}

impl EntityTypeId {
    /// Handle for marker type `T`.
    #[must_use]
    pub fn of<T: EntityType>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Full type name of the marker.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }
}

impl PartialEq for EntityTypeId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for EntityTypeId {}

impl Hash for EntityTypeId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}
