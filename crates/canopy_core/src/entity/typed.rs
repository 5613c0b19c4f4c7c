//! Type-checked entity handles.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;

use super::{Entity, EntityRef, EntityType, EntityTypeId};
use crate::error::{ContainerError, ContainerResult};

/// An entity known to carry marker type `T`.
pub struct TypedEntity<T: EntityType> {
    entity: EntityRef,
    _marker: PhantomData<fn() -> T>,
}

impl<T: EntityType> TypedEntity<T> {
    /// Checks that `entity` carries marker `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::TypeMismatch`] if the marker is missing.
    pub fn new(entity: EntityRef) -> ContainerResult<Self> {
        let expected = EntityTypeId::of::<T>();
        if !entity.is_marked_as(expected) {
            return Err(ContainerError::TypeMismatch {
                id: entity.id(),
                expected: expected.name(),
            });
        }
        Ok(Self {
            entity,
            _marker: PhantomData,
        })
    }

    /// The shared entity handle.
    #[must_use]
    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    /// Drops the type information.
    #[must_use]
    pub fn into_inner(self) -> EntityRef {
        self.entity
    }
}

impl<T: EntityType> TryFrom<EntityRef> for TypedEntity<T> {
    type Error = ContainerError;

    fn try_from(entity: EntityRef) -> ContainerResult<Self> {
        Self::new(entity)
    }
}

impl<T: EntityType> Deref for TypedEntity<T> {
    type Target = Entity;

    fn deref(&self) -> &Entity {
        &self.entity
    }
}

impl<T: EntityType> Clone for TypedEntity<T> {
    fn clone(&self) -> Self {
        Self {
            entity: EntityRef::clone(&self.entity),
            _marker: PhantomData,
        }
    }
}

impl<T: EntityType> fmt::Debug for TypedEntity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedEntity")
            .field("type", &std::any::type_name::<T>())
            .field("entity", &self.entity)
            .finish()
    }
}
