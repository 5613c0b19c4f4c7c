//! # Attribute Keys
//!
//! A key is a name paired with a value type. `AttributeKey::<u32>::new("speed")`
//! and `AttributeKey::<f64>::new("speed")` address different slots.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

/// Values that can be stored in an attribute container.
pub trait AttributeValue: Any + Send + Sync {}

impl<T: Any + Send + Sync> AttributeValue for T {}

/// Typed, named handle to an attribute slot.
pub struct AttributeKey<T> {
    name: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<T: AttributeValue> AttributeKey<T> {
    /// Creates a key for the named slot holding `T`.
    #[inline]
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _value: PhantomData,
        }
    }

    /// Returns the attribute name.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn slot(&self) -> Slot {
        Slot {
            name: self.name,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl<T> Clone for AttributeKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AttributeKey<T> {}

impl<T> fmt::Debug for AttributeKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeKey")
            .field("name", &self.name)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

/// Storage address of a value: name and type together.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Slot {
    pub(crate) name: &'static str,
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.type_id == other.type_id
    }
}

impl Eq for Slot {}

impl std::hash::Hash for Slot {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.type_id.hash(state);
    }
}
