//! Read-only attribute views.

use std::sync::Arc;

use crate::container::AttributeContainer;
use crate::key::{AttributeKey, AttributeValue};

/// Read-only view of an attribute container.
///
/// A view without a delegate behaves like an empty container.
#[derive(Clone, Debug, Default)]
pub struct AttributeView {
    delegate: Option<Arc<AttributeContainer>>,
}

impl AttributeView {
    /// Creates a view over `delegate`.
    #[must_use]
    pub fn new(delegate: Option<Arc<AttributeContainer>>) -> Self {
        Self { delegate }
    }

    /// Creates a view that is always empty.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get<T: AttributeValue>(&self, key: &AttributeKey<T>) -> Option<Arc<T>> {
        self.delegate.as_ref()?.get(key)
    }

    /// Returns whether a value is stored under `key`.
    #[must_use]
    pub fn contains<T: AttributeValue>(&self, key: &AttributeKey<T>) -> bool {
        self.delegate.as_ref().is_some_and(|d| d.contains(key))
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.delegate.as_ref().map_or(0, |d| d.len())
    }

    /// Returns whether the view shows no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of all stored values, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.delegate.as_ref().map(|d| d.names()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEED: AttributeKey<f32> = AttributeKey::new("speed");

    #[test]
    fn test_view_tracks_delegate() {
        let bag = Arc::new(AttributeContainer::new());
        let view = bag.view();
        assert!(view.is_empty());

        bag.set(&SPEED, 1.5);
        assert!(view.contains(&SPEED));
        assert_eq!(view.get(&SPEED).as_deref(), Some(&1.5));
        assert_eq!(view.names(), vec!["speed"]);
    }

    #[test]
    fn test_empty_view() {
        let view = AttributeView::empty();
        assert_eq!(view.len(), 0);
        assert!(view.get(&SPEED).is_none());
        assert!(!view.contains(&SPEED));
    }
}
