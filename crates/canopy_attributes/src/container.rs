//! # Attribute Container
//!
//! Thread-safe bag of typed values.
//!
//! ## Locking
//!
//! One `RwLock` guards both the values and the listeners. Mutations snapshot
//! the listeners, release the lock, and only then notify.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::key::{AttributeKey, AttributeValue, Slot};
use crate::listener::{dispatch, AttributeChange, AttributeEvent, AttributeListener};
use crate::view::AttributeView;

type StoredValue = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct AttributeState {
    values: HashMap<Slot, StoredValue>,
    listeners: Vec<Arc<dyn AttributeListener>>,
}

/// Typed property bag.
///
/// Values are stored behind `Arc`, so reads hand out shared handles instead of
/// borrowing through the lock.
#[derive(Default)]
pub struct AttributeContainer {
    state: RwLock<AttributeState>,
}

impl AttributeContainer {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, returning the value it replaced.
    pub fn set<T: AttributeValue>(&self, key: &AttributeKey<T>, value: T) -> Option<Arc<T>> {
        let slot = key.slot();
        let (previous, listeners) = {
            let mut state = self.state.write();
            let previous = state.values.insert(slot, Arc::new(value));
            (previous, state.listeners.clone())
        };

        let change = if previous.is_some() {
            AttributeChange::Changed
        } else {
            AttributeChange::Added
        };
        notify(&listeners, slot, change);

        previous.and_then(|value| value.downcast::<T>().ok())
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get<T: AttributeValue>(&self, key: &AttributeKey<T>) -> Option<Arc<T>> {
        let value = self.state.read().values.get(&key.slot()).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Returns whether a value is stored under `key`.
    #[must_use]
    pub fn contains<T: AttributeValue>(&self, key: &AttributeKey<T>) -> bool {
        self.state.read().values.contains_key(&key.slot())
    }

    /// Removes and returns the value stored under `key`.
    pub fn remove<T: AttributeValue>(&self, key: &AttributeKey<T>) -> Option<Arc<T>> {
        let slot = key.slot();
        let (removed, listeners) = {
            let mut state = self.state.write();
            let removed = state.values.remove(&slot)?;
            (removed, state.listeners.clone())
        };

        notify(&listeners, slot, AttributeChange::Removed);
        removed.downcast::<T>().ok()
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().values.len()
    }

    /// Returns whether the container holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().values.is_empty()
    }

    /// Names of all stored values, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.state.read().values.keys().map(|slot| slot.name).collect();
        names.sort_unstable();
        names
    }

    /// Copies every value of `source` into this container.
    ///
    /// Each copied value fires this container's own added/changed
    /// notification. Returns the number of values copied.
    pub fn add_all(&self, source: &AttributeContainer) -> usize {
        if std::ptr::eq(self, source) {
            return 0;
        }

        let copied: Vec<(Slot, StoredValue)> = source
            .state
            .read()
            .values
            .iter()
            .map(|(slot, value)| (*slot, Arc::clone(value)))
            .collect();
        if copied.is_empty() {
            return 0;
        }

        let mut changes = Vec::with_capacity(copied.len());
        let listeners = {
            let mut state = self.state.write();
            for (slot, value) in &copied {
                let change = if state.values.insert(*slot, Arc::clone(value)).is_some() {
                    AttributeChange::Changed
                } else {
                    AttributeChange::Added
                };
                changes.push((*slot, change));
            }
            state.listeners.clone()
        };

        for (slot, change) in changes {
            notify(&listeners, slot, change);
        }
        copied.len()
    }

    /// Registers a listener. Returns `false` if this exact listener is already
    /// registered.
    pub fn add_listener(&self, listener: Arc<dyn AttributeListener>) -> bool {
        let mut state = self.state.write();
        if state.listeners.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        state.listeners.push(listener);
        true
    }

    /// Unregisters a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, listener: &Arc<dyn AttributeListener>) -> bool {
        let mut state = self.state.write();
        let before = state.listeners.len();
        state.listeners.retain(|l| !same_listener(l, listener));
        state.listeners.len() != before
    }

    /// Unregisters every listener.
    pub fn clear_listeners(&self) {
        self.state.write().listeners.clear();
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.state.read().listeners.len()
    }

    /// Read-only view backed by this container.
    #[must_use]
    pub fn view(self: &Arc<Self>) -> AttributeView {
        AttributeView::new(Some(Arc::clone(self)))
    }
}

impl fmt::Debug for AttributeContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeContainer")
            .field("names", &self.names())
            .finish_non_exhaustive()
    }
}

fn same_listener(a: &Arc<dyn AttributeListener>, b: &Arc<dyn AttributeListener>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}

fn notify(listeners: &[Arc<dyn AttributeListener>], slot: Slot, change: AttributeChange) {
    if listeners.is_empty() {
        return;
    }
    let event = AttributeEvent {
        name: slot.name,
        type_name: slot.type_name,
        change,
    };
    for listener in listeners {
        dispatch(listener.as_ref(), &event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    const HEALTH: AttributeKey<u32> = AttributeKey::new("health");
    const NAME: AttributeKey<String> = AttributeKey::new("name");

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<AttributeEvent>>,
    }

    impl AttributeListener for Recorder {
        fn attribute_added(&self, event: &AttributeEvent) {
            self.events.lock().push(*event);
        }

        fn attribute_changed(&self, event: &AttributeEvent) {
            self.events.lock().push(*event);
        }

        fn attribute_removed(&self, event: &AttributeEvent) {
            self.events.lock().push(*event);
        }
    }

    #[test]
    fn test_set_get_remove() {
        let bag = AttributeContainer::new();
        assert!(bag.set(&HEALTH, 10).is_none());
        assert_eq!(bag.get(&HEALTH).as_deref(), Some(&10));

        let previous = bag.set(&HEALTH, 20).unwrap();
        assert_eq!(*previous, 10);
        assert_eq!(bag.len(), 1);

        assert_eq!(bag.remove(&HEALTH).as_deref(), Some(&20));
        assert!(bag.is_empty());
        assert!(bag.remove(&HEALTH).is_none());
    }

    #[test]
    fn test_listener_sees_each_change() {
        let bag = AttributeContainer::new();
        let recorder = Arc::new(Recorder::default());
        assert!(bag.add_listener(recorder.clone()));
        assert!(!bag.add_listener(recorder.clone()));

        bag.set(&HEALTH, 1);
        bag.set(&HEALTH, 2);
        bag.remove(&HEALTH);

        let changes: Vec<_> = recorder.events.lock().iter().map(|e| e.change).collect();
        assert_eq!(
            changes,
            vec![
                AttributeChange::Added,
                AttributeChange::Changed,
                AttributeChange::Removed
            ]
        );

        let as_dyn: Arc<dyn AttributeListener> = recorder;
        assert!(bag.remove_listener(&as_dyn));
        assert_eq!(bag.listener_count(), 0);
    }

    #[test]
    fn test_add_all_copies_and_notifies() {
        let source = AttributeContainer::new();
        source.set(&HEALTH, 5);
        source.set(&NAME, "scout".to_string());

        let target = AttributeContainer::new();
        target.set(&HEALTH, 1);
        let recorder = Arc::new(Recorder::default());
        target.add_listener(recorder.clone());

        assert_eq!(target.add_all(&source), 2);
        assert_eq!(target.get(&HEALTH).as_deref(), Some(&5));
        assert_eq!(target.get(&NAME).as_deref().map(String::as_str), Some("scout"));
        assert_eq!(target.names(), vec!["health", "name"]);
        assert_eq!(recorder.events.lock().len(), 2);

        // Source is untouched.
        assert_eq!(source.get(&HEALTH).as_deref(), Some(&5));
    }

    #[test]
    fn test_add_all_into_itself_is_noop() {
        let bag = AttributeContainer::new();
        bag.set(&HEALTH, 3);
        assert_eq!(bag.add_all(&bag), 0);
        assert_eq!(bag.len(), 1);
    }
}
