//! Identity-deduplicated listener registry.

use std::sync::Arc;

use crate::error::ListenerResult;

/// A set of listeners compared by identity (the pointer, not the value).
///
/// Not synchronized: the owner guards it with its own lock.
pub struct ListenerSet<L: ?Sized> {
    listeners: Vec<Arc<L>>,
}

impl<L: ?Sized> ListenerSet<L> {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Adds a listener. Returns `false` if this exact listener is present.
    pub fn add(&mut self, listener: Arc<L>) -> bool {
        if self.contains(&listener) {
            return false;
        }
        self.listeners.push(listener);
        true
    }

    /// Removes a listener. Returns `false` if it was not present.
    pub fn remove(&mut self, listener: &Arc<L>) -> bool {
        let Some(index) = self.listeners.iter().position(|l| same(l, listener)) else {
            return false;
        };
        self.listeners.swap_remove(index);
        true
    }

    /// Removes every listener.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Returns whether this exact listener is present.
    #[must_use]
    pub fn contains(&self, listener: &Arc<L>) -> bool {
        self.listeners.iter().any(|l| same(l, listener))
    }

    /// Number of listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Copies of the listener handles.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<L>> {
        self.listeners.clone()
    }

    /// Calls `notify` on every listener, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `notify`; later listeners are not
    /// called.
    pub fn fire<F>(&self, mut notify: F) -> ListenerResult
    where
        F: FnMut(&L) -> ListenerResult,
    {
        for listener in &self.listeners {
            notify(&**listener)?;
        }
        Ok(())
    }
}

impl<L: ?Sized> Default for ListenerSet<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> Extend<Arc<L>> for ListenerSet<L> {
    fn extend<I: IntoIterator<Item = Arc<L>>>(&mut self, iter: I) {
        for listener in iter {
            self.add(listener);
        }
    }
}

// Data pointers only; vtable pointers of the same object can differ.
fn same<L: ?Sized>(a: &Arc<L>, b: &Arc<L>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}
