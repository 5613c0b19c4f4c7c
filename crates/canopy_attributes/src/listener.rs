//! Attribute change notifications.

/// What happened to an attribute slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeChange {
    /// A value was stored in an empty slot.
    Added,
    /// A stored value was replaced.
    Changed,
    /// A stored value was removed.
    Removed,
}

/// Notification delivered to [`AttributeListener`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeEvent {
    /// Attribute name.
    pub name: &'static str,
    /// Name of the value type stored in the slot.
    pub type_name: &'static str,
    /// Kind of change.
    pub change: AttributeChange,
}

/// Observer of a single attribute container.
///
/// All methods default to doing nothing.
pub trait AttributeListener: Send + Sync {
    /// Called after a value is stored in an empty slot.
    fn attribute_added(&self, _event: &AttributeEvent) {}

    /// Called after a stored value is replaced.
    fn attribute_changed(&self, _event: &AttributeEvent) {}

    /// Called after a stored value is removed.
    fn attribute_removed(&self, _event: &AttributeEvent) {}
}

pub(crate) fn dispatch(listener: &dyn AttributeListener, event: &AttributeEvent) {
    match event.change {
        AttributeChange::Added => listener.attribute_added(event),
        AttributeChange::Changed => listener.attribute_changed(event),
        AttributeChange::Removed => listener.attribute_removed(event),
    }
}
