//! # Default Entity Container
//!
//! Thread-safe [`EntityContainer`] backed by a `HashMap` behind one
//! `parking_lot::RwLock`.
//!
//! ## Identity
//!
//! A container may report another object as its identity (its *delegate*):
//! an entity's child container reports the entity. The delegate is what
//! listeners see in events and what the factory is told owns the entities.
//! A standalone container is its own delegate.
//!
//! ## Critical sections
//!
//! Every mutation holds the write lock from the first lookup until the last
//! listener returned, factory calls included. Killing the descendants of a
//! killed entity is the one step that runs after the lock is released, so a
//! kill never holds two container locks at once.
//!
//! The child container of a dead entity is closed: it refuses new entities
//! and receipts from then on.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};

use canopy_attributes::AttributeContainer;
use parking_lot::RwLock;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use super::gate::TransferGate;
use super::{ContainerRef, EntityContainer, EntitySnapshot};
use crate::entity::{ContainerId, EntityRef, EntityTypeId};
use crate::error::{ContainerError, ContainerResult};
use crate::factory::EntityFactory;
use crate::listener::{EntityEvent, EntityListener, ListenerSet};

struct ContainerState {
    factory: Arc<dyn EntityFactory>,
    entities: HashMap<Uuid, EntityRef>,
    listeners: ListenerSet<dyn EntityListener>,
}

/// The default entity container.
pub struct DefaultEntityContainer {
    /// Identity of the delegate, fixed at construction.
    id: ContainerId,
    delegate: Weak<dyn EntityContainer>,
    state: RwLock<ContainerState>,
    gate: TransferGate,
}

impl DefaultEntityContainer {
    /// Creates a standalone container that reports itself in events.
    #[must_use]
    pub fn new(factory: Arc<dyn EntityFactory>) -> Arc<Self> {
        Self::with_capacity(factory, 0)
    }

    /// Creates a standalone container with room for `capacity` entities.
    #[must_use]
    pub fn with_capacity(factory: Arc<dyn EntityFactory>, capacity: usize) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let delegate: Weak<dyn EntityContainer> = this.clone();
            Self::with_delegate(factory, delegate, ContainerId::random(), capacity)
        })
    }

    /// Creates a container that reports `delegate` in events and factory
    /// calls.
    ///
    /// `delegate_id` must be the id `delegate` reports. The delegate usually
    /// owns this container, hence the weak reference.
    #[must_use]
    pub fn with_delegate(
        factory: Arc<dyn EntityFactory>,
        delegate: Weak<dyn EntityContainer>,
        delegate_id: ContainerId,
        capacity: usize,
    ) -> Self {
        Self {
            id: delegate_id,
            delegate,
            state: RwLock::new(ContainerState {
                factory,
                entities: HashMap::with_capacity(capacity),
                listeners: ListenerSet::new(),
            }),
            gate: TransferGate::new(),
        }
    }

    /// The factory currently creating and destroying this container's
    /// entities.
    #[must_use]
    pub fn factory(&self) -> Arc<dyn EntityFactory> {
        Arc::clone(&self.state.read().factory)
    }

    /// Hands this container over to another factory.
    ///
    /// Factories call this on the containers below an entity they import, so
    /// the moved subtree is managed by the tree it joined.
    pub fn rebind_factory(&self, factory: Arc<dyn EntityFactory>) {
        self.state.write().factory = factory;
    }

    /// The container reported as this container's identity.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::DelegateDropped`] once the delegate is gone.
    pub fn delegate(&self) -> ContainerResult<ContainerRef> {
        self.delegate
            .upgrade()
            .ok_or(ContainerError::DelegateDropped(self.id))
    }

    fn create(
        &self,
        id: Uuid,
        entity_type: Option<EntityTypeId>,
        attributes: &AttributeContainer,
    ) -> ContainerResult<EntityRef> {
        if id.is_nil() {
            return Err(ContainerError::NilId);
        }
        let delegate = self.delegate()?;

        let mut state = self.state.write();
        if self.gate.is_closed() {
            return Err(ContainerError::Closed(self.id));
        }
        if state.entities.contains_key(&id) {
            return Err(ContainerError::AlreadyAssociated(id));
        }

        let entity = state.factory.new_entity(id, delegate.as_ref())?;
        state.entities.insert(id, Arc::clone(&entity));

        if let Some(entity_type) = entity_type {
            entity.mark_as_type(entity_type);
        }
        entity.attributes().add_all(attributes);

        trace!(container = %self.id, entity = %id, "entity created");
        let event = EntityEvent::new(delegate, Arc::clone(&entity));
        state.listeners.fire(|l| l.entity_created(&event))?;

        Ok(entity)
    }

    /// Kills one entity under the write lock. The entity is pushed to
    /// `killed` so its descendants can be killed once the lock is released.
    fn kill_locked(
        &self,
        state: &mut ContainerState,
        id: Uuid,
        killed: &mut Vec<EntityRef>,
    ) -> ContainerResult<bool> {
        let Some(entity) = state.entities.get(&id).cloned() else {
            return Ok(false);
        };
        if !state.factory.try_kill_entity(&entity) {
            return Ok(false);
        }

        state.entities.remove(&id);
        killed.push(Arc::clone(&entity));
        trace!(container = %self.id, entity = %id, "entity killed");

        let event = EntityEvent::new(self.delegate()?, entity);
        state.listeners.fire(|l| l.entity_killed(&event))?;
        Ok(true)
    }

    /// Kills every held entity under one write lock. Returns the killed
    /// entities and the first listener failure.
    fn kill_all(&self) -> (Vec<EntityRef>, ContainerResult<()>) {
        let mut killed = Vec::new();
        let mut first_failure = None;

        let mut state = self.state.write();
        let ids: Vec<Uuid> = state.entities.keys().copied().collect();
        for id in ids {
            // A failed notification still means the kill committed.
            if let Err(err) = self.kill_locked(&mut state, id, &mut killed) {
                first_failure.get_or_insert(err);
            }
        }
        debug!(
            container = %self.id,
            killed = killed.len(),
            remaining = state.entities.len(),
            "bulk kill"
        );

        (killed, first_failure.map_or(Ok(()), Err))
    }

    /// Empties the child container of a dead entity and closes it to new
    /// entities. The gate is held while emptying, so no transfer into the
    /// container can slip in between.
    fn shut_down(&self) -> ContainerResult<()> {
        let (killed, outcome) = {
            let _gate = self.gate.close();
            self.kill_all()
        };
        kill_descendants(killed);
        outcome
    }
}

/// Shuts down the child containers of entities that were just killed.
/// Called with no container lock or gate held.
fn kill_descendants(killed: Vec<EntityRef>) {
    for entity in killed {
        if let Err(err) = entity.children().shut_down() {
            warn!(entity = %entity.id(), %err, "listener failed while killing descendants");
        }
    }
}

impl EntityContainer for DefaultEntityContainer {
    fn container_id(&self) -> ContainerId {
        self.id
    }

    fn transfer_gate(&self) -> &TransferGate {
        &self.gate
    }

    fn entity(&self, id: Uuid) -> Option<EntityRef> {
        self.state.read().entities.get(&id).cloned()
    }

    fn entity_count(&self) -> usize {
        self.state.read().entities.len()
    }

    fn entity_ids(&self) -> HashSet<Uuid> {
        self.state.read().entities.keys().copied().collect()
    }

    fn entities(&self) -> EntitySnapshot {
        EntitySnapshot::new(self.state.read().entities.values().cloned().collect())
    }

    fn entity_listeners(&self) -> Vec<Arc<dyn EntityListener>> {
        self.state.read().listeners.snapshot()
    }

    fn add_entity_listener(&self, listener: Arc<dyn EntityListener>) -> bool {
        self.state.write().listeners.add(listener)
    }

    fn remove_entity_listener(&self, listener: &Arc<dyn EntityListener>) -> bool {
        self.state.write().listeners.remove(listener)
    }

    fn remove_entity_listeners(&self) {
        self.state.write().listeners.clear();
    }

    fn new_entity(&self, id: Uuid, attributes: &AttributeContainer) -> ContainerResult<EntityRef> {
        self.create(id, None, attributes)
    }

    fn new_entity_of_type(
        &self,
        id: Uuid,
        entity_type: EntityTypeId,
        attributes: &AttributeContainer,
    ) -> ContainerResult<EntityRef> {
        let entity = self.create(id, Some(entity_type), attributes)?;
        if !entity.is_marked_as(entity_type) {
            return Err(ContainerError::TypeMismatch {
                id,
                expected: entity_type.name(),
            });
        }
        Ok(entity)
    }

    fn kill_entity(&self, id: Uuid) -> ContainerResult<bool> {
        let mut killed = Vec::with_capacity(1);
        let outcome = {
            let mut state = self.state.write();
            self.kill_locked(&mut state, id, &mut killed)
        };
        kill_descendants(killed);
        outcome
    }

    fn kill_entities(&self) -> ContainerResult<()> {
        let (killed, outcome) = self.kill_all();
        kill_descendants(killed);
        outcome
    }

    fn transfer_entity(&self, id: Uuid, destination: &ContainerRef) -> ContainerResult<bool> {
        let destination_id = destination.container_id();
        if destination_id == self.id {
            return Err(ContainerError::SameContainer {
                entity: id,
                container: self.id,
            });
        }

        let _gates = TransferGate::acquire_pair(
            (&self.gate, self.id),
            (destination.transfer_gate(), destination_id),
        );
        if destination.transfer_gate().is_closed() {
            return Ok(false);
        }
        let mut state = self.state.write();

        let Some(entity) = state.entities.get(&id).cloned() else {
            return Ok(false);
        };
        if ContainerId::of_entity(entity.id()) == destination_id {
            return Err(ContainerError::SelfTransfer(id));
        }

        let delegate = self.delegate()?;
        let exported = !state
            .factory
            .within_same_tree(delegate.as_ref(), destination.as_ref());
        if exported {
            debug!(entity = %id, from = %self.id, to = %destination_id, "exporting entity");
            state.factory.export_entity(&entity);
        }

        // A listener failure on the destination arrives after the receipt
        // committed, so the move still has to complete here.
        let (received, destination_failure) = match destination.receive_entity(&entity) {
            Ok(received) => (received, None),
            Err(err @ ContainerError::Listener(_)) => (true, Some(err)),
            Err(err) if !exported => return Err(err),
            Err(err) => {
                error!(entity = %id, from = %self.id, to = %destination_id, %err, "export without receipt");
                return Err(ContainerError::ExportedNotTransferred(id));
            }
        };

        if !received {
            if exported {
                error!(entity = %id, from = %self.id, to = %destination_id, "export without receipt");
                return Err(ContainerError::ExportedNotTransferred(id));
            }
            return Ok(false);
        }

        state.entities.remove(&id);
        debug!(entity = %id, from = %self.id, to = %destination_id, exported, "entity transferred");

        let event = EntityEvent::transferred(delegate, entity, Arc::clone(destination));
        let notified = state.listeners.fire(|l| l.entity_transferred(&event));
        if let Some(err) = destination_failure {
            return Err(err);
        }
        notified?;
        Ok(true)
    }

    fn receive_entity(&self, entity: &EntityRef) -> ContainerResult<bool> {
        let id = entity.id();
        if ContainerId::of_entity(id) == self.id {
            return Err(ContainerError::SelfTransfer(id));
        }
        let delegate = self.delegate()?;

        let mut state = self.state.write();
        if self.gate.is_closed() || state.entities.contains_key(&id) {
            return Ok(false);
        }

        let imported = if state.factory.try_take_from_tree(entity, delegate.as_ref()) {
            false
        } else if state.factory.try_import_entity(entity, delegate.as_ref()) {
            true
        } else {
            return Ok(false);
        };

        state.entities.insert(id, Arc::clone(entity));
        trace!(container = %self.id, entity = %id, imported, "entity received");

        // Same-tree moves are reported once, by the source's transfer event.
        if imported {
            let event = EntityEvent::new(delegate, Arc::clone(entity));
            state.listeners.fire(|l| l.entity_received(&event))?;
        }
        Ok(true)
    }
}

impl fmt::Debug for DefaultEntityContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("DefaultEntityContainer");
        out.field("id", &self.id);
        // Listeners run under the write lock and may format their container.
        match self.state.try_read() {
            Some(state) => out
                .field("entities", &state.entities.len())
                .field("listeners", &state.listeners.len())
                .finish(),
            None => out.finish_non_exhaustive(),
        }
    }
}

impl fmt::Display for DefaultEntityContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<Uuid> = self.entity_ids().into_iter().collect();
        ids.sort_unstable();
        write!(f, "DefaultEntityContainer [")?;
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{id}")?;
        }
        write!(f, "]")
    }
}
