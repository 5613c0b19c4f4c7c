//! Default factory: one instance per tree.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use super::EntityFactory;
use crate::config::TreeConfig;
use crate::container::EntityContainer;
use crate::entity::{ContainerId, Entity, EntityRef, Lifecycle};
use crate::error::{ContainerError, ContainerResult};

/// Factory tracking every live entity of one tree.
///
/// Bookkeeping is a map from entity id to the id of the container that owns
/// it, guarded by the factory's own lock. Tree roots are found by following
/// owner links until a container that is not a tracked entity.
pub struct DefaultEntityFactory {
    this: Weak<DefaultEntityFactory>,
    config: TreeConfig,
    owners: RwLock<HashMap<Uuid, ContainerId>>,
}

impl DefaultEntityFactory {
    /// Creates a factory for a tree with the given settings.
    #[must_use]
    pub fn new(config: TreeConfig) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            owners: RwLock::new(HashMap::with_capacity(config.initial_capacity)),
            config,
        })
    }

    /// Creates a factory for a tree with no entity limit.
    #[must_use]
    pub fn unbounded() -> Arc<Self> {
        Self::new(TreeConfig::unbounded())
    }

    /// Settings of this tree.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Number of live entities in the tree.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.owners.read().len()
    }

    /// Id of the container owning a live entity of this tree.
    #[must_use]
    pub fn owner_of(&self, id: Uuid) -> Option<ContainerId> {
        self.owners.read().get(&id).copied()
    }

    /// Root of the tree `container` belongs to.
    #[must_use]
    pub fn root_of(&self, container: &dyn EntityContainer) -> ContainerId {
        root_of(&self.owners.read(), container.container_id())
    }

    /// The limit, if admitting `incoming` more entities would exceed it.
    fn over_limit(&self, owners: &HashMap<Uuid, ContainerId>, incoming: usize) -> Option<usize> {
        self.config
            .entity_limit
            .filter(|&limit| owners.len() + incoming > limit)
    }
}

/// Every entity below `entity`, paired with the id of the container holding
/// it, parents before children.
///
/// Reads one child container at a time; callers must not hold the factory
/// lock, since those containers may be waiting on it.
fn descendants(entity: &Entity) -> Vec<(EntityRef, ContainerId)> {
    let mut found: Vec<(EntityRef, ContainerId)> = entity
        .entities()
        .into_iter()
        .map(|child| (child, entity.container_id()))
        .collect();

    let mut next = 0;
    while next < found.len() {
        let parent = Arc::clone(&found[next].0);
        let holder = parent.container_id();
        found.extend(parent.entities().into_iter().map(|child| (child, holder)));
        next += 1;
    }
    found
}

fn root_of(owners: &HashMap<Uuid, ContainerId>, mut id: ContainerId) -> ContainerId {
    // Owner links form a forest; the bound only guards corrupt input.
    for _ in 0..=owners.len() {
        match owners.get(&id.as_uuid()) {
            Some(&owner) => id = owner,
            None => break,
        }
    }
    id
}

/// Returns whether `ancestor` is `id` or on its chain of owners.
fn is_within(
    owners: &HashMap<Uuid, ContainerId>,
    mut id: ContainerId,
    ancestor: ContainerId,
) -> bool {
    for _ in 0..=owners.len() {
        if id == ancestor {
            return true;
        }
        match owners.get(&id.as_uuid()) {
            Some(&owner) => id = owner,
            None => return false,
        }
    }
    false
}

impl EntityFactory for DefaultEntityFactory {
    fn new_entity(&self, id: Uuid, owner: &dyn EntityContainer) -> ContainerResult<EntityRef> {
        let this: Arc<dyn EntityFactory> =
            self.this.upgrade().ok_or(ContainerError::FactoryDropped)?;

        let mut owners = self.owners.write();
        if let Some(limit) = self.over_limit(&owners, 1) {
            warn!(entity = %id, limit, "entity limit reached");
            return Err(ContainerError::EntityLimitReached(limit));
        }
        if owners.contains_key(&id) {
            return Err(ContainerError::AlreadyAssociated(id));
        }

        let entity = Entity::new(id, this, self.config.initial_capacity);
        owners.insert(id, owner.container_id());
        Ok(entity)
    }

    fn try_kill_entity(&self, entity: &Entity) -> bool {
        let id = entity.id();
        let mut owners = self.owners.write();
        if !owners.contains_key(&id) || !entity.transition(Lifecycle::Alive, Lifecycle::Dead) {
            return false;
        }

        owners.remove(&id);
        trace!(entity = %id, "entity forgotten by tree");
        true
    }

    fn within_same_tree(&self, one: &dyn EntityContainer, two: &dyn EntityContainer) -> bool {
        let owners = self.owners.read();
        root_of(&owners, one.container_id()) == root_of(&owners, two.container_id())
    }

    fn try_take_from_tree(&self, entity: &Entity, owner: &dyn EntityContainer) -> bool {
        let id = entity.id();
        let target = owner.container_id();

        let mut owners = self.owners.write();
        let Some(&current) = owners.get(&id) else {
            return false;
        };
        if !entity.is_alive() || root_of(&owners, current) != root_of(&owners, target) {
            return false;
        }
        if is_within(&owners, target, ContainerId::of_entity(id)) {
            return false;
        }

        owners.insert(id, target);
        true
    }

    fn try_import_entity(&self, entity: &Entity, owner: &dyn EntityContainer) -> bool {
        let id = entity.id();
        let target = owner.container_id();
        if entity.lifecycle() != Lifecycle::Exported {
            return false;
        }
        let Some(this) = self.this.upgrade() else {
            return false;
        };
        let below = descendants(entity);
        if below.iter().any(|(child, _)| child.container_id() == target) {
            return false;
        }

        {
            let mut owners = self.owners.write();
            if let Some(limit) = self.over_limit(&owners, below.len() + 1) {
                warn!(entity = %id, limit, descendants = below.len(), "entity limit reached, import refused");
                return false;
            }
            let taken = owners.contains_key(&id)
                || below.iter().any(|(child, _)| owners.contains_key(&child.id()));
            if taken || is_within(&owners, target, ContainerId::of_entity(id)) {
                return false;
            }
            if !entity.transition(Lifecycle::Exported, Lifecycle::Alive) {
                return false;
            }

            owners.insert(id, target);
            owners.extend(below.iter().map(|(child, holder)| (child.id(), *holder)));
        }

        // Rebinding takes each container's lock, so the factory lock is released.
        let this: Arc<dyn EntityFactory> = this;
        entity.children().rebind_factory(Arc::clone(&this));
        for (child, _) in &below {
            child.children().rebind_factory(Arc::clone(&this));
        }

        debug!(entity = %id, owner = %target, descendants = below.len(), "entity imported");
        true
    }

    fn export_entity(&self, entity: &Entity) {
        let id = entity.id();
        let below = descendants(entity);

        let mut owners = self.owners.write();
        owners.remove(&id);
        for (child, holder) in &below {
            if owners.get(&child.id()) == Some(holder) {
                owners.remove(&child.id());
            }
        }
        if entity.transition(Lifecycle::Alive, Lifecycle::Exported) {
            debug!(entity = %id, descendants = below.len(), "entity exported");
        }
    }
}

impl fmt::Debug for DefaultEntityFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultEntityFactory")
            .field("config", &self.config)
            .field("entities", &self.entity_count())
            .finish()
    }
}
