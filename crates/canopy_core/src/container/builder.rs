//! Builder for pre-populated containers.

use std::sync::Arc;

use canopy_attributes::AttributeContainer;
use uuid::Uuid;

use super::{DefaultEntityContainer, EntityContainer};
use crate::config::TreeConfig;
use crate::entity::{EntityType, EntityTypeId};
use crate::error::ContainerResult;
use crate::factory::{DefaultEntityFactory, EntityFactory};
use crate::listener::EntityListener;

struct EntityStub {
    id: Uuid,
    entity_type: Option<EntityTypeId>,
    attributes: AttributeContainer,
}

/// Builder for a [`DefaultEntityContainer`] with listeners and initial
/// entities.
///
/// Listeners are attached before the entities are created, so they observe
/// every creation.
///
/// ```rust,ignore
/// let container = ContainerBuilder::new()
///     .with_listener(bus.sender())
///     .with_entity(id)
///     .build()?;
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    factory: Option<Arc<dyn EntityFactory>>,
    config: TreeConfig,
    listeners: Vec<Arc<dyn EntityListener>>,
    stubs: Vec<EntityStub>,
}

impl ContainerBuilder {
    /// Creates an empty builder backed by a fresh unbounded tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an existing factory instead of starting a new tree.
    #[must_use]
    pub fn with_factory(mut self, factory: Arc<dyn EntityFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Settings for the new tree. Ignored when a factory is supplied.
    #[must_use]
    pub fn with_config(mut self, config: TreeConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches a listener.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn EntityListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Adds an entity with no attributes.
    #[must_use]
    pub fn with_entity(self, id: Uuid) -> Self {
        self.with_entity_attributes(id, AttributeContainer::new())
    }

    /// Adds an entity seeded with `attributes`.
    #[must_use]
    pub fn with_entity_attributes(mut self, id: Uuid, attributes: AttributeContainer) -> Self {
        self.stubs.push(EntityStub {
            id,
            entity_type: None,
            attributes,
        });
        self
    }

    /// Adds an entity marked as `T`.
    #[must_use]
    pub fn with_typed_entity<T: EntityType>(
        mut self,
        id: Uuid,
        attributes: AttributeContainer,
    ) -> Self {
        self.stubs.push(EntityStub {
            id,
            entity_type: Some(EntityTypeId::of::<T>()),
            attributes,
        });
        self
    }

    /// Creates the container and its entities.
    ///
    /// # Errors
    ///
    /// The first failure creating an entity; entities created before it stay.
    pub fn build(self) -> ContainerResult<Arc<DefaultEntityContainer>> {
        let capacity = self.config.initial_capacity.max(self.stubs.len());
        let factory: Arc<dyn EntityFactory> = match self.factory {
            Some(factory) => factory,
            None => DefaultEntityFactory::new(self.config),
        };

        let container = DefaultEntityContainer::with_capacity(factory, capacity);
        for listener in self.listeners {
            container.add_entity_listener(listener);
        }
        for stub in self.stubs {
            let created = match stub.entity_type {
                Some(entity_type) => {
                    container.new_entity_of_type(stub.id, entity_type, &stub.attributes)
                }
                None => container.new_entity(stub.id, &stub.attributes),
            };
            created?;
        }
        Ok(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::EntityContainerExt;
    use crate::error::ContainerError;
    use crate::listener::{LifecycleBus, LifecycleEvent};
    use canopy_attributes::AttributeKey;

    const NAME: AttributeKey<String> = AttributeKey::new("name");

    struct Tree;
    impl EntityType for Tree {}

    #[test]
    fn test_build_creates_stubs_after_listeners() {
        let (sender, receiver) = LifecycleBus::create_pair(8);
        let attributes = AttributeContainer::new();
        attributes.set(&NAME, "oak".to_string());

        let container = ContainerBuilder::new()
            .with_listener(sender)
            .with_entity(Uuid::from_u128(1))
            .with_typed_entity::<Tree>(Uuid::from_u128(2), attributes)
            .build()
            .unwrap();

        assert_eq!(container.entity_count(), 2);
        let tree = container.entity_as::<Tree>(Uuid::from_u128(2)).unwrap();
        assert_eq!(tree.attributes().get(&NAME).as_deref().map(String::as_str), Some("oak"));

        let events = receiver.drain();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(e, LifecycleEvent::Created(_))));
    }

    #[test]
    fn test_build_fails_on_duplicate_stub() {
        let err = ContainerBuilder::new()
            .with_entity(Uuid::from_u128(1))
            .with_entity(Uuid::from_u128(1))
            .build()
            .unwrap_err();
        assert!(matches!(err, ContainerError::AlreadyAssociated(_)));
    }

    #[test]
    fn test_shared_factory_joins_existing_tree() {
        let factory = DefaultEntityFactory::unbounded();
        let first = ContainerBuilder::new()
            .with_factory(factory.clone())
            .with_entity(Uuid::from_u128(5))
            .build()
            .unwrap();
        let second = ContainerBuilder::new()
            .with_factory(factory.clone())
            .build()
            .unwrap();

        assert!(first.has_entity(Uuid::from_u128(5)));
        assert_eq!(second.entity_count(), 0);
        assert_eq!(factory.entity_count(), 1);
    }
}
