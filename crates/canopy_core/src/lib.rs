//! # Canopy Core
//!
//! Thread-safe entity lifecycle registry for hierarchical simulation graphs.
//!
//! - Entities are created, killed, and moved between containers
//! - Every entity is itself a container, so entities form trees
//! - Listeners observe every lifecycle change
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────┐  new / kill / move  ┌──────────────────────┐
//! │ DefaultEntityContainer │ ──────────────────> │ DefaultEntityFactory │
//! │    (RwLock<map>)       │ <────────────────── │  (one per tree,      │
//! └───────────┬────────────┘  EntityRef / bool   │   owner bookkeeping) │
//!             │ events                           └──────────────────────┘
//!             v
//!   EntityListener / LifecycleBus
//! ```
//!
//! Moves inside a tree are bookkeeping updates. Moves between trees export the
//! entity and its descendants from its factory and import them into the
//! destination's.
//!
//! ## Example
//!
//! ```rust,ignore
//! use canopy_core::{DefaultEntityContainer, DefaultEntityFactory, EntityContainerExt};
//!
//! let world = DefaultEntityContainer::new(DefaultEntityFactory::unbounded());
//! let herd = world.new_random_entity()?;
//! let sheep = herd.new_random_entity()?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod container;
pub mod entity;
pub mod error;
pub mod factory;
pub mod listener;

pub use config::TreeConfig;
pub use container::{
    ContainerBuilder, ContainerRef, DefaultEntityContainer, EntityContainer, EntityContainerExt,
    EntitySnapshot, TransferGate,
};
pub use entity::{
    ContainerId, Entity, EntityRef, EntityType, EntityTypeId, Lifecycle, TypedEntity,
};
pub use error::{ContainerError, ContainerResult, ErrorKind, ListenerError, ListenerResult};
pub use factory::{DefaultEntityFactory, EntityFactory};
pub use listener::{EntityEvent, EntityListener, LifecycleBus, LifecycleEvent, LifecycleReceiver};
