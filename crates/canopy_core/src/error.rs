//! # Registry Error Types
//!
//! All errors that can occur while creating, killing, or moving entities.
//!
//! Benign refusals (killing an unknown id, receiving a duplicate) are not
//! errors: those operations return `Ok(false)`.

use thiserror::Error;
use uuid::Uuid;

use crate::entity::ContainerId;

/// Coarse classification of a [`ContainerError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required argument was unusable. Nothing changed.
    InvalidArgument,
    /// The request conflicts with current state. Nothing changed.
    Conflict,
    /// A broken invariant: an irreversible step happened and could not be
    /// completed.
    ProtocolViolation,
    /// A lifecycle listener failed after the mutation committed.
    Listener,
    /// The tree refused to grow past its configured limit.
    Capacity,
    /// Configuration could not be loaded.
    Configuration,
}

/// Errors that can occur in an entity container.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// The nil UUID cannot identify an entity.
    #[error("entity id must not be nil")]
    NilId,

    /// An entity with this id already exists.
    #[error("entity {0} is already associated")]
    AlreadyAssociated(Uuid),

    /// Transfer destination is the source container.
    #[error("cannot transfer {entity} to the same container {container}")]
    SameContainer {
        /// Entity being transferred.
        entity: Uuid,
        /// Container that is both source and destination.
        container: ContainerId,
    },

    /// An entity was asked to move into its own child container.
    #[error("cannot transfer {0} to itself")]
    SelfTransfer(Uuid),

    /// A created entity does not carry the requested marker type.
    #[error("entity {id} is not marked as {expected}")]
    TypeMismatch {
        /// Entity that was checked.
        id: Uuid,
        /// Name of the expected marker type.
        expected: &'static str,
    },

    /// The entity left its tree but the destination refused it. The entity
    /// now belongs to no container.
    #[error("entity {0} exported but not transferred")]
    ExportedNotTransferred(Uuid),

    /// The container belongs to a dead entity and takes no new entities.
    #[error("container {0} belongs to a dead entity")]
    Closed(ContainerId),

    /// The tree holds as many entities as it is allowed to.
    #[error("entity limit of {0} has been reached")]
    EntityLimitReached(usize),

    /// The container reporting this container's identity no longer exists.
    #[error("delegate of container {0} has been dropped")]
    DelegateDropped(ContainerId),

    /// The factory behind a container no longer exists.
    #[error("entity factory has been dropped")]
    FactoryDropped,

    /// A lifecycle listener failed.
    #[error(transparent)]
    Listener(#[from] ListenerError),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ContainerError {
    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NilId | Self::DelegateDropped(_) | Self::FactoryDropped => {
                ErrorKind::InvalidArgument
            }
            Self::AlreadyAssociated(_)
            | Self::SameContainer { .. }
            | Self::SelfTransfer(_)
            | Self::TypeMismatch { .. }
            | Self::Closed(_) => ErrorKind::Conflict,
            Self::ExportedNotTransferred(_) => ErrorKind::ProtocolViolation,
            Self::EntityLimitReached(_) => ErrorKind::Capacity,
            Self::Listener(_) => ErrorKind::Listener,
            Self::InvalidConfig(_) => ErrorKind::Configuration,
        }
    }

    /// Returns whether this error reports a broken invariant.
    #[must_use]
    pub fn is_protocol_violation(&self) -> bool {
        self.kind() == ErrorKind::ProtocolViolation
    }
}

/// Failure raised by a lifecycle listener.
#[derive(Error, Debug)]
#[error("listener failed: {message}")]
pub struct ListenerError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ListenerError {
    /// Creates a listener error with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a listener error wrapping an underlying cause.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Result type for listener callbacks.
pub type ListenerResult = Result<(), ListenerError>;
