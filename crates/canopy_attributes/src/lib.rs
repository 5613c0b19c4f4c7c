//! # Canopy Attributes
//!
//! Typed property bags attached to canopy entities.
//!
//! ## Design
//!
//! - Values are addressed by an [`AttributeKey`]: a name plus a value type
//! - One reader/writer lock per bag
//! - Change notifications fire after the lock is released, so listeners may
//!   read the bag they observe
//!
//! ## Example
//!
//! ```rust,ignore
//! use canopy_attributes::{AttributeContainer, AttributeKey};
//!
//! const HEALTH: AttributeKey<u32> = AttributeKey::new("health");
//!
//! let bag = AttributeContainer::new();
//! bag.set(&HEALTH, 100);
//! assert_eq!(bag.get(&HEALTH).as_deref(), Some(&100));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

mod container;
mod key;
mod listener;
mod view;

pub use container::AttributeContainer;
pub use key::{AttributeKey, AttributeValue};
pub use listener::{AttributeChange, AttributeEvent, AttributeListener};
pub use view::AttributeView;
