//! # Transfer Gates
//!
//! Lock ordering for cross-container transfers.
//!
//! ```text
//! A→B transfer:  gate(min(A,B)) → gate(max(A,B)) → lock(A) → lock(B)
//! B→A transfer:  gate(min(A,B)) → gate(max(A,B)) → lock(B) → lock(A)
//! ```
//!
//! Both transfers queue on the same first gate, so neither can hold one
//! container lock while waiting on the other.
//!
//! A gate is closed for good when the entity owning the container dies.
//! Transfers into a container behind a closed gate are refused.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::entity::ContainerId;

/// Per-container gate taken before any transfer touches the container.
#[derive(Debug, Default)]
pub struct TransferGate {
    lock: Mutex<()>,
    closed: AtomicBool,
}

impl TransferGate {
    /// Creates an open gate.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lock: parking_lot::const_mutex(()),
            closed: AtomicBool::new(false),
        }
    }

    /// Takes the gates of both ends of a transfer, lowest id first.
    ///
    /// Taking the same gate twice (a wrapper sharing its core's gate) locks it
    /// once.
    pub fn acquire_pair<'a>(
        source: (&'a TransferGate, ContainerId),
        destination: (&'a TransferGate, ContainerId),
    ) -> TransferGuard<'a> {
        if std::ptr::eq(source.0, destination.0) {
            return TransferGuard {
                _first: source.0.lock.lock(),
                _second: None,
            };
        }

        let (first, second) = if source.1 <= destination.1 {
            (source.0, destination.0)
        } else {
            (destination.0, source.0)
        };
        let first = first.lock.lock();
        let second = second.lock.lock();
        TransferGuard {
            _first: first,
            _second: Some(second),
        }
    }

    /// Closes the gate and returns it held, so no transfer is in flight while
    /// the caller empties the container.
    pub fn close(&self) -> TransferGuard<'_> {
        let guard = self.lock.lock();
        self.closed.store(true, Ordering::Release);
        TransferGuard {
            _first: guard,
            _second: None,
        }
    }

    /// Returns whether the gate has been closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns whether a transfer currently holds this gate.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.lock.is_locked()
    }
}

/// Both gates of an in-progress transfer, released on drop.
#[must_use = "the gates are released as soon as the guard is dropped"]
pub struct TransferGuard<'a> {
    _first: MutexGuard<'a, ()>,
    _second: Option<MutexGuard<'a, ()>>,
}
