//! Lock helpers and request generations shared by the stores.
//!
//! State is kept behind `std::sync::RwLock`. A poisoned lock still holds
//! consistent data here (every write is a single assignment or `Vec` edit),
//! so poisoning is ignored rather than propagated.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

/// Monotonic request counter.
///
/// Every request takes a ticket with [`issue`](Generation::issue); when the
/// response arrives it is applied only if [`is_current`](Generation::is_current)
/// still holds, i.e. no newer request was issued in the meantime.
#[derive(Debug, Default)]
pub struct Generation(AtomicU64);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.current() == ticket
    }
}
