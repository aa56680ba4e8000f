//! Subscriber notification for store changes.
//!
//! Frontends register a [`StoreObserver`] with the
//! [`Dashboard`](crate::dashboard::Dashboard) and re-read whatever state
//! they render when an event arrives. Events carry no payload beyond what
//! is needed to decide whether to re-render.

use std::sync::{Arc, RwLock};

use crate::models::{AuthStatus, Selection};
use crate::sync::{read, write};

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    AuthChanged(AuthStatus),
    GroupsChanged,
    SelectionChanged(Selection),
    TopicsChanged,
    FeedChanged,
}

pub trait StoreObserver: Send + Sync {
    fn on_event(&self, event: &StoreEvent);
}

/// Registered observers, notified in registration order.
#[derive(Default)]
pub struct Observers {
    list: RwLock<Vec<Arc<dyn StoreObserver>>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn StoreObserver>) {
        write(&self.list).push(observer);
    }

    pub fn notify(&self, event: StoreEvent) {
        // Snapshot first so an observer may subscribe from its callback.
        let observers: Vec<_> = read(&self.list).iter().cloned().collect();
        for observer in observers {
            observer.on_event(&event);
        }
    }
}

/// Observer that records every event; useful in tests and debugging.
#[derive(Default)]
pub struct RecordingObserver {
    events: RwLock<Vec<StoreEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StoreEvent> {
        read(&self.events).clone()
    }

    pub fn clear(&self) {
        write(&self.events).clear();
    }
}

impl StoreObserver for RecordingObserver {
    fn on_event(&self, event: &StoreEvent) {
        write(&self.events).push(event.clone());
    }
}
