//! Optimistic bookmark toggling with compensating rollback.
//!
//! A toggle flips the item in the feed immediately and records a pending
//! entry `{token, previous}` in a [`BookmarkLog`] keyed by item id. When the
//! backend call settles the entry is removed:
//!
//! - success: nothing else to do;
//! - failure, entry is the newest pending toggle for the item: the item is
//!   set back to the entry's `previous` value;
//! - failure, a newer toggle is pending: the newer toggle inherits this
//!   entry's `previous`, so whichever toggle settles last restores the last
//!   value the backend actually confirmed.
//!
//! Rollbacks touch only the toggled item and are a no-op if the item has
//! left the feed in the meantime.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::backend::Backend;
use crate::error::{CoreError, CoreResult};
use crate::feed::FeedLoader;
use crate::models::ContentId;
use crate::sync::{read, write};

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingToggle {
    token: u64,
    previous: bool,
}

/// In-flight bookmark toggles, oldest first per item.
#[derive(Debug, Default)]
pub struct BookmarkLog {
    next_token: u64,
    pending: HashMap<ContentId, Vec<PendingToggle>>,
}

impl BookmarkLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a toggle whose local value replaced `previous`.
    pub fn begin(&mut self, item_id: ContentId, previous: bool) -> u64 {
        self.next_token += 1;
        let token = self.next_token;
        self.pending
            .entry(item_id)
            .or_default()
            .push(PendingToggle { token, previous });
        token
    }

    /// The backend confirmed the toggle.
    pub fn confirm(&mut self, item_id: ContentId, token: u64) {
        self.take(item_id, token);
    }

    /// The backend rejected the toggle.
    ///
    /// Returns the value the item should be reverted to, or `None` when a
    /// newer toggle is still pending and has taken over the rollback.
    pub fn fail(&mut self, item_id: ContentId, token: u64) -> Option<bool> {
        let (index, entry) = self.take(item_id, token)?;
        match self.pending.get_mut(&item_id).and_then(|q| q.get_mut(index)) {
            Some(successor) => {
                successor.previous = entry.previous;
                None
            }
            None => Some(entry.previous),
        }
    }

    pub fn pending(&self, item_id: ContentId) -> usize {
        self.pending.get(&item_id).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn take(&mut self, item_id: ContentId, token: u64) -> Option<(usize, PendingToggle)> {
        let queue = self.pending.get_mut(&item_id)?;
        let index = queue.iter().position(|p| p.token == token)?;
        let entry = queue.remove(index);
        if queue.is_empty() {
            self.pending.remove(&item_id);
        }
        Some((index, entry))
    }
}

#[derive(Default)]
pub struct MutationController {
    log: RwLock<BookmarkLog>,
}

impl MutationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unsettled toggles for an item.
    pub fn pending(&self, item_id: ContentId) -> usize {
        read(&self.log).pending(item_id)
    }

    /// Flip an item's bookmark locally, then confirm with the backend.
    ///
    /// Returns the new local value on success. On failure the item is rolled
    /// back per [`BookmarkLog::fail`], the feed error is set, and the
    /// backend's message is returned.
    pub async fn toggle_bookmark(
        &self,
        backend: &dyn Backend,
        feed: &FeedLoader,
        item_id: ContentId,
    ) -> CoreResult<bool> {
        let (token, desired) = {
            let mut log = write(&self.log);
            let current = feed
                .item(item_id)
                .map(|item| item.is_bookmarked)
                .ok_or_else(|| CoreError::not_found("content item", item_id))?;
            let desired = !current;
            feed.set_bookmarked(item_id, desired);
            (log.begin(item_id, current), desired)
        };
        debug!(item_id, token, desired, "bookmark toggled locally");

        let result = if desired {
            backend.create_bookmark(item_id).await
        } else {
            backend.delete_bookmark(item_id).await
        };

        let mut log = write(&self.log);
        match result {
            Ok(()) => {
                log.confirm(item_id, token);
                Ok(desired)
            }
            Err(err) => {
                let message = err.to_string();
                match log.fail(item_id, token) {
                    Some(previous) => {
                        if feed.set_bookmarked(item_id, previous).is_none() {
                            debug!(item_id, "rolled-back item no longer in feed");
                        }
                    }
                    None => debug!(item_id, token, "rollback handed to newer toggle"),
                }
                warn!(item_id, error = %message, "bookmark toggle failed");
                feed.set_error(message.clone());
                Err(CoreError::Backend(message))
            }
        }
    }
}
