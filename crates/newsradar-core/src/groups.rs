//! Group store: the topic group cache and the selection triple.
//!
//! The store keeps `selection.group_id` valid under three kinds of change:
//! group list reloads, authentication flips, and explicit user selection.
//! Validity is decided by [`resolve_group_selection`], a pure function of
//! `(groups, auth, previous)`; [`GroupState::repair`] applies it.
//!
//! # Repair rules
//!
//! | Auth status | Candidates | Result |
//! |-------------|------------|--------|
//! | `Unknown` | n/a | previous selection, unchanged |
//! | `Anonymous` | public groups | previous if a candidate, else first candidate, else none |
//! | `Authenticated` | all groups | previous if present, else first group, else none |
//!
//! Dependent selections (topic, content item, editor target) are cleared
//! whenever the group selection changes.

use std::sync::RwLock;

use tracing::debug;

use crate::backend::Backend;
use crate::error::{CoreError, CoreResult};
use crate::models::{
    AuthStatus, ContentId, EditingTarget, GroupDraft, GroupId, GroupPatch, Selection, TopicGroup,
    TopicId,
};
use crate::sync::{read, write, Generation};

/// Fallback title when no group is selected and a user is signed in.
pub const AUTHENTICATED_FALLBACK_NAME: &str = "Topics";
/// Fallback title when no group is selected for anonymous browsing.
pub const ANONYMOUS_FALLBACK_NAME: &str = "Public topics";

/// Groups a caller with the given auth status may select, in server order.
pub fn group_candidates(
    groups: &[TopicGroup],
    auth: AuthStatus,
) -> impl Iterator<Item = &TopicGroup> {
    groups
        .iter()
        .filter(move |g| auth.is_authenticated() || g.is_public())
}

/// Compute the group selection that should hold after a change.
///
/// Idempotent, and never yields an id missing from `groups` unless the auth
/// status is still unknown (in which case `previous` is returned as-is).
pub fn resolve_group_selection(
    groups: &[TopicGroup],
    auth: AuthStatus,
    previous: Option<&str>,
) -> Option<GroupId> {
    if auth == AuthStatus::Unknown {
        return previous.map(str::to_string);
    }
    let mut candidates = group_candidates(groups, auth);
    let first = candidates.next()?;
    if let Some(prev) = previous {
        if first.id == prev || candidates.any(|g| g.id == prev) {
            return Some(prev.to_string());
        }
    }
    Some(first.id.clone())
}

/// Display title for the current group selection.
pub fn selected_group_name(
    groups: &[TopicGroup],
    group_id: Option<&str>,
    auth: AuthStatus,
) -> String {
    group_id
        .and_then(|id| groups.iter().find(|g| g.id == id))
        .map(|g| g.name.clone())
        .unwrap_or_else(|| {
            if auth.is_authenticated() {
                AUTHENTICATED_FALLBACK_NAME.to_string()
            } else {
                ANONYMOUS_FALLBACK_NAME.to_string()
            }
        })
}

/// Group cache plus the selection it governs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupState {
    pub groups: Vec<TopicGroup>,
    pub selection: Selection,
}

impl GroupState {
    /// Re-validate the group selection. Returns `true` if it changed.
    pub fn repair(&mut self, auth: AuthStatus) -> bool {
        let next = resolve_group_selection(&self.groups, auth, self.selection.group_id.as_deref());
        self.set_group(next)
    }

    /// Replace the group list and repair the selection against it.
    pub fn apply_groups(&mut self, groups: Vec<TopicGroup>, auth: AuthStatus) -> bool {
        self.groups = groups;
        if let EditingTarget::Group(id) = &self.selection.editing {
            if !self.groups.iter().any(|g| &g.id == id) {
                self.selection.editing = EditingTarget::None;
            }
        }
        self.repair(auth)
    }

    /// Set the group selection, clearing dependents when it changes.
    pub fn set_group(&mut self, group_id: Option<GroupId>) -> bool {
        if self.selection.group_id == group_id {
            return false;
        }
        self.selection.group_id = group_id;
        self.selection.topic_id = None;
        self.selection.item_id = None;
        match &self.selection.editing {
            EditingTarget::Topic(_) => self.selection.editing = EditingTarget::None,
            EditingTarget::Group(id) if Some(id) != self.selection.group_id.as_ref() => {
                self.selection.editing = EditingTarget::None
            }
            _ => {}
        }
        true
    }

    pub fn set_topic(&mut self, topic_id: Option<TopicId>) -> bool {
        if self.selection.topic_id == topic_id {
            return false;
        }
        self.selection.topic_id = topic_id;
        self.selection.item_id = None;
        true
    }

    /// Drop the topic selection if it no longer refers to a visible topic.
    pub fn reconcile_topic(&mut self, visible: &[TopicId]) -> bool {
        match &self.selection.topic_id {
            Some(id) if !visible.contains(id) => self.set_topic(None),
            _ => false,
        }
    }

    /// Drop the item selection if the item left the feed.
    pub fn reconcile_item(&mut self, present: &[ContentId]) -> bool {
        match self.selection.item_id {
            Some(id) if !present.contains(&id) => {
                self.selection.item_id = None;
                true
            }
            _ => false,
        }
    }
}

/// Owner of the [`GroupState`]; pairs the pure transitions with backend calls.
///
/// Group writes are confirmed by the backend before the cache is touched, so
/// a failed call leaves the store exactly as it was.
#[derive(Default)]
pub struct GroupStore {
    state: RwLock<GroupState>,
    reloads: Generation,
}

impl GroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> GroupState {
        read(&self.state).clone()
    }

    pub fn groups(&self) -> Vec<TopicGroup> {
        read(&self.state).groups.clone()
    }

    pub fn selection(&self) -> Selection {
        read(&self.state).selection.clone()
    }

    pub fn selected_group_id(&self) -> Option<GroupId> {
        read(&self.state).selection.group_id.clone()
    }

    pub fn selected_group_name(&self, auth: AuthStatus) -> String {
        let state = read(&self.state);
        selected_group_name(&state.groups, state.selection.group_id.as_deref(), auth)
    }

    /// Apply a group list that was fetched elsewhere.
    pub fn apply_groups(&self, groups: Vec<TopicGroup>, auth: AuthStatus) -> bool {
        write(&self.state).apply_groups(groups, auth)
    }

    pub fn repair(&self, auth: AuthStatus) -> bool {
        let changed = write(&self.state).repair(auth);
        if changed {
            debug!(group = ?self.selected_group_id(), ?auth, "group selection repaired");
        }
        changed
    }

    /// Fetch the group list and repair the selection.
    ///
    /// Returns `Ok(false)` when a newer reload superseded this one and the
    /// response was discarded.
    pub async fn reload(&self, backend: &dyn Backend, auth: AuthStatus) -> CoreResult<bool> {
        let ticket = self.reloads.issue();
        let groups = backend.list_groups().await.map_err(CoreError::backend)?;
        if !self.reloads.is_current(ticket) {
            debug!(ticket, "discarding superseded group reload");
            return Ok(false);
        }
        debug!(count = groups.len(), "groups reloaded");
        self.apply_groups(groups, auth);
        Ok(true)
    }

    /// Explicitly select a group (or clear the selection with `None`).
    ///
    /// Only groups visible under `auth` may be selected.
    pub fn select_group(&self, group_id: Option<&str>, auth: AuthStatus) -> CoreResult<bool> {
        let mut state = write(&self.state);
        if let Some(id) = group_id {
            if !group_candidates(&state.groups, auth).any(|g| g.id == id) {
                return Err(CoreError::not_found("group", id));
            }
        }
        Ok(state.set_group(group_id.map(str::to_string)))
    }

    /// Set the topic selection. Callers check the topic belongs to the group.
    pub fn select_topic(&self, topic_id: Option<TopicId>) -> bool {
        write(&self.state).set_topic(topic_id)
    }

    pub fn select_item(&self, item_id: Option<ContentId>) -> bool {
        let mut state = write(&self.state);
        if state.selection.item_id == item_id {
            return false;
        }
        state.selection.item_id = item_id;
        true
    }

    pub fn reconcile_topic(&self, visible: &[TopicId]) -> bool {
        write(&self.state).reconcile_topic(visible)
    }

    pub fn reconcile_item(&self, present: &[ContentId]) -> bool {
        write(&self.state).reconcile_item(present)
    }

    pub fn begin_edit(&self, target: EditingTarget) {
        write(&self.state).selection.editing = target;
    }

    pub fn end_edit(&self) {
        write(&self.state).selection.editing = EditingTarget::None;
    }

    /// Create a group on the backend, then append and select it.
    pub async fn create_group(
        &self,
        backend: &dyn Backend,
        draft: &GroupDraft,
    ) -> CoreResult<TopicGroup> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("Group name cannot be empty."));
        }
        let draft = GroupDraft {
            name: name.to_string(),
            ..draft.clone()
        };
        let group = backend
            .create_group(&draft)
            .await
            .map_err(CoreError::backend)?;

        let mut state = write(&self.state);
        state.groups.push(group.clone());
        state.set_group(Some(group.id.clone()));
        if state.selection.editing == EditingTarget::NewGroup {
            state.selection.editing = EditingTarget::None;
        }
        Ok(group)
    }

    /// Update a group on the backend, then replace the cached entry in place.
    pub async fn edit_group(
        &self,
        backend: &dyn Backend,
        id: &str,
        patch: &GroupPatch,
    ) -> CoreResult<TopicGroup> {
        if patch.is_empty() {
            return Err(CoreError::validation("Provide at least one field to update."));
        }
        if matches!(&patch.name, Some(name) if name.trim().is_empty()) {
            return Err(CoreError::validation("Group name cannot be empty."));
        }
        if !read(&self.state).groups.iter().any(|g| g.id == id) {
            return Err(CoreError::not_found("group", id));
        }
        let updated = backend
            .update_group(id, patch)
            .await
            .map_err(CoreError::backend)?;

        let mut state = write(&self.state);
        if let Some(slot) = state.groups.iter_mut().find(|g| g.id == updated.id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }
}
