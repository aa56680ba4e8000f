//! Topic store: the topic cache and its group-scoped view.
//!
//! Topic writes are not optimistic. Each of create, update, and delete
//! waits for the backend before touching the cache, so a failed call leaves
//! the store unchanged and the error goes back to the caller.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use tracing::debug;

use crate::backend::{Backend, TopicQuery};
use crate::error::{CoreError, CoreResult};
use crate::models::{AuthStatus, Topic, TopicDraft, TopicId, TopicPatch};
use crate::sync::{read, write, Generation};

/// Collapse internal whitespace, trim, and drop blank or duplicate queries.
///
/// Order of first occurrence is preserved, so the first surviving query
/// remains the topic's display term.
pub fn normalize_queries(queries: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    queries
        .iter()
        .map(|q| q.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|q| !q.is_empty())
        .filter(|q| seen.insert(q.clone()))
        .collect()
}

fn validated_queries(queries: &[String]) -> CoreResult<Vec<String>> {
    let normalized = normalize_queries(queries);
    if normalized.is_empty() {
        return Err(CoreError::validation("Topic queries cannot be empty."));
    }
    Ok(normalized)
}

/// Topics visible for the selected group.
///
/// Anonymous browsing without a group shows every cached topic; otherwise
/// only topics whose group matches the selection (ungrouped topics when no
/// group is selected).
pub fn filter_topics<'a>(
    topics: &'a [Topic],
    group_id: Option<&str>,
    auth: AuthStatus,
) -> Vec<&'a Topic> {
    if group_id.is_none() && !auth.is_authenticated() {
        return topics.iter().collect();
    }
    topics
        .iter()
        .filter(|t| t.group_id.as_deref() == group_id)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicState {
    pub topics: Vec<Topic>,
}

impl TopicState {
    pub fn filtered(&self, group_id: Option<&str>, auth: AuthStatus) -> Vec<Topic> {
        filter_topics(&self.topics, group_id, auth)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn push(&mut self, topic: Topic) {
        self.topics.push(topic);
    }

    /// Replace by id, keeping list position. Returns `false` if absent.
    pub fn replace(&mut self, topic: Topic) -> bool {
        match self.topics.iter_mut().find(|t| t.id == topic.id) {
            Some(slot) => {
                *slot = topic;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.topics.len();
        self.topics.retain(|t| t.id != id);
        self.topics.len() != before
    }

    /// Display term per topic id, used to label feed items.
    pub fn terms(&self) -> HashMap<TopicId, String> {
        self.topics
            .iter()
            .map(|t| (t.id.clone(), t.term().to_string()))
            .collect()
    }
}

#[derive(Default)]
pub struct TopicStore {
    state: RwLock<TopicState>,
    reloads: Generation,
}

impl TopicStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> TopicState {
        read(&self.state).clone()
    }

    pub fn topics(&self) -> Vec<Topic> {
        read(&self.state).topics.clone()
    }

    pub fn get(&self, id: &str) -> Option<Topic> {
        read(&self.state).topics.iter().find(|t| t.id == id).cloned()
    }

    pub fn filtered_topics(&self, group_id: Option<&str>, auth: AuthStatus) -> Vec<Topic> {
        read(&self.state).filtered(group_id, auth)
    }

    pub fn terms(&self) -> HashMap<TopicId, String> {
        read(&self.state).terms()
    }

    pub fn clear(&self) {
        self.reloads.issue();
        write(&self.state).topics.clear();
    }

    /// Replace the cache with the backend's list.
    ///
    /// Returns `Ok(false)` if a newer reload was issued while this one was
    /// in flight; its response is discarded.
    pub async fn reload(&self, backend: &dyn Backend, query: &TopicQuery) -> CoreResult<bool> {
        let ticket = self.reloads.issue();
        let topics = backend
            .list_topics(query)
            .await
            .map_err(CoreError::backend)?;
        if !self.reloads.is_current(ticket) {
            debug!(ticket, "discarding superseded topic reload");
            return Ok(false);
        }
        debug!(count = topics.len(), group = ?query.group_id, "topics reloaded");
        write(&self.state).topics = topics;
        Ok(true)
    }

    /// Create a topic. The group selection is not affected.
    pub async fn create_topic(&self, backend: &dyn Backend, draft: &TopicDraft) -> CoreResult<Topic> {
        let draft = TopicDraft {
            queries: validated_queries(&draft.queries)?,
            ..draft.clone()
        };
        let topic = backend
            .create_topic(&draft)
            .await
            .map_err(CoreError::backend)?;
        write(&self.state).push(topic.clone());
        Ok(topic)
    }

    pub async fn update_topic(
        &self,
        backend: &dyn Backend,
        id: &str,
        patch: &TopicPatch,
    ) -> CoreResult<Topic> {
        if patch.is_empty() {
            return Err(CoreError::validation("Provide at least one field to update."));
        }
        let patch = TopicPatch {
            queries: match &patch.queries {
                Some(queries) => Some(validated_queries(queries)?),
                None => None,
            },
            ..patch.clone()
        };
        let topic = backend
            .update_topic(id, &patch)
            .await
            .map_err(CoreError::backend)?;
        if !write(&self.state).replace(topic.clone()) {
            debug!(id, "updated topic was not cached");
        }
        Ok(topic)
    }

    pub async fn delete_topic(&self, backend: &dyn Backend, id: &str) -> CoreResult<()> {
        backend.delete_topic(id).await.map_err(CoreError::backend)?;
        write(&self.state).remove(id);
        Ok(())
    }
}
