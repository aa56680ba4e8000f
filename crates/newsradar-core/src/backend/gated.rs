//! Test backend whose calls can be held until the test releases them.
//!
//! Wraps an [`InMemoryBackend`]. A gate registered for a call makes that
//! call wait on a oneshot before it reaches the inner backend, so tests can
//! settle concurrent requests in any order they like. Gates are consumed
//! first in, first out per key.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::models::{
    Bookmark, ContentId, ContentItem, CurrentUser, Execution, GroupDraft, GroupPatch, Initiator,
    SearchRun, Topic, TopicDraft, TopicGroup, TopicId, TopicPatch, TopicSources,
};

use super::memory::InMemoryBackend;
use super::{Backend, ContentQuery, ExecutionQuery, TopicQuery};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Gate {
    Contents(Option<TopicId>),
    Bookmark(ContentId),
}

pub struct GatedBackend {
    pub inner: InMemoryBackend,
    gates: Mutex<HashMap<Gate, VecDeque<oneshot::Receiver<()>>>>,
}

impl GatedBackend {
    pub fn new(inner: InMemoryBackend) -> Self {
        Self {
            inner,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Hold the next content listing scoped to `topic_id`.
    pub fn gate_contents(&self, topic_id: &str) -> oneshot::Sender<()> {
        self.gate(Gate::Contents(Some(topic_id.to_string())))
    }

    /// Hold the next bookmark write (create or delete) for `content_id`.
    pub fn gate_bookmark(&self, content_id: ContentId) -> oneshot::Sender<()> {
        self.gate(Gate::Bookmark(content_id))
    }

    fn gate(&self, key: Gate) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .push_back(rx);
        tx
    }

    async fn pass(&self, key: Gate) {
        let gate = self
            .gates
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        if let Some(rx) = gate {
            let _ = rx.await;
        }
    }
}

#[async_trait]
impl Backend for GatedBackend {
    async fn current_user(&self) -> Result<CurrentUser> {
        self.inner.current_user().await
    }
    async fn logout(&self) -> Result<()> {
        self.inner.logout().await
    }
    async fn request_magic_link(&self, email: &str, redirect_url: Option<&str>) -> Result<()> {
        self.inner.request_magic_link(email, redirect_url).await
    }
    async fn list_groups(&self) -> Result<Vec<TopicGroup>> {
        self.inner.list_groups().await
    }
    async fn create_group(&self, draft: &GroupDraft) -> Result<TopicGroup> {
        self.inner.create_group(draft).await
    }
    async fn update_group(&self, id: &str, patch: &GroupPatch) -> Result<TopicGroup> {
        self.inner.update_group(id, patch).await
    }
    async fn delete_group(&self, id: &str) -> Result<()> {
        self.inner.delete_group(id).await
    }
    async fn list_topics(&self, query: &TopicQuery) -> Result<Vec<Topic>> {
        self.inner.list_topics(query).await
    }
    async fn create_topic(&self, draft: &TopicDraft) -> Result<Topic> {
        self.inner.create_topic(draft).await
    }
    async fn update_topic(&self, id: &str, patch: &TopicPatch) -> Result<Topic> {
        self.inner.update_topic(id, patch).await
    }
    async fn delete_topic(&self, id: &str) -> Result<()> {
        self.inner.delete_topic(id).await
    }
    async fn list_topic_sources(&self, topic_id: &str) -> Result<TopicSources> {
        self.inner.list_topic_sources(topic_id).await
    }
    async fn list_contents(&self, query: &ContentQuery) -> Result<Vec<ContentItem>> {
        self.pass(Gate::Contents(query.topic_id.clone())).await;
        self.inner.list_contents(query).await
    }
    async fn create_bookmark(&self, content_id: ContentId) -> Result<()> {
        self.pass(Gate::Bookmark(content_id)).await;
        self.inner.create_bookmark(content_id).await
    }
    async fn delete_bookmark(&self, content_id: ContentId) -> Result<()> {
        self.pass(Gate::Bookmark(content_id)).await;
        self.inner.delete_bookmark(content_id).await
    }
    async fn list_bookmarks(&self) -> Result<Vec<Bookmark>> {
        self.inner.list_bookmarks().await
    }
    async fn list_executions(&self, query: &ExecutionQuery) -> Result<Vec<Execution>> {
        self.inner.list_executions(query).await
    }
    async fn run_web_search(&self, topic_id: &str, initiator: Initiator) -> Result<SearchRun> {
        self.inner.run_web_search(topic_id, initiator).await
    }
}
