//! Backend abstraction for NewsRadar clients.
//!
//! The [`Backend`] trait mirrors the REST surface the stores consume,
//! enabling pluggable implementations (the HTTP client in the
//! `newsradar-client` crate, the [`memory::InMemoryBackend`] used in tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//! Failures are reported as `anyhow::Error` whose `Display` is the
//! human-readable message shown to the user.

pub mod memory;

#[cfg(test)]
pub(crate) mod gated;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    Bookmark, ContentId, ContentItem, CurrentUser, Execution, ExecutionStatus, GroupDraft,
    GroupId, GroupPatch, Initiator, SearchRun, Topic, TopicDraft, TopicGroup, TopicId, TopicPatch,
    TopicSources,
};

/// Parameters for `GET /topics`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicQuery {
    /// Substring match against the topic queries.
    pub search: Option<String>,
    /// Restrict to one group (required by the backend for anonymous callers).
    pub group_id: Option<GroupId>,
}

/// Parameters for `GET /contents`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentQuery {
    pub topic_id: Option<TopicId>,
    pub limit: usize,
    pub offset: usize,
}

impl ContentQuery {
    pub fn page(topic_id: Option<TopicId>, limit: usize, offset: usize) -> Self {
        Self {
            topic_id,
            limit,
            offset,
        }
    }
}

/// Parameters for `GET /executions`. Unset fields do not filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionQuery {
    pub status: Option<ExecutionStatus>,
    pub initiator: Option<Initiator>,
}

/// Abstract NewsRadar backend.
///
/// # Operations
///
/// | Method | Endpoint |
/// |--------|----------|
/// | [`current_user`](Backend::current_user) | `GET /auth/me` |
/// | [`logout`](Backend::logout) | `POST /auth/logout` |
/// | [`request_magic_link`](Backend::request_magic_link) | `POST /auth/magic-link` |
/// | [`list_groups`](Backend::list_groups) | `GET /topics/groups` |
/// | [`create_group`](Backend::create_group) | `POST /topics/groups` |
/// | [`update_group`](Backend::update_group) | `PATCH /topics/groups/{uuid}` |
/// | [`delete_group`](Backend::delete_group) | `DELETE /topics/groups/{uuid}` |
/// | [`list_topics`](Backend::list_topics) | `GET /topics` |
/// | [`create_topic`](Backend::create_topic) | `POST /topics` |
/// | [`update_topic`](Backend::update_topic) | `PATCH /topics/{uuid}` |
/// | [`delete_topic`](Backend::delete_topic) | `DELETE /topics/{uuid}` |
/// | [`list_topic_sources`](Backend::list_topic_sources) | `GET /topics/{uuid}/sources` |
/// | [`list_contents`](Backend::list_contents) | `GET /contents` |
/// | [`create_bookmark`](Backend::create_bookmark) | `POST /contents/bookmarks` |
/// | [`delete_bookmark`](Backend::delete_bookmark) | `DELETE /contents/bookmarks/{id}` |
/// | [`list_bookmarks`](Backend::list_bookmarks) | `GET /contents/bookmarks` |
/// | [`list_executions`](Backend::list_executions) | `GET /executions` |
/// | [`run_web_search`](Backend::run_web_search) | `POST /executions/web-search` |
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch the signed-in user. Any failure means "not signed in".
    async fn current_user(&self) -> Result<CurrentUser>;

    async fn logout(&self) -> Result<()>;

    /// Ask the backend to email a sign-in link.
    async fn request_magic_link(&self, email: &str, redirect_url: Option<&str>) -> Result<()>;

    /// List groups in server order. Anonymous callers only see public groups.
    async fn list_groups(&self) -> Result<Vec<TopicGroup>>;

    async fn create_group(&self, draft: &GroupDraft) -> Result<TopicGroup>;

    async fn update_group(&self, id: &str, patch: &GroupPatch) -> Result<TopicGroup>;

    async fn delete_group(&self, id: &str) -> Result<()>;

    async fn list_topics(&self, query: &TopicQuery) -> Result<Vec<Topic>>;

    async fn create_topic(&self, draft: &TopicDraft) -> Result<Topic>;

    async fn update_topic(&self, id: &str, patch: &TopicPatch) -> Result<Topic>;

    async fn delete_topic(&self, id: &str) -> Result<()>;

    /// Distinct URLs collected for a topic, most recently seen first.
    async fn list_topic_sources(&self, topic_id: &str) -> Result<TopicSources>;

    async fn list_contents(&self, query: &ContentQuery) -> Result<Vec<ContentItem>>;

    async fn create_bookmark(&self, content_id: ContentId) -> Result<()>;

    async fn delete_bookmark(&self, content_id: ContentId) -> Result<()>;

    /// The signed-in user's bookmarks, newest first.
    async fn list_bookmarks(&self) -> Result<Vec<Bookmark>>;

    /// Search runs over the signed-in user's topics, newest first.
    async fn list_executions(&self, query: &ExecutionQuery) -> Result<Vec<Execution>>;

    /// Run a web search for a topic now.
    async fn run_web_search(&self, topic_id: &str, initiator: Initiator) -> Result<SearchRun>;
}
