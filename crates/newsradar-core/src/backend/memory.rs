//! In-memory [`Backend`] implementation for tests and offline demos.
//!
//! Uses `Vec`s behind `std::sync::RwLock` and follows the backend's access
//! rules: anonymous callers see public groups and their active topics, and
//! every write requires a signed-in user. Individual operations can be made
//! to fail with [`InMemoryBackend::fail_on`], and every call is counted so
//! tests can assert that no request was sent.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::feed::parse_timestamp;
use crate::models::{
    Bookmark, ContentId, ContentItem, ContentSource, CurrentUser, Execution, ExecutionStatus,
    GroupDraft, GroupPatch, Initiator, SearchRun, Topic, TopicDraft, TopicGroup, TopicPatch,
    TopicSources,
};
use crate::sync::{read, write};
use crate::topics::normalize_queries;

use super::{Backend, ContentQuery, ExecutionQuery, TopicQuery};

struct StoredBookmark {
    id: i64,
    content_id: ContentId,
    created_at: DateTime<Utc>,
}

struct StoredExecution {
    topic_id: String,
    execution: Execution,
}

#[derive(Default)]
struct Data {
    user: Option<CurrentUser>,
    groups: Vec<TopicGroup>,
    topics: Vec<Topic>,
    contents: Vec<ContentItem>,
    bookmarks: Vec<StoredBookmark>,
    executions: Vec<StoredExecution>,
    next_id: i64,
}

impl Data {
    fn fresh_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn is_bookmarked(&self, content_id: ContentId) -> bool {
        self.bookmarks.iter().any(|b| b.content_id == content_id)
    }

    fn add_bookmark(&mut self, content_id: ContentId) {
        if !self.is_bookmarked(content_id) {
            let id = self.fresh_id();
            self.bookmarks.push(StoredBookmark {
                id,
                content_id,
                created_at: Utc::now(),
            });
        }
    }
}

/// In-memory backend for tests and offline use.
#[derive(Default)]
pub struct InMemoryBackend {
    data: RwLock<Data>,
    failures: RwLock<HashMap<&'static str, String>>,
    calls: RwLock<HashMap<&'static str, usize>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: CurrentUser) -> Self {
        write(&self.data).user = Some(user);
        self
    }

    pub fn with_group(self, group: TopicGroup) -> Self {
        write(&self.data).groups.push(group);
        self
    }

    pub fn with_topic(self, topic: Topic) -> Self {
        write(&self.data).topics.push(topic);
        self
    }

    pub fn with_content(self, item: ContentItem) -> Self {
        {
            let mut data = write(&self.data);
            if item.is_bookmarked {
                data.add_bookmark(item.id);
            }
            data.contents.push(item);
        }
        self
    }

    /// Sign a user in or out.
    pub fn set_user(&self, user: Option<CurrentUser>) {
        write(&self.data).user = user;
    }

    /// Make every subsequent call to `op` fail with `message`.
    ///
    /// `op` is the [`Backend`] method name, e.g. `"create_bookmark"`.
    pub fn fail_on(&self, op: &'static str, message: &str) {
        write(&self.failures).insert(op, message.to_string());
    }

    pub fn clear_failure(&self, op: &'static str) {
        write(&self.failures).remove(op);
    }

    /// Number of times `op` was called.
    pub fn calls(&self, op: &str) -> usize {
        read(&self.calls).get(op).copied().unwrap_or(0)
    }

    pub fn is_bookmarked(&self, content_id: ContentId) -> bool {
        read(&self.data).is_bookmarked(content_id)
    }

    pub fn remove_content(&self, content_id: ContentId) {
        write(&self.data).contents.retain(|c| c.id != content_id);
    }

    fn enter(&self, op: &'static str) -> Result<()> {
        *write(&self.calls).entry(op).or_insert(0) += 1;
        if let Some(message) = read(&self.failures).get(op) {
            bail!("{}", message);
        }
        Ok(())
    }

    fn require_user(&self) -> Result<()> {
        if read(&self.data).user.is_none() {
            bail!("Authentication required.");
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn current_user(&self) -> Result<CurrentUser> {
        self.enter("current_user")?;
        match read(&self.data).user.clone() {
            Some(user) => Ok(user),
            None => bail!("Authentication required."),
        }
    }

    async fn logout(&self) -> Result<()> {
        self.enter("logout")?;
        write(&self.data).user = None;
        Ok(())
    }

    async fn request_magic_link(&self, email: &str, _redirect_url: Option<&str>) -> Result<()> {
        self.enter("request_magic_link")?;
        if !email.contains('@') {
            bail!("Enter a valid email address.");
        }
        Ok(())
    }

    async fn list_groups(&self) -> Result<Vec<TopicGroup>> {
        self.enter("list_groups")?;
        let data = read(&self.data);
        let signed_in = data.user.is_some();
        Ok(data
            .groups
            .iter()
            .filter(|g| signed_in || g.is_public())
            .cloned()
            .collect())
    }

    async fn create_group(&self, draft: &GroupDraft) -> Result<TopicGroup> {
        self.enter("create_group")?;
        self.require_user()?;
        let name = draft.name.trim();
        if name.is_empty() {
            bail!("Group name cannot be empty.");
        }
        let mut data = write(&self.data);
        if data.groups.iter().any(|g| g.name == name) {
            bail!("Group name already exists.");
        }
        let group = TopicGroup {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: draft.description.clone(),
            visibility: draft.visibility,
            default_filters: Default::default(),
        };
        data.groups.push(group.clone());
        Ok(group)
    }

    async fn update_group(&self, id: &str, patch: &GroupPatch) -> Result<TopicGroup> {
        self.enter("update_group")?;
        self.require_user()?;
        if patch.is_empty() {
            bail!("Provide at least one field to update.");
        }
        let mut data = write(&self.data);
        let Some(group) = data.groups.iter_mut().find(|g| g.id == id) else {
            bail!("Topic group not found for UUID.");
        };
        if let Some(name) = &patch.name {
            let name = name.trim();
            if name.is_empty() {
                bail!("Group name cannot be empty.");
            }
            group.name = name.to_string();
        }
        if let Some(description) = &patch.description {
            group.description = description.clone();
        }
        if let Some(visibility) = patch.visibility {
            group.visibility = visibility;
        }
        if let Some(filters) = &patch.default_filters {
            group.default_filters = filters.clone();
        }
        Ok(group.clone())
    }

    async fn delete_group(&self, id: &str) -> Result<()> {
        self.enter("delete_group")?;
        self.require_user()?;
        let mut data = write(&self.data);
        let before = data.groups.len();
        data.groups.retain(|g| g.id != id);
        if data.groups.len() == before {
            bail!("Topic group not found for UUID.");
        }
        // Topics survive their group, detached.
        for topic in data.topics.iter_mut() {
            if topic.group_id.as_deref() == Some(id) {
                topic.group_id = None;
                topic.group_name = None;
            }
        }
        Ok(())
    }

    async fn list_topics(&self, query: &TopicQuery) -> Result<Vec<Topic>> {
        self.enter("list_topics")?;
        let data = read(&self.data);
        let search = query
            .search
            .as_deref()
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|s| !s.is_empty());
        let matches_search =
            |t: &Topic| search.as_ref().map_or(true, |s| t.queries.iter().any(|q| q == s));

        if data.user.is_some() {
            return Ok(data
                .topics
                .iter()
                .filter(|t| query.group_id.is_none() || t.group_id == query.group_id)
                .filter(|t| matches_search(*t))
                .cloned()
                .collect());
        }

        let Some(group_id) = &query.group_id else {
            bail!("Authentication required.");
        };
        if !data.groups.iter().any(|g| &g.id == group_id && g.is_public()) {
            bail!("Topic group not found for UUID.");
        }
        Ok(data
            .topics
            .iter()
            .filter(|t| t.group_id.as_ref() == Some(group_id) && t.is_active)
            .filter(|t| matches_search(*t))
            .cloned()
            .collect())
    }

    async fn create_topic(&self, draft: &TopicDraft) -> Result<Topic> {
        self.enter("create_topic")?;
        self.require_user()?;
        let queries = normalize_queries(&draft.queries);
        if queries.is_empty() {
            bail!("Topic queries cannot be empty.");
        }
        let mut data = write(&self.data);
        let group_name = match &draft.group_id {
            Some(gid) => match data.groups.iter().find(|g| &g.id == gid) {
                Some(g) => Some(g.name.clone()),
                None => bail!("Topic group not found for UUID."),
            },
            None => None,
        };
        let topic = Topic {
            id: uuid::Uuid::new_v4().to_string(),
            queries,
            is_active: true,
            group_id: draft.group_id.clone(),
            group_name,
            filters: draft.filters.clone(),
            last_fetched_at: None,
            content_source_count: 0,
        };
        data.topics.push(topic.clone());
        Ok(topic)
    }

    async fn update_topic(&self, id: &str, patch: &TopicPatch) -> Result<Topic> {
        self.enter("update_topic")?;
        self.require_user()?;
        if patch.is_empty() {
            bail!("Provide at least one field to update.");
        }
        let mut data = write(&self.data);
        let Some(topic) = data.topics.iter_mut().find(|t| t.id == id) else {
            bail!("Topic not found for UUID.");
        };
        if let Some(active) = patch.is_active {
            topic.is_active = active;
        }
        if let Some(queries) = &patch.queries {
            let queries = normalize_queries(queries);
            if queries.is_empty() {
                bail!("Topic queries cannot be empty.");
            }
            topic.queries = queries;
        }
        if let Some(filters) = &patch.filters {
            topic.filters = filters.clone();
        }
        Ok(topic.clone())
    }

    async fn delete_topic(&self, id: &str) -> Result<()> {
        self.enter("delete_topic")?;
        self.require_user()?;
        let mut data = write(&self.data);
        let before = data.topics.len();
        data.topics.retain(|t| t.id != id);
        if data.topics.len() == before {
            bail!("Topic not found for UUID.");
        }
        data.contents.retain(|c| c.topic_id != id);
        data.executions.retain(|e| e.topic_id != id);
        Ok(())
    }

    async fn list_contents(&self, query: &ContentQuery) -> Result<Vec<ContentItem>> {
        self.enter("list_contents")?;
        self.require_user()?;
        let data = read(&self.data);
        Ok(data
            .contents
            .iter()
            .filter(|c| query.topic_id.as_ref().map_or(true, |t| &c.topic_id == t))
            .skip(query.offset)
            .take(query.limit)
            .map(|c| ContentItem {
                is_bookmarked: data.is_bookmarked(c.id),
                ..c.clone()
            })
            .collect())
    }

    async fn create_bookmark(&self, content_id: ContentId) -> Result<()> {
        self.enter("create_bookmark")?;
        self.require_user()?;
        let mut data = write(&self.data);
        if !data.contents.iter().any(|c| c.id == content_id) {
            bail!("Content not found for user.");
        }
        data.add_bookmark(content_id);
        Ok(())
    }

    async fn delete_bookmark(&self, content_id: ContentId) -> Result<()> {
        self.enter("delete_bookmark")?;
        self.require_user()?;
        let mut data = write(&self.data);
        let before = data.bookmarks.len();
        data.bookmarks.retain(|b| b.content_id != content_id);
        if data.bookmarks.len() == before {
            bail!("Bookmark not found.");
        }
        Ok(())
    }

    async fn list_bookmarks(&self) -> Result<Vec<Bookmark>> {
        self.enter("list_bookmarks")?;
        self.require_user()?;
        let data = read(&self.data);
        let mut bookmarks: Vec<Bookmark> = data
            .bookmarks
            .iter()
            .filter_map(|b| {
                let content = data.contents.iter().find(|c| c.id == b.content_id)?;
                let queries = data
                    .topics
                    .iter()
                    .find(|t| t.id == content.topic_id)
                    .map(|t| t.queries.clone())
                    .unwrap_or_default();
                Some(Bookmark {
                    id: b.id,
                    content_id: b.content_id,
                    url: content.url.clone(),
                    title: content.title.clone(),
                    created_at: b.created_at,
                    topic_id: content.topic_id.clone(),
                    topic_queries: queries,
                })
            })
            .collect();
        bookmarks.reverse();
        Ok(bookmarks)
    }

    async fn list_executions(&self, query: &ExecutionQuery) -> Result<Vec<Execution>> {
        self.enter("list_executions")?;
        self.require_user()?;
        let data = read(&self.data);
        Ok(data
            .executions
            .iter()
            .rev()
            .map(|e| &e.execution)
            .filter(|e| query.status.map_or(true, |s| e.status == s))
            .filter(|e| query.initiator.map_or(true, |i| e.initiator == i))
            .cloned()
            .collect())
    }

    /// Records a completed run that produced one content item.
    async fn run_web_search(&self, topic_id: &str, initiator: Initiator) -> Result<SearchRun> {
        self.enter("run_web_search")?;
        self.require_user()?;
        let mut data = write(&self.data);
        let Some(topic) = data.topics.iter().find(|t| t.id == topic_id).cloned() else {
            bail!("Topic not found for UUID.");
        };
        let now = Utc::now();
        let execution_id = data.fresh_id();
        let content_id = data.contents.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        data.contents.push(ContentItem {
            id: content_id,
            url: format!("https://search.example.com/{}/{}", topic_id, execution_id),
            title: format!("Web search: {}", topic.term()),
            summary: String::new(),
            source: None,
            published_at: None,
            created_at: Some(now.to_rfc3339()),
            topic_id: topic_id.to_string(),
            relevance_score: None,
            is_bookmarked: false,
        });
        data.executions.push(StoredExecution {
            topic_id: topic_id.to_string(),
            execution: Execution {
                id: execution_id,
                status: ExecutionStatus::Completed,
                initiator,
                created_at: now,
                content_item_id: Some(content_id),
                error_message: None,
            },
        });
        if let Some(t) = data.topics.iter_mut().find(|t| t.id == topic_id) {
            t.last_fetched_at = Some(now);
        }
        Ok(SearchRun {
            execution_id,
            content_item_id: Some(content_id),
            initiator,
        })
    }

    async fn list_topic_sources(&self, topic_id: &str) -> Result<TopicSources> {
        self.enter("list_topic_sources")?;
        self.require_user()?;
        let data = read(&self.data);
        let Some(topic) = data.topics.iter().find(|t| t.id == topic_id) else {
            bail!("Topic not found for UUID.");
        };

        // Contents are kept oldest first, so later entries win ties.
        let mut by_url: Vec<ContentSource> = Vec::new();
        for item in data.contents.iter().filter(|c| c.topic_id == topic_id) {
            let seen = item.created_at.as_deref().and_then(parse_timestamp);
            match by_url.iter_mut().find(|s| s.url == item.url) {
                Some(source) => {
                    source.content_item_count += 1;
                    if seen >= source.last_seen {
                        source.id = item.id;
                        source.title = item.title.clone();
                        source.last_seen = seen;
                    }
                }
                None => by_url.push(ContentSource {
                    id: item.id,
                    url: item.url.clone(),
                    title: item.title.clone(),
                    content_item_count: 1,
                    last_seen: seen,
                }),
            }
        }
        by_url.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then_with(|| a.url.cmp(&b.url)));

        Ok(TopicSources {
            topic_id: topic.id.clone(),
            queries: topic.queries.clone(),
            sources: by_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Visibility;

    fn group(id: &str, visibility: Visibility) -> TopicGroup {
        TopicGroup {
            id: id.to_string(),
            name: id.to_uppercase(),
            description: String::new(),
            visibility,
            default_filters: Default::default(),
        }
    }

    fn user() -> CurrentUser {
        CurrentUser {
            id: 1,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn anonymous_callers_only_see_public_groups() {
        let backend = InMemoryBackend::new()
            .with_group(group("g1", Visibility::Private))
            .with_group(group("g2", Visibility::Public));
        let ids: Vec<_> = backend
            .list_groups()
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(ids, vec!["g2"]);

        backend.set_user(Some(user()));
        assert_eq!(backend.list_groups().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn injected_failures_are_counted() {
        let backend = InMemoryBackend::new().with_user(user());
        backend.fail_on("list_groups", "boom");
        let err = backend.list_groups().await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(backend.calls("list_groups"), 1);
        assert_eq!(backend.calls("list_topics"), 0);
    }

    #[tokio::test]
    async fn writes_require_a_user() {
        let backend = InMemoryBackend::new();
        let err = backend
            .create_group(&GroupDraft {
                name: "News".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Authentication required.");
    }

    #[tokio::test]
    async fn deleting_a_missing_bookmark_fails() {
        let backend = InMemoryBackend::new().with_user(user());
        let err = backend.delete_bookmark(9).await.unwrap_err();
        assert_eq!(err.to_string(), "Bookmark not found.");
    }

    fn topic(id: &str) -> Topic {
        Topic {
            id: id.to_string(),
            queries: vec!["grid storage".to_string()],
            is_active: true,
            group_id: None,
            group_name: None,
            filters: Default::default(),
            last_fetched_at: None,
            content_source_count: 0,
        }
    }

    fn content(id: ContentId, url: &str, created_at: &str) -> ContentItem {
        ContentItem {
            id,
            url: url.to_string(),
            title: format!("Story {}", id),
            summary: String::new(),
            source: None,
            published_at: None,
            created_at: Some(created_at.to_string()),
            topic_id: "t1".to_string(),
            relevance_score: None,
            is_bookmarked: false,
        }
    }

    #[tokio::test]
    async fn bookmarks_are_listed_newest_first() {
        let backend = InMemoryBackend::new()
            .with_user(user())
            .with_topic(topic("t1"))
            .with_content(content(1, "https://a.example/1", "2025-01-01"))
            .with_content(content(2, "https://a.example/2", "2025-01-02"));
        backend.create_bookmark(2).await.unwrap();
        backend.create_bookmark(1).await.unwrap();

        let bookmarks = backend.list_bookmarks().await.unwrap();
        let ids: Vec<_> = bookmarks.iter().map(|b| b.content_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(bookmarks[0].topic_term(), "grid storage");
    }

    #[tokio::test]
    async fn web_search_records_an_execution() {
        let backend = InMemoryBackend::new()
            .with_user(user())
            .with_topic(topic("t1"))
            .with_content(content(7, "https://a.example/7", "2025-01-01"));

        let run = backend.run_web_search("t1", Initiator::Cli).await.unwrap();
        assert_eq!(run.content_item_id, Some(8));
        assert_eq!(run.initiator, Initiator::Cli);

        let executions = backend
            .list_executions(&ExecutionQuery::default())
            .await
            .unwrap();
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].id, run.execution_id);
        assert_eq!(executions[0].status, ExecutionStatus::Completed);

        let only_periodic = ExecutionQuery {
            initiator: Some(Initiator::Periodic),
            ..Default::default()
        };
        assert!(backend.list_executions(&only_periodic).await.unwrap().is_empty());

        let err = backend
            .run_web_search("missing", Initiator::User)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Topic not found for UUID.");
    }

    #[tokio::test]
    async fn sources_group_contents_by_url() {
        let backend = InMemoryBackend::new()
            .with_user(user())
            .with_topic(topic("t1"))
            .with_content(content(1, "https://a.example/x", "2025-01-01"))
            .with_content(content(2, "https://b.example/y", "2025-02-01"))
            .with_content(content(3, "https://a.example/x", "2025-03-01"));

        let sources = backend.list_topic_sources("t1").await.unwrap();
        assert_eq!(sources.queries, vec!["grid storage"]);
        let rows: Vec<_> = sources
            .sources
            .iter()
            .map(|s| (s.url.as_str(), s.id, s.content_item_count))
            .collect();
        assert_eq!(
            rows,
            vec![("https://a.example/x", 3, 2), ("https://b.example/y", 2, 1)]
        );
    }
}

