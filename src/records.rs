//! Wire records for the NewsRadar REST API.
//!
//! These mirror the JSON the backend sends and accepts. Responses are
//! converted into the core models with `From`; request bodies are built
//! from the core drafts and patches. Fields the backend may omit carry
//! `#[serde(default)]` so older servers still parse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use newsradar_core::models::{
    Bookmark, ContentItem, ContentSource, CurrentUser, Execution, ExecutionStatus, GroupDraft,
    GroupPatch, Initiator, Recency, SearchRun, Topic, TopicDraft, TopicFilters, TopicGroup,
    TopicPatch, TopicSources, Visibility,
};

/// Search filters as the API names them, on topics and group defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRecord {
    #[serde(default)]
    pub search_domain_allowlist: Vec<String>,
    #[serde(default)]
    pub search_domain_blocklist: Vec<String>,
    #[serde(default)]
    pub search_language_filter: Vec<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub search_recency_filter: Option<String>,
}

impl From<FilterRecord> for TopicFilters {
    fn from(r: FilterRecord) -> Self {
        TopicFilters {
            domain_allowlist: r.search_domain_allowlist,
            domain_blocklist: r.search_domain_blocklist,
            languages: r.search_language_filter,
            country: r.country,
            // Unknown windows are treated as "no filter".
            recency: r.search_recency_filter.and_then(|s| s.parse::<Recency>().ok()),
        }
    }
}

impl From<&TopicFilters> for FilterRecord {
    fn from(f: &TopicFilters) -> Self {
        FilterRecord {
            search_domain_allowlist: f.domain_allowlist.clone(),
            search_domain_blocklist: f.domain_blocklist.clone(),
            search_language_filter: f.languages.clone(),
            country: f.country.clone(),
            search_recency_filter: f.recency.map(|r| r.as_str().to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRecord {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub default_filters: Option<FilterRecord>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<GroupRecord> for TopicGroup {
    fn from(r: GroupRecord) -> Self {
        TopicGroup {
            id: r.uuid,
            name: r.name,
            description: r.description,
            visibility: if r.is_public {
                Visibility::Public
            } else {
                Visibility::Private
            },
            default_filters: r.default_filters.map(Into::into).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRecord {
    pub uuid: String,
    pub queries: Vec<String>,
    #[serde(default)]
    pub last_fetched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub content_source_count: u64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub group_uuid: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(flatten)]
    pub filters: FilterRecord,
}

fn default_true() -> bool {
    true
}

impl From<TopicRecord> for Topic {
    fn from(r: TopicRecord) -> Self {
        Topic {
            id: r.uuid,
            queries: r.queries,
            is_active: r.is_active,
            group_id: r.group_uuid,
            group_name: r.group_name,
            filters: r.filters.into(),
            last_fetched_at: r.last_fetched_at,
            content_source_count: r.content_source_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    pub topic_uuid: String,
    #[serde(default, alias = "match_score")]
    pub relevance_score: Option<f64>,
    #[serde(default)]
    pub is_bookmarked: bool,
}

impl From<ContentRecord> for ContentItem {
    fn from(r: ContentRecord) -> Self {
        ContentItem {
            id: r.id,
            url: r.url,
            title: r.title,
            summary: r.summary,
            source: r.source,
            published_at: r.published_at,
            created_at: r.created_at,
            topic_id: r.topic_uuid,
            relevance_score: r.relevance_score,
            is_bookmarked: r.is_bookmarked,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkRecord {
    pub id: i64,
    pub content_id: i64,
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub topic_uuid: String,
    #[serde(default)]
    pub topic_queries: Vec<String>,
}

impl From<BookmarkRecord> for Bookmark {
    fn from(r: BookmarkRecord) -> Self {
        Bookmark {
            id: r.id,
            content_id: r.content_id,
            url: r.url,
            title: r.title,
            created_at: r.created_at,
            topic_id: r.topic_uuid,
            topic_queries: r.topic_queries,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: i64,
    pub status: ExecutionStatus,
    pub initiator: Initiator,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub content_item_id: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl From<ExecutionRecord> for Execution {
    fn from(r: ExecutionRecord) -> Self {
        Execution {
            id: r.id,
            status: r.status,
            initiator: r.initiator,
            created_at: r.created_at,
            content_item_id: r.content_item_id,
            error_message: r.error_message,
        }
    }
}

/// Result of `POST /executions/web-search`. The raw search response the
/// server also returns is not kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchRecord {
    pub execution_id: i64,
    #[serde(default)]
    pub content_item_id: Option<i64>,
    pub initiator: Initiator,
}

impl From<WebSearchRecord> for SearchRun {
    fn from(r: WebSearchRecord) -> Self {
        SearchRun {
            execution_id: r.execution_id,
            content_item_id: r.content_item_id,
            initiator: r.initiator,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content_item_count: u64,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSourcesRecord {
    pub topic_uuid: String,
    #[serde(default)]
    pub queries: Vec<String>,
    pub sources: Vec<SourceRecord>,
}

impl From<TopicSourcesRecord> for TopicSources {
    fn from(r: TopicSourcesRecord) -> Self {
        TopicSources {
            topic_id: r.topic_uuid,
            queries: r.queries,
            sources: r
                .sources
                .into_iter()
                .map(|s| ContentSource {
                    id: s.id,
                    url: s.url,
                    title: s.title,
                    content_item_count: s.content_item_count,
                    last_seen: s.last_seen,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
}

impl From<UserRecord> for CurrentUser {
    fn from(r: UserRecord) -> Self {
        CurrentUser {
            id: r.id,
            username: r.username,
            email: r.email,
        }
    }
}

// Response envelopes

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupList {
    pub groups: Vec<GroupRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupEnvelope {
    pub group: GroupRecord,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopicList {
    pub topics: Vec<TopicRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopicEnvelope {
    pub topic: TopicRecord,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContentList {
    pub items: Vec<ContentRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookmarkList {
    pub bookmarks: Vec<BookmarkRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecutionList {
    pub executions: Vec<ExecutionRecord>,
}

/// Error body returned on any non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    /// The human-readable message, if `detail` is a non-empty string.
    pub fn message(&self) -> Option<&str> {
        self.detail.as_str().map(str::trim).filter(|s| !s.is_empty())
    }
}

// Request bodies

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupCreateBody {
    pub name: String,
    pub description: String,
    pub is_public: bool,
}

impl From<&GroupDraft> for GroupCreateBody {
    fn from(d: &GroupDraft) -> Self {
        GroupCreateBody {
            name: d.name.clone(),
            description: d.description.clone(),
            is_public: d.visibility == Visibility::Public,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GroupUpdateBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_filters: Option<FilterRecord>,
}

impl From<&GroupPatch> for GroupUpdateBody {
    fn from(p: &GroupPatch) -> Self {
        GroupUpdateBody {
            name: p.name.clone(),
            description: p.description.clone(),
            is_public: p.visibility.map(|v| v == Visibility::Public),
            default_filters: p.default_filters.as_ref().map(Into::into),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopicCreateBody {
    pub queries: Vec<String>,
    pub group_uuid: Option<String>,
    pub search_domain_allowlist: Vec<String>,
    pub search_domain_blocklist: Vec<String>,
    pub search_language_filter: Vec<String>,
    pub country: Option<String>,
    pub search_recency_filter: Option<String>,
}

impl From<&TopicDraft> for TopicCreateBody {
    fn from(d: &TopicDraft) -> Self {
        TopicCreateBody {
            queries: d.queries.clone(),
            group_uuid: d.group_id.clone(),
            search_domain_allowlist: d.filters.domain_allowlist.clone(),
            search_domain_blocklist: d.filters.domain_blocklist.clone(),
            search_language_filter: d.filters.languages.clone(),
            country: d.filters.country.clone(),
            search_recency_filter: d.filters.recency.map(|r| r.as_str().to_string()),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TopicUpdateBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_domain_allowlist: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_domain_blocklist: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_language_filter: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_recency_filter: Option<String>,
}

impl From<&TopicPatch> for TopicUpdateBody {
    fn from(p: &TopicPatch) -> Self {
        let mut body = TopicUpdateBody {
            is_active: p.is_active,
            queries: p.queries.clone(),
            ..Default::default()
        };
        if let Some(f) = &p.filters {
            body.search_domain_allowlist = Some(f.domain_allowlist.clone());
            body.search_domain_blocklist = Some(f.domain_blocklist.clone());
            body.search_language_filter = Some(f.languages.clone());
            body.country = f.country.clone();
            body.search_recency_filter = f.recency.map(|r| r.as_str().to_string());
        }
        body
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookmarkBody {
    pub content_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebSearchBody {
    pub topic_uuid: String,
    pub initiator: Initiator,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MagicLinkBody {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}
