//! Core data models shared by the stores, the feed loader, and backends.
//!
//! Backends convert their wire records into these types; everything above
//! the [`Backend`](crate::backend::Backend) seam works only with them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend-assigned topic group identifier (a UUID string).
pub type GroupId = String;
/// Backend-assigned topic identifier (a UUID string).
pub type TopicId = String;
/// Backend-assigned content item identifier.
pub type ContentId = i64;

/// Whether a group is browsable without signing in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

/// Recency window applied by the backend when searching for a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recency {
    Day,
    Week,
    Month,
    Year,
}

impl Recency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recency::Day => "day",
            Recency::Week => "week",
            Recency::Month => "month",
            Recency::Year => "year",
        }
    }
}

impl std::str::FromStr for Recency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Recency::Day),
            "week" => Ok(Recency::Week),
            "month" => Ok(Recency::Month),
            "year" => Ok(Recency::Year),
            other => Err(format!(
                "unknown recency '{}': expected day, week, month, or year",
                other
            )),
        }
    }
}

/// Search filters attached to a topic, or used as a group's defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopicFilters {
    #[serde(default)]
    pub domain_allowlist: Vec<String>,
    #[serde(default)]
    pub domain_blocklist: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub recency: Option<Recency>,
}

/// A named collection of topics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicGroup {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub default_filters: TopicFilters,
}

impl TopicGroup {
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}

/// A user-defined monitoring query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub queries: Vec<String>,
    pub is_active: bool,
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub filters: TopicFilters,
    #[serde(default)]
    pub last_fetched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub content_source_count: u64,
}

impl Topic {
    /// The display term: the first query, or an empty string.
    pub fn term(&self) -> &str {
        self.queries.first().map(String::as_str).unwrap_or("")
    }
}

/// A content item as delivered by the backend, before normalization.
///
/// Timestamps stay as strings here because the backend is not trusted to
/// send parseable values; [`crate::feed::normalize_item`] resolves them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
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
    pub topic_id: TopicId,
    #[serde(default)]
    pub relevance_score: Option<f64>,
    #[serde(default)]
    pub is_bookmarked: bool,
}

/// A normalized, display-ready content item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewContentItem {
    pub id: ContentId,
    pub url: String,
    pub title: String,
    pub summary: String,
    /// Host of the URL without `www.`, the raw source, or `"Unknown"`.
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub topic_id: TopicId,
    /// First query of the owning topic, when that topic is loaded.
    pub topic_term: Option<String>,
    /// Relevance on a 0 to 100 scale.
    pub relevance: u8,
    pub is_bookmarked: bool,
}

/// A content item the signed-in user bookmarked, newest first in listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: i64,
    pub content_id: ContentId,
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub topic_id: TopicId,
    #[serde(default)]
    pub topic_queries: Vec<String>,
}

impl Bookmark {
    pub fn topic_term(&self) -> &str {
        self.topic_queries.first().map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" => Ok(ExecutionStatus::Running),
            "completed" => Ok(ExecutionStatus::Completed),
            "failed" => Ok(ExecutionStatus::Failed),
            other => Err(format!(
                "unknown status '{}': expected running, completed, or failed",
                other
            )),
        }
    }
}

/// Who started a search execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Initiator {
    Periodic,
    #[default]
    User,
    Admin,
    Cli,
}

impl Initiator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Initiator::Periodic => "periodic",
            Initiator::User => "user",
            Initiator::Admin => "admin",
            Initiator::Cli => "cli",
        }
    }
}

impl std::str::FromStr for Initiator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "periodic" => Ok(Initiator::Periodic),
            "user" => Ok(Initiator::User),
            "admin" => Ok(Initiator::Admin),
            "cli" => Ok(Initiator::Cli),
            other => Err(format!(
                "unknown initiator '{}': expected periodic, user, admin, or cli",
                other
            )),
        }
    }
}

/// One web search run for a topic, scheduled or on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: i64,
    pub status: ExecutionStatus,
    pub initiator: Initiator,
    pub created_at: DateTime<Utc>,
    /// The content item the run produced, if any.
    #[serde(default)]
    pub content_item_id: Option<ContentId>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Outcome of an on-demand web search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRun {
    pub execution_id: i64,
    pub content_item_id: Option<ContentId>,
    pub initiator: Initiator,
}

/// A distinct URL found for a topic, aggregated over its content items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSource {
    /// Id of the most recent content item with this URL.
    pub id: ContentId,
    pub url: String,
    #[serde(default)]
    pub title: String,
    pub content_item_count: u64,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Content sources of one topic, most recently seen first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSources {
    pub topic_id: TopicId,
    pub queries: Vec<String>,
    pub sources: Vec<ContentSource>,
}

/// The signed-in user as reported by the session endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
}

/// Authentication state as seen by the client.
///
/// `Unknown` covers the window before the session check resolves; the
/// stores defer any selection decisions while it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    #[default]
    Unknown,
    Authenticated,
    Anonymous,
}

impl AuthStatus {
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            None => AuthStatus::Unknown,
            Some(true) => AuthStatus::Authenticated,
            Some(false) => AuthStatus::Anonymous,
        }
    }

    /// `None` while unknown, otherwise whether a user is signed in.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            AuthStatus::Unknown => None,
            AuthStatus::Authenticated => Some(true),
            AuthStatus::Anonymous => Some(false),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthStatus::Authenticated)
    }
}

/// What the editor pane is focused on, if anything.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EditingTarget {
    #[default]
    None,
    NewGroup,
    NewTopic,
    Group(GroupId),
    Topic(TopicId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Read,
    Edit,
}

/// The client's current focus: group, topic, content item, and editor target.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Selection {
    pub group_id: Option<GroupId>,
    pub topic_id: Option<TopicId>,
    pub item_id: Option<ContentId>,
    pub editing: EditingTarget,
}

impl Selection {
    pub fn view_mode(&self) -> ViewMode {
        match self.editing {
            EditingTarget::None => ViewMode::Read,
            _ => ViewMode::Edit,
        }
    }
}

/// Input for creating a topic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TopicDraft {
    pub queries: Vec<String>,
    pub group_id: Option<GroupId>,
    pub filters: TopicFilters,
}

/// Partial topic update; `None` fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TopicPatch {
    pub is_active: Option<bool>,
    pub queries: Option<Vec<String>>,
    pub filters: Option<TopicFilters>,
}

impl TopicPatch {
    pub fn is_empty(&self) -> bool {
        self.is_active.is_none() && self.queries.is_none() && self.filters.is_none()
    }
}

/// Input for creating a topic group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupDraft {
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
}

/// Partial group update; `None` fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
    /// Replaces the group's default filters as a whole.
    pub default_filters: Option<TopicFilters>,
}

impl GroupPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.visibility.is_none()
            && self.default_filters.is_none()
    }
}
