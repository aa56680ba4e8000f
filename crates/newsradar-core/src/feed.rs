//! Feed loader: fetches content for the current selection and normalizes it.
//!
//! # Load algorithm
//!
//! 1. Not authenticated: the feed is emptied and no request is sent.
//! 2. Authenticated: `GET /contents` scoped to the selected topic; with only
//!    a group selected, the unscoped feed is fetched and filtered down to the
//!    group's topic ids; with neither, the full feed.
//! 3. Every load takes a ticket under the state lock. A response is
//!    committed only if its ticket is still the newest one when it arrives,
//!    so whatever selection was active last wins regardless of the order in
//!    which responses come back. Superseded responses are dropped silently.
//!    A selection or auth change supersedes in-flight loads as soon as it
//!    happens ([`FeedLoader::retarget`]), before any follow-up request.
//! 4. Raw items are normalized into [`ViewContentItem`]s (see
//!    [`derive_source`], [`normalize_score`], [`resolve_timestamp`]).
//!
//! A failed fetch empties the feed and records the message in
//! [`FeedState::error`]; nothing is retried and no error escapes the loader.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::{Backend, ContentQuery};
use crate::models::{
    AuthStatus, ContentId, ContentItem, GroupId, Selection, TopicId, ViewContentItem,
};
use crate::sync::{read, write, Generation};

pub const UNKNOWN_SOURCE: &str = "Unknown";
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Source label for an item: URL host without `www.`, then the raw
/// `source` field, then [`UNKNOWN_SOURCE`].
pub fn derive_source(url: &str, raw_source: Option<&str>) -> String {
    let host = url::Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .filter(|h| !h.is_empty());
    if let Some(host) = host {
        return host.strip_prefix("www.").unwrap_or(&host).to_string();
    }
    raw_source
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_SOURCE)
        .to_string()
}

/// Relevance on a 0 to 100 integer scale.
///
/// Scores up to 1 are fractions and get multiplied by 100; larger scores
/// are taken as already on the 0 to 100 scale. Missing or NaN scores are 0.
pub fn normalize_score(score: Option<f64>) -> u8 {
    match score {
        Some(s) if !s.is_nan() => {
            let scaled = if s <= 1.0 { s * 100.0 } else { s };
            scaled.round().clamp(0.0, 100.0) as u8
        }
        _ => 0,
    }
}

/// Parse an RFC 3339 timestamp, a naive `YYYY-MM-DDTHH:MM:SS` (taken as
/// UTC), or a bare date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Display timestamp: `published_at` if parseable, else `created_at`, else `now`.
pub fn resolve_timestamp(
    published_at: Option<&str>,
    created_at: Option<&str>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    published_at
        .and_then(parse_timestamp)
        .or_else(|| created_at.and_then(parse_timestamp))
        .unwrap_or(now)
}

pub fn normalize_item(
    item: ContentItem,
    terms: &HashMap<TopicId, String>,
    now: DateTime<Utc>,
) -> ViewContentItem {
    ViewContentItem {
        source: derive_source(&item.url, item.source.as_deref()),
        timestamp: resolve_timestamp(item.published_at.as_deref(), item.created_at.as_deref(), now),
        relevance: normalize_score(item.relevance_score),
        topic_term: terms.get(&item.topic_id).cloned(),
        id: item.id,
        url: item.url,
        title: item.title,
        summary: item.summary,
        topic_id: item.topic_id,
        is_bookmarked: item.is_bookmarked,
    }
}

/// The selection inputs a load depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedKey {
    pub auth: AuthStatus,
    pub group_id: Option<GroupId>,
    pub topic_id: Option<TopicId>,
}

impl FeedKey {
    pub fn new(auth: AuthStatus, group_id: Option<GroupId>, topic_id: Option<TopicId>) -> Self {
        Self {
            auth,
            group_id,
            topic_id,
        }
    }

    pub fn from_selection(selection: &Selection, auth: AuthStatus) -> Self {
        Self::new(auth, selection.group_id.clone(), selection.topic_id.clone())
    }
}

/// What a load fetches and how its response is filtered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedScope {
    Topic(TopicId),
    /// Unscoped fetch narrowed client-side to these topic ids.
    Group { topic_ids: HashSet<TopicId> },
    All,
}

impl FeedScope {
    /// Scope for `key`, given the topic ids belonging to the selected group.
    pub fn for_key<I>(key: &FeedKey, group_topic_ids: I) -> Self
    where
        I: IntoIterator<Item = TopicId>,
    {
        match (&key.topic_id, &key.group_id) {
            (Some(topic_id), _) => FeedScope::Topic(topic_id.clone()),
            (None, Some(_)) => FeedScope::Group {
                topic_ids: group_topic_ids.into_iter().collect(),
            },
            (None, None) => FeedScope::All,
        }
    }

    fn topic_filter(&self) -> Option<TopicId> {
        match self {
            FeedScope::Topic(id) => Some(id.clone()),
            _ => None,
        }
    }

    fn admits(&self, item: &ContentItem) -> bool {
        match self {
            FeedScope::Group { topic_ids } => topic_ids.contains(&item.topic_id),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedState {
    pub items: Vec<ViewContentItem>,
    pub loading: bool,
    pub error: Option<String>,
    /// Whether the last page came back full.
    pub has_more: bool,
    /// Raw items fetched so far for the active key (before group filtering).
    pub next_offset: usize,
}

impl FeedState {
    pub fn item_ids(&self) -> Vec<ContentId> {
        self.items.iter().map(|i| i.id).collect()
    }

    /// Set an item's bookmark flag, returning its previous value.
    pub fn set_bookmarked(&mut self, id: ContentId, value: bool) -> Option<bool> {
        let item = self.items.iter_mut().find(|i| i.id == id)?;
        Some(std::mem::replace(&mut item.is_bookmarked, value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    /// The response was applied; `count` items are now in the feed.
    Committed { count: usize },
    /// A newer load superseded this one; its response was dropped.
    Stale,
    /// The fetch failed; the feed is empty and carries the message.
    Failed(String),
    /// Nothing was fetched (not authenticated, or nothing more to page).
    Skipped,
}

enum Commit {
    Replace,
    Append,
}

pub struct FeedLoader {
    state: RwLock<FeedState>,
    active: RwLock<Option<FeedKey>>,
    loads: Generation,
    page_size: usize,
}

impl Default for FeedLoader {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl FeedLoader {
    pub fn new(page_size: usize) -> Self {
        Self {
            state: RwLock::new(FeedState::default()),
            active: RwLock::new(None),
            loads: Generation::new(),
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn snapshot(&self) -> FeedState {
        read(&self.state).clone()
    }

    pub fn items(&self) -> Vec<ViewContentItem> {
        read(&self.state).items.clone()
    }

    pub fn item(&self, id: ContentId) -> Option<ViewContentItem> {
        read(&self.state).items.iter().find(|i| i.id == id).cloned()
    }

    pub fn item_ids(&self) -> Vec<ContentId> {
        read(&self.state).item_ids()
    }

    pub fn active_key(&self) -> Option<FeedKey> {
        read(&self.active).clone()
    }

    /// Empty the feed for `key` without a request, superseding in-flight loads.
    pub fn clear(&self, key: FeedKey) {
        let mut state = write(&self.state);
        self.loads.issue();
        *write(&self.active) = Some(key);
        *state = FeedState::default();
    }

    /// Point the feed at `key` ahead of its load.
    ///
    /// If `key` differs from the active key, in-flight loads are superseded
    /// and the items of the previous selection are dropped, so nothing from
    /// another selection (or from a signed-in session, once signed out) is
    /// shown or committed. Returns `true` if visible state was cleared.
    pub fn retarget(&self, key: FeedKey) -> bool {
        let mut state = write(&self.state);
        let mut active = write(&self.active);
        if active.as_ref() == Some(&key) {
            return false;
        }
        self.loads.issue();
        debug!(?key, "feed retargeted");
        *active = Some(key);
        let cleared = *state != FeedState::default();
        *state = FeedState::default();
        cleared
    }

    pub fn set_bookmarked(&self, id: ContentId, value: bool) -> Option<bool> {
        write(&self.state).set_bookmarked(id, value)
    }

    pub fn set_error(&self, message: impl Into<String>) {
        write(&self.state).error = Some(message.into());
    }

    /// Load the first page for `key`.
    pub async fn load(
        &self,
        backend: &dyn Backend,
        key: FeedKey,
        scope: FeedScope,
        terms: &HashMap<TopicId, String>,
    ) -> FeedOutcome {
        if !key.auth.is_authenticated() {
            self.clear(key);
            return FeedOutcome::Skipped;
        }

        let ticket = {
            let mut state = write(&self.state);
            let ticket = self.loads.issue();
            *write(&self.active) = Some(key.clone());
            state.loading = true;
            state.error = None;
            ticket
        };
        debug!(ticket, ?key, "feed load issued");

        let query = ContentQuery::page(scope.topic_filter(), self.page_size, 0);
        let result = backend.list_contents(&query).await;
        self.commit(ticket, result, &scope, terms, Commit::Replace)
    }

    /// Fetch the next page for `key` and append it.
    ///
    /// Skipped while a load is in flight, when the last page was short, or
    /// when `key` is no longer the active selection.
    pub async fn load_more(
        &self,
        backend: &dyn Backend,
        key: FeedKey,
        scope: FeedScope,
        terms: &HashMap<TopicId, String>,
    ) -> FeedOutcome {
        let (ticket, offset) = {
            let mut state = write(&self.state);
            let is_active = read(&self.active).as_ref() == Some(&key);
            if !is_active || !key.auth.is_authenticated() || state.loading || !state.has_more {
                return FeedOutcome::Skipped;
            }
            let ticket = self.loads.issue();
            state.loading = true;
            (ticket, state.next_offset)
        };
        debug!(ticket, offset, "feed page requested");

        let query = ContentQuery::page(scope.topic_filter(), self.page_size, offset);
        let result = backend.list_contents(&query).await;
        self.commit(ticket, result, &scope, terms, Commit::Append)
    }

    fn commit(
        &self,
        ticket: u64,
        result: anyhow::Result<Vec<ContentItem>>,
        scope: &FeedScope,
        terms: &HashMap<TopicId, String>,
        mode: Commit,
    ) -> FeedOutcome {
        let mut state = write(&self.state);
        if !self.loads.is_current(ticket) {
            debug!(ticket, current = self.loads.current(), "discarding stale feed response");
            return FeedOutcome::Stale;
        }
        state.loading = false;

        let raw = match result {
            Ok(raw) => raw,
            Err(err) => {
                let message = err.to_string();
                warn!(error = %message, "feed load failed");
                state.items.clear();
                state.has_more = false;
                state.next_offset = 0;
                state.error = Some(message.clone());
                return FeedOutcome::Failed(message);
            }
        };

        let fetched = raw.len();
        let now = Utc::now();
        let normalized = raw
            .into_iter()
            .filter(|item| scope.admits(item))
            .map(|item| normalize_item(item, terms, now));

        match mode {
            Commit::Replace => {
                state.items = normalized.collect();
                state.next_offset = fetched;
            }
            Commit::Append => {
                let seen: HashSet<ContentId> = state.item_ids().into_iter().collect();
                let fresh: Vec<_> = normalized.filter(|i| !seen.contains(&i.id)).collect();
                state.items.extend(fresh);
                state.next_offset += fetched;
            }
        }
        state.has_more = fetched == self.page_size;
        state.error = None;
        FeedOutcome::Committed {
            count: state.items.len(),
        }
    }
}
