//! Dashboard: wires the stores into one data flow.
//!
//! ```text
//! SessionGate ──▶ GroupStore (repair) ──▶ TopicStore (load) ──▶ FeedLoader ──▶ MutationController
//! ```
//!
//! Every state change runs left to right: a selection or auth change first
//! repairs the group selection synchronously, then reloads the topics the
//! new selection needs, then reloads the feed. The feed is retargeted at the
//! new selection as soon as it changes, so a response still in flight for
//! the old selection is never committed, even if a later step fails.
//! Observers are notified after each step that changed something.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::backend::{Backend, ExecutionQuery, TopicQuery};
use crate::error::{CoreError, CoreResult};
use crate::feed::{FeedKey, FeedLoader, FeedOutcome, FeedScope, FeedState};
use crate::groups::GroupStore;
use crate::models::{
    AuthStatus, Bookmark, ContentId, CurrentUser, EditingTarget, Execution, GroupDraft,
    GroupPatch, Initiator, SearchRun, Selection, Topic, TopicDraft, TopicGroup, TopicId,
    TopicPatch, TopicSources, ViewMode,
};
use crate::topics::normalize_queries;
use crate::mutation::MutationController;
use crate::observer::{Observers, StoreEvent, StoreObserver};
use crate::session::SessionGate;
use crate::topics::TopicStore;

/// Everything a frontend renders, captured at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub auth: AuthStatus,
    pub user: Option<CurrentUser>,
    pub groups: Vec<TopicGroup>,
    pub group_name: String,
    pub selection: Selection,
    pub view_mode: ViewMode,
    /// Topics visible under the current group selection.
    pub topics: Vec<Topic>,
    pub feed: FeedState,
}

pub struct Dashboard {
    backend: Arc<dyn Backend>,
    session: SessionGate,
    groups: GroupStore,
    topics: TopicStore,
    feed: FeedLoader,
    mutations: MutationController,
    observers: Observers,
}

impl Dashboard {
    pub fn new(backend: Arc<dyn Backend>, page_size: usize) -> Self {
        Self {
            backend,
            session: SessionGate::new(),
            groups: GroupStore::new(),
            topics: TopicStore::new(),
            feed: FeedLoader::new(page_size),
            mutations: MutationController::new(),
            observers: Observers::new(),
        }
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn session(&self) -> &SessionGate {
        &self.session
    }

    pub fn groups(&self) -> &GroupStore {
        &self.groups
    }

    pub fn topics(&self) -> &TopicStore {
        &self.topics
    }

    pub fn feed(&self) -> &FeedLoader {
        &self.feed
    }

    pub fn subscribe(&self, observer: Arc<dyn StoreObserver>) {
        self.observers.subscribe(observer);
    }

    pub fn auth(&self) -> AuthStatus {
        self.session.status()
    }

    pub fn selection(&self) -> Selection {
        self.groups.selection()
    }

    /// Topics visible under the current group selection.
    pub fn filtered_topics(&self) -> Vec<Topic> {
        let group_id = self.groups.selected_group_id();
        self.topics.filtered_topics(group_id.as_deref(), self.auth())
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let auth = self.auth();
        let groups = self.groups.snapshot();
        let topics = self
            .topics
            .filtered_topics(groups.selection.group_id.as_deref(), auth);
        DashboardSnapshot {
            auth,
            user: self.session.current_user(),
            group_name: self.groups.selected_group_name(auth),
            view_mode: groups.selection.view_mode(),
            groups: groups.groups,
            selection: groups.selection,
            topics,
            feed: self.feed.snapshot(),
        }
    }

    /// Re-check the session. Returns `true` if the auth status changed;
    /// callers follow up with [`sync`](Self::sync).
    pub async fn refresh_session(&self) -> bool {
        let changed = self.session.refresh(self.backend()).await;
        if changed {
            self.observers.notify(StoreEvent::AuthChanged(self.auth()));
            self.retarget_feed();
        }
        changed
    }

    /// Reload groups, repair the selection, then reload topics and the feed.
    pub async fn sync(&self) -> CoreResult<FeedOutcome> {
        let auth = self.auth();
        let before = self.selection();
        self.groups.reload(self.backend(), auth).await?;
        self.observers.notify(StoreEvent::GroupsChanged);
        self.notify_if_moved(&before);

        self.load_topics().await?;
        Ok(self.reload_feed().await)
    }

    /// Select a group (or none), then reload what depends on it.
    pub async fn select_group(&self, group_id: Option<&str>) -> CoreResult<FeedOutcome> {
        let auth = self.auth();
        if !self.groups.select_group(group_id, auth)? {
            return Ok(FeedOutcome::Skipped);
        }
        self.selection_changed();
        if !auth.is_authenticated() {
            self.load_topics().await?;
        }
        Ok(self.reload_feed().await)
    }

    /// Select a topic from the current group's visible topics.
    pub async fn select_topic(&self, topic_id: Option<&str>) -> CoreResult<FeedOutcome> {
        if let Some(id) = topic_id {
            if !self.filtered_topics().iter().any(|t| t.id == id) {
                return Err(CoreError::not_found("topic", id));
            }
        }
        if !self.groups.select_topic(topic_id.map(str::to_string)) {
            return Ok(FeedOutcome::Skipped);
        }
        self.selection_changed();
        Ok(self.reload_feed().await)
    }

    /// Focus a content item in the current feed.
    pub fn select_item(&self, item_id: Option<ContentId>) -> CoreResult<()> {
        if let Some(id) = item_id {
            if self.feed.item(id).is_none() {
                return Err(CoreError::not_found("content item", id));
            }
        }
        if self.groups.select_item(item_id) {
            self.selection_changed();
        }
        Ok(())
    }

    pub fn begin_edit(&self, target: EditingTarget) {
        self.groups.begin_edit(target);
        self.selection_changed();
    }

    pub fn end_edit(&self) {
        self.groups.end_edit();
        self.selection_changed();
    }

    /// Create a group and select it.
    pub async fn create_group(&self, draft: &GroupDraft) -> CoreResult<TopicGroup> {
        let group = self.groups.create_group(self.backend(), draft).await?;
        self.observers.notify(StoreEvent::GroupsChanged);
        self.selection_changed();
        self.reload_feed().await;
        Ok(group)
    }

    pub async fn edit_group(&self, id: &str, patch: &GroupPatch) -> CoreResult<TopicGroup> {
        let group = self.groups.edit_group(self.backend(), id, patch).await?;
        self.observers.notify(StoreEvent::GroupsChanged);
        Ok(group)
    }

    /// Delete a group, then resync so repair picks the next selection.
    pub async fn delete_group(&self, id: &str) -> CoreResult<FeedOutcome> {
        self.backend()
            .delete_group(id)
            .await
            .map_err(CoreError::backend)?;
        debug!(id, "group deleted");
        self.sync().await
    }

    /// Create a topic. A topic added to the group whose whole feed is on
    /// screen widens that feed's scope, so the feed is reloaded.
    pub async fn create_topic(&self, draft: &TopicDraft) -> CoreResult<Topic> {
        let topic = self.topics.create_topic(self.backend(), draft).await?;
        self.observers.notify(StoreEvent::TopicsChanged);
        let selection = self.selection();
        if selection.editing == EditingTarget::NewTopic {
            self.end_edit();
        }
        if selection.topic_id.is_none()
            && selection.group_id.is_some()
            && topic.group_id == selection.group_id
        {
            self.reload_feed().await;
        }
        Ok(topic)
    }

    pub async fn update_topic(&self, id: &str, patch: &TopicPatch) -> CoreResult<Topic> {
        let topic = self.topics.update_topic(self.backend(), id, patch).await?;
        self.observers.notify(StoreEvent::TopicsChanged);
        Ok(topic)
    }

    /// Delete a topic; a selection pointing at it is cleared and the feed
    /// reloaded.
    pub async fn delete_topic(&self, id: &str) -> CoreResult<()> {
        self.topics.delete_topic(self.backend(), id).await?;
        self.observers.notify(StoreEvent::TopicsChanged);
        if self.selection().editing == EditingTarget::Topic(id.to_string()) {
            self.groups.end_edit();
        }
        if self.reconcile_topic() {
            self.selection_changed();
            self.reload_feed().await;
        }
        Ok(())
    }

    /// Load the first feed page for the current selection.
    pub async fn reload_feed(&self) -> FeedOutcome {
        let (key, scope) = self.feed_request();
        let terms = self.topics.terms();
        let outcome = self.feed.load(self.backend(), key, scope, &terms).await;
        self.after_feed(&outcome);
        outcome
    }

    /// Append the next feed page for the current selection.
    pub async fn load_more(&self) -> FeedOutcome {
        let (key, scope) = self.feed_request();
        let terms = self.topics.terms();
        let outcome = self
            .feed
            .load_more(self.backend(), key, scope, &terms)
            .await;
        self.after_feed(&outcome);
        outcome
    }

    /// Optimistically toggle an item's bookmark.
    pub async fn toggle_bookmark(&self, item_id: ContentId) -> CoreResult<bool> {
        let result = self
            .mutations
            .toggle_bookmark(self.backend(), &self.feed, item_id)
            .await;
        if !matches!(result, Err(CoreError::NotFound { .. })) {
            self.observers.notify(StoreEvent::FeedChanged);
        }
        result
    }

    /// Sign out. The private feed is dropped before the resync starts.
    pub async fn logout(&self) -> CoreResult<FeedOutcome> {
        if self.session.logout(self.backend()).await? {
            self.observers.notify(StoreEvent::AuthChanged(self.auth()));
            self.retarget_feed();
        }
        self.sync().await
    }

    pub async fn request_magic_link(&self, email: &str, redirect_url: Option<&str>) -> CoreResult<()> {
        self.session
            .request_magic_link(self.backend(), email, redirect_url)
            .await
    }

    /// Search topics by query text within the current group.
    ///
    /// The term is normalized like topic queries and matched whole against
    /// each topic's queries by the backend. Results do not replace the
    /// cached topic list.
    pub async fn search_topics(&self, term: &str) -> CoreResult<Vec<Topic>> {
        let Some(search) = normalize_queries(&[term.to_string()]).pop() else {
            return Err(CoreError::validation("Search text cannot be empty."));
        };
        let group_id = self.groups.selected_group_id();
        if !self.auth().is_authenticated() && group_id.is_none() {
            return Ok(Vec::new());
        }
        let query = TopicQuery {
            search: Some(search),
            group_id,
        };
        self.backend()
            .list_topics(&query)
            .await
            .map_err(CoreError::backend)
    }

    /// The signed-in user's bookmarks.
    pub async fn bookmarks(&self) -> CoreResult<Vec<Bookmark>> {
        self.require_sign_in()?;
        self.backend()
            .list_bookmarks()
            .await
            .map_err(CoreError::backend)
    }

    /// Search run history for the signed-in user's topics.
    pub async fn executions(&self, query: &ExecutionQuery) -> CoreResult<Vec<Execution>> {
        self.require_sign_in()?;
        self.backend()
            .list_executions(query)
            .await
            .map_err(CoreError::backend)
    }

    /// Aggregated content sources of one of the user's topics.
    pub async fn topic_sources(&self, topic_id: &str) -> CoreResult<TopicSources> {
        self.require_sign_in()?;
        self.backend()
            .list_topic_sources(topic_id)
            .await
            .map_err(CoreError::backend)
    }

    /// Run a web search for a topic now, then reload topics and the feed so
    /// the new content and fetch time show up.
    pub async fn run_topic(&self, topic_id: &str, initiator: Initiator) -> CoreResult<SearchRun> {
        self.require_sign_in()?;
        if self.topics.get(topic_id).is_none() {
            return Err(CoreError::not_found("topic", topic_id));
        }
        let run = self
            .backend()
            .run_web_search(topic_id, initiator)
            .await
            .map_err(CoreError::backend)?;
        debug!(topic_id, execution_id = run.execution_id, "web search finished");
        self.load_topics().await?;
        self.reload_feed().await;
        Ok(run)
    }

    fn require_sign_in(&self) -> CoreResult<()> {
        if self.auth().is_authenticated() {
            Ok(())
        } else {
            Err(CoreError::validation("Authentication required."))
        }
    }

    /// Load the topics the current selection needs.
    ///
    /// Signed-in users get every topic; anonymous browsing is limited to the
    /// selected public group, and with no group there is nothing to load.
    async fn load_topics(&self) -> CoreResult<()> {
        let auth = self.auth();
        let group_id = self.groups.selected_group_id();
        match (auth, group_id) {
            (AuthStatus::Authenticated, _) => {
                self.topics
                    .reload(self.backend(), &TopicQuery::default())
                    .await?;
            }
            (AuthStatus::Anonymous, Some(group_id)) => {
                let query = TopicQuery {
                    group_id: Some(group_id),
                    ..Default::default()
                };
                self.topics.reload(self.backend(), &query).await?;
            }
            _ => self.topics.clear(),
        }
        self.observers.notify(StoreEvent::TopicsChanged);
        if self.reconcile_topic() {
            self.selection_changed();
        }
        Ok(())
    }

    fn reconcile_topic(&self) -> bool {
        let visible: Vec<TopicId> = self.filtered_topics().into_iter().map(|t| t.id).collect();
        self.groups.reconcile_topic(&visible)
    }

    fn feed_request(&self) -> (FeedKey, FeedScope) {
        let key = FeedKey::from_selection(&self.selection(), self.auth());
        let group_topics = self.filtered_topics().into_iter().map(|t| t.id);
        let scope = FeedScope::for_key(&key, group_topics);
        (key, scope)
    }

    fn after_feed(&self, outcome: &FeedOutcome) {
        if *outcome == FeedOutcome::Stale {
            return;
        }
        self.observers.notify(StoreEvent::FeedChanged);
        if self.groups.reconcile_item(&self.feed.item_ids()) {
            self.selection_changed();
        }
    }

    fn notify_if_moved(&self, before: &Selection) {
        if self.selection() != *before {
            self.selection_changed();
        }
    }

    fn selection_changed(&self) {
        self.observers
            .notify(StoreEvent::SelectionChanged(self.selection()));
        self.retarget_feed();
    }

    /// Supersede feed loads issued for any other selection or auth status.
    fn retarget_feed(&self) {
        let key = FeedKey::from_selection(&self.selection(), self.auth());
        if self.feed.retarget(key) {
            self.observers.notify(StoreEvent::FeedChanged);
        }
    }
}
