//! Fake NewsRadar API served with axum on an ephemeral port.
//!
//! Follows the real server's rules closely enough to exercise the client:
//! the session cookie decides who is signed in, `/auth/me` hands out the
//! CSRF cookie, and every mutating request must echo it back.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

pub const SESSION: &str = "s3cret";
pub const CSRF: &str = "csrf-tok";

#[derive(Debug, Clone)]
pub struct FakeGroup {
    pub uuid: String,
    pub name: String,
    pub is_public: bool,
    pub default_filters: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct FakeTopic {
    pub uuid: String,
    pub queries: Vec<String>,
    pub group_uuid: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct FakeContent {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub topic_uuid: String,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct FakeExecution {
    pub id: i64,
    pub status: String,
    pub initiator: String,
    pub content_item_id: Option<i64>,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub groups: Vec<FakeGroup>,
    pub topics: Vec<FakeTopic>,
    pub contents: Vec<FakeContent>,
    /// Bookmarked content ids, oldest first.
    pub bookmarks: Vec<i64>,
    pub executions: Vec<FakeExecution>,
    pub logged_out: bool,
    pub magic_links: Vec<String>,
    /// Every request as `"METHOD path?query"`.
    pub requests: Vec<String>,
    /// Answer `GET /contents` with a non-JSON body.
    pub broken_contents: bool,
    /// Answer `GET /topics/groups` with a bare 502.
    pub groups_unavailable: bool,
    next_id: u32,
}

impl FakeState {
    pub fn seeded() -> Self {
        let mut state = FakeState::default();
        state.groups = vec![
            FakeGroup {
                uuid: "g1".into(),
                name: "Energy".into(),
                is_public: false,
                default_filters: None,
            },
            FakeGroup {
                uuid: "g2".into(),
                name: "Climate".into(),
                is_public: true,
                default_filters: None,
            },
        ];
        state.topics = vec![
            FakeTopic {
                uuid: "t1".into(),
                queries: vec!["solar power".into()],
                group_uuid: Some("g1".into()),
                is_active: true,
            },
            FakeTopic {
                uuid: "t2".into(),
                queries: vec!["wind farms".into(), "offshore wind".into()],
                group_uuid: Some("g1".into()),
                is_active: true,
            },
            FakeTopic {
                uuid: "t3".into(),
                queries: vec!["sea level".into()],
                group_uuid: Some("g2".into()),
                is_active: true,
            },
        ];
        state.contents = vec![
            content(101, "t1", "https://www.pv-magazine.com/a", 0.87),
            content(102, "t2", "https://windpower.example.net/b", 42.0),
            content(103, "t3", "not a url", 0.3),
            content(104, "t1", "https://example.com/d", 0.1),
        ];
        state
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-new-{}", prefix, self.next_id)
    }
}

pub fn content(id: i64, topic: &str, url: &str, score: f64) -> FakeContent {
    FakeContent {
        id,
        url: url.to_string(),
        title: format!("Story {}", id),
        topic_uuid: topic.to_string(),
        score,
    }
}

pub type Shared = Arc<Mutex<FakeState>>;

pub struct FakeServer {
    pub base_url: String,
    pub state: Shared,
}

impl FakeServer {
    pub async fn start(state: FakeState) -> Self {
        let shared: Shared = Arc::new(Mutex::new(state));
        let app = router(shared.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        FakeServer {
            base_url: format!("http://{}/api", addr),
            state: shared,
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn requests(&self) -> Vec<String> {
        self.with(|s| s.requests.clone())
    }

    /// TOML for a client of this server.
    pub fn config_toml(&self, signed_in: bool) -> String {
        let mut toml = format!(
            "[api]\nbase_url = \"{}\"\ntimeout_secs = 5\n",
            self.base_url
        );
        if signed_in {
            toml.push_str(&format!("session_token = \"{}\"\n", SESSION));
        }
        toml.push_str("\n[feed]\npage_size = 2\n");
        toml
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/magic-link", post(magic_link))
        .route("/api/topics/groups", get(list_groups).post(create_group))
        .route(
            "/api/topics/groups/{uuid}",
            patch(update_group).delete(delete_group),
        )
        .route("/api/topics", get(list_topics).post(create_topic))
        .route("/api/topics/{uuid}", patch(update_topic).delete(delete_topic))
        .route("/api/topics/{uuid}/sources", get(topic_sources))
        .route("/api/contents", get(list_contents))
        .route(
            "/api/contents/bookmarks",
            get(list_bookmarks).post(create_bookmark),
        )
        .route("/api/contents/bookmarks/{id}", delete(delete_bookmark))
        .route("/api/executions", get(list_executions))
        .route("/api/executions/web-search", post(web_search))
        .with_state(state)
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn signed_in(state: &FakeState, headers: &HeaderMap) -> bool {
    !state.logged_out
        && headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains(&format!("sessionid={}", SESSION)))
}

/// Reject the request unless it is signed in and carries the CSRF token.
fn guard(state: &FakeState, headers: &HeaderMap) -> Result<(), Response> {
    if !signed_in(state, headers) {
        return Err(detail(StatusCode::UNAUTHORIZED, "Authentication required."));
    }
    if headers.get("x-csrftoken").and_then(|v| v.to_str().ok()) != Some(CSRF) {
        return Err(detail(StatusCode::FORBIDDEN, "CSRF Failed: CSRF token missing."));
    }
    Ok(())
}

fn group_json(g: &FakeGroup) -> Value {
    json!({
        "id": 1,
        "uuid": g.uuid,
        "name": g.name,
        "description": "",
        "is_public": g.is_public,
        "default_filters": g.default_filters,
        "created_at": "2025-01-01T00:00:00Z",
        "updated_at": "2025-01-01T00:00:00Z",
    })
}

fn topic_json(state: &FakeState, t: &FakeTopic) -> Value {
    let group_name = t
        .group_uuid
        .as_ref()
        .and_then(|id| state.groups.iter().find(|g| &g.uuid == id))
        .map(|g| g.name.clone());
    json!({
        "id": 1,
        "uuid": t.uuid,
        "queries": t.queries,
        "last_fetched_at": null,
        "content_source_count": 0,
        "is_active": t.is_active,
        "group_uuid": t.group_uuid,
        "group_name": group_name,
    })
}

fn log(state: &mut FakeState, line: String) {
    state.requests.push(line);
}

async fn me(State(s): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = s.lock().unwrap();
    log(&mut state, "GET /auth/me".into());
    let csrf = format!("csrftoken={}; Path=/", CSRF);
    if !signed_in(&state, &headers) {
        let mut response = detail(StatusCode::UNAUTHORIZED, "Authentication required.");
        response
            .headers_mut()
            .insert(header::SET_COOKIE, csrf.parse().unwrap());
        return response;
    }
    (
        [(header::SET_COOKIE, csrf)],
        Json(json!({ "id": 7, "username": "ada", "email": "ada@example.com" })),
    )
        .into_response()
}

async fn logout(State(s): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = s.lock().unwrap();
    log(&mut state, "POST /auth/logout".into());
    if let Err(r) = guard(&state, &headers) {
        return r;
    }
    state.logged_out = true;
    Json(json!({ "logged_out": true })).into_response()
}

#[derive(Deserialize)]
struct MagicLink {
    email: String,
}

async fn magic_link(State(s): State<Shared>, Json(body): Json<MagicLink>) -> Response {
    let mut state = s.lock().unwrap();
    log(&mut state, "POST /auth/magic-link".into());
    if !body.email.contains('@') {
        return detail(StatusCode::BAD_REQUEST, "Enter a valid email address.");
    }
    state.magic_links.push(body.email);
    Json(json!({ "sent": true })).into_response()
}

async fn list_groups(State(s): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = s.lock().unwrap();
    log(&mut state, "GET /topics/groups".into());
    if state.groups_unavailable {
        return StatusCode::BAD_GATEWAY.into_response();
    }
    let all = signed_in(&state, &headers);
    let groups: Vec<Value> = state
        .groups
        .iter()
        .filter(|g| all || g.is_public)
        .map(group_json)
        .collect();
    Json(json!({ "groups": groups })).into_response()
}

#[derive(Deserialize)]
struct GroupBody {
    name: Option<String>,
    is_public: Option<bool>,
    default_filters: Option<Value>,
}

async fn create_group(
    State(s): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<GroupBody>,
) -> Response {
    let mut state = s.lock().unwrap();
    log(&mut state, "POST /topics/groups".into());
    if let Err(r) = guard(&state, &headers) {
        return r;
    }
    let name = body.name.unwrap_or_default();
    if state.groups.iter().any(|g| g.name == name) {
        return detail(StatusCode::BAD_REQUEST, "Group name already exists.");
    }
    let group = FakeGroup {
        uuid: state.fresh_id("g"),
        name,
        is_public: body.is_public.unwrap_or(false),
        default_filters: body.default_filters,
    };
    state.groups.push(group.clone());
    Json(json!({ "group": group_json(&group) })).into_response()
}

async fn update_group(
    State(s): State<Shared>,
    Path(uuid): Path<String>,
    headers: HeaderMap,
    Json(body): Json<GroupBody>,
) -> Response {
    let mut state = s.lock().unwrap();
    log(&mut state, format!("PATCH /topics/groups/{}", uuid));
    if let Err(r) = guard(&state, &headers) {
        return r;
    }
    let Some(group) = state.groups.iter_mut().find(|g| g.uuid == uuid) else {
        return detail(StatusCode::NOT_FOUND, "Topic group not found for UUID.");
    };
    if let Some(name) = body.name {
        group.name = name;
    }
    if let Some(public) = body.is_public {
        group.is_public = public;
    }
    if body.default_filters.is_some() {
        group.default_filters = body.default_filters;
    }
    Json(group_json(group)).into_response()
}

async fn delete_group(
    State(s): State<Shared>,
    Path(uuid): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mut state = s.lock().unwrap();
    log(&mut state, format!("DELETE /topics/groups/{}", uuid));
    if let Err(r) = guard(&state, &headers) {
        return r;
    }
    let before = state.groups.len();
    state.groups.retain(|g| g.uuid != uuid);
    if state.groups.len() == before {
        return detail(StatusCode::NOT_FOUND, "Topic group not found for UUID.");
    }
    for topic in state.topics.iter_mut() {
        if topic.group_uuid.as_deref() == Some(uuid.as_str()) {
            topic.group_uuid = None;
        }
    }
    StatusCode::NO_CONTENT.into_response()
}

#[derive(Deserialize)]
struct TopicParams {
    group_uuid: Option<String>,
    search: Option<String>,
}

async fn list_topics(
    State(s): State<Shared>,
    Query(params): Query<TopicParams>,
    headers: HeaderMap,
) -> Response {
    let mut state = s.lock().unwrap();
    let mut line = format!(
        "GET /topics?group_uuid={}",
        params.group_uuid.as_deref().unwrap_or("")
    );
    if let Some(search) = &params.search {
        line.push_str(&format!("&search={}", search));
    }
    log(&mut state, line);
    let all = signed_in(&state, &headers);
    if !all && params.group_uuid.is_none() {
        return detail(StatusCode::UNAUTHORIZED, "Authentication required.");
    }
    let topics: Vec<Value> = state
        .topics
        .iter()
        .filter(|t| params.group_uuid.is_none() || t.group_uuid == params.group_uuid)
        .filter(|t| all || t.is_active)
        .filter(|t| params.search.as_ref().map_or(true, |q| t.queries.contains(q)))
        .map(|t| topic_json(&state, t))
        .collect();
    Json(json!({ "topics": topics })).into_response()
}

#[derive(Deserialize)]
struct TopicBody {
    queries: Option<Vec<String>>,
    group_uuid: Option<String>,
    is_active: Option<bool>,
}

async fn create_topic(
    State(s): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<TopicBody>,
) -> Response {
    let mut state = s.lock().unwrap();
    log(&mut state, "POST /topics".into());
    if let Err(r) = guard(&state, &headers) {
        return r;
    }
    let topic = FakeTopic {
        uuid: state.fresh_id("t"),
        queries: body.queries.unwrap_or_default(),
        group_uuid: body.group_uuid,
        is_active: true,
    };
    state.topics.push(topic.clone());
    let record = topic_json(&state, &topic);
    Json(json!({ "topic": record })).into_response()
}

async fn update_topic(
    State(s): State<Shared>,
    Path(uuid): Path<String>,
    headers: HeaderMap,
    Json(body): Json<TopicBody>,
) -> Response {
    let mut state = s.lock().unwrap();
    log(&mut state, format!("PATCH /topics/{}", uuid));
    if let Err(r) = guard(&state, &headers) {
        return r;
    }
    let Some(index) = state.topics.iter().position(|t| t.uuid == uuid) else {
        return detail(StatusCode::NOT_FOUND, "Topic not found for UUID.");
    };
    if let Some(active) = body.is_active {
        state.topics[index].is_active = active;
    }
    if let Some(queries) = body.queries {
        state.topics[index].queries = queries;
    }
    let record = topic_json(&state, &state.topics[index]);
    Json(record).into_response()
}

async fn delete_topic(
    State(s): State<Shared>,
    Path(uuid): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mut state = s.lock().unwrap();
    log(&mut state, format!("DELETE /topics/{}", uuid));
    if let Err(r) = guard(&state, &headers) {
        return r;
    }
    let before = state.topics.len();
    state.topics.retain(|t| t.uuid != uuid);
    if state.topics.len() == before {
        return detail(StatusCode::NOT_FOUND, "Topic not found for UUID.");
    }
    StatusCode::NO_CONTENT.into_response()
}

#[derive(Deserialize)]
struct ContentParams {
    topic_uuid: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

async fn list_contents(
    State(s): State<Shared>,
    Query(params): Query<ContentParams>,
    headers: HeaderMap,
) -> Response {
    let mut state = s.lock().unwrap();
    log(
        &mut state,
        format!(
            "GET /contents?topic_uuid={}&limit={}&offset={}",
            params.topic_uuid.as_deref().unwrap_or(""),
            params.limit.unwrap_or(0),
            params.offset.unwrap_or(0)
        ),
    );
    if !signed_in(&state, &headers) {
        return detail(StatusCode::UNAUTHORIZED, "Authentication required.");
    }
    if state.broken_contents {
        return (StatusCode::OK, "<html>maintenance</html>").into_response();
    }
    let items: Vec<Value> = state
        .contents
        .iter()
        .filter(|c| params.topic_uuid.is_none() || Some(&c.topic_uuid) == params.topic_uuid.as_ref())
        .skip(params.offset.unwrap_or(0))
        .take(params.limit.unwrap_or(50))
        .map(|c| {
            json!({
                "id": c.id,
                "url": c.url,
                "title": c.title,
                "summary": "",
                "source": if c.url.starts_with("http") { Value::Null } else { json!("Reuters") },
                "published_at": "2025-03-04T05:06:07Z",
                "created_at": null,
                "topic_uuid": c.topic_uuid,
                "relevance_score": c.score,
                "is_bookmarked": state.bookmarks.contains(&c.id),
            })
        })
        .collect();
    Json(json!({ "items": items })).into_response()
}

#[derive(Deserialize)]
struct BookmarkBody {
    content_id: i64,
}

async fn create_bookmark(
    State(s): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<BookmarkBody>,
) -> Response {
    let mut state = s.lock().unwrap();
    log(&mut state, "POST /contents/bookmarks".into());
    if let Err(r) = guard(&state, &headers) {
        return r;
    }
    if !state.contents.iter().any(|c| c.id == body.content_id) {
        return detail(StatusCode::NOT_FOUND, "Content not found for user.");
    }
    if !state.bookmarks.contains(&body.content_id) {
        state.bookmarks.push(body.content_id);
    }
    Json(json!({ "created": true })).into_response()
}

async fn delete_bookmark(
    State(s): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    let mut state = s.lock().unwrap();
    log(&mut state, format!("DELETE /contents/bookmarks/{}", id));
    if let Err(r) = guard(&state, &headers) {
        return r;
    }
    let before = state.bookmarks.len();
    state.bookmarks.retain(|b| *b != id);
    if state.bookmarks.len() == before {
        return detail(StatusCode::NOT_FOUND, "Bookmark not found.");
    }
    Json(json!({ "deleted": true })).into_response()
}

async fn list_bookmarks(State(s): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = s.lock().unwrap();
    log(&mut state, "GET /contents/bookmarks".into());
    if !signed_in(&state, &headers) {
        return detail(StatusCode::UNAUTHORIZED, "Authentication required.");
    }
    let bookmarks: Vec<Value> = state
        .bookmarks
        .iter()
        .enumerate()
        .rev()
        .filter_map(|(n, id)| {
            let c = state.contents.iter().find(|c| c.id == *id)?;
            let queries = state
                .topics
                .iter()
                .find(|t| t.uuid == c.topic_uuid)
                .map(|t| t.queries.clone())
                .unwrap_or_default();
            Some(json!({
                "id": n + 1,
                "content_id": c.id,
                "url": c.url,
                "title": c.title,
                "created_at": format!("2025-03-{:02}T08:00:00Z", n + 1),
                "topic_uuid": c.topic_uuid,
                "topic_queries": queries,
            }))
        })
        .collect();
    Json(json!({ "bookmarks": bookmarks })).into_response()
}

async fn topic_sources(
    State(s): State<Shared>,
    Path(uuid): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mut state = s.lock().unwrap();
    log(&mut state, format!("GET /topics/{}/sources", uuid));
    if !signed_in(&state, &headers) {
        return detail(StatusCode::UNAUTHORIZED, "Authentication required.");
    }
    let Some(topic) = state.topics.iter().find(|t| t.uuid == uuid) else {
        return detail(StatusCode::NOT_FOUND, "Topic not found for UUID.");
    };
    let mut urls: Vec<&str> = state
        .contents
        .iter()
        .filter(|c| c.topic_uuid == uuid)
        .map(|c| c.url.as_str())
        .collect();
    urls.sort();
    urls.dedup();
    let sources: Vec<Value> = urls
        .into_iter()
        .map(|url| {
            let matching: Vec<_> = state
                .contents
                .iter()
                .filter(|c| c.topic_uuid == uuid && c.url == url)
                .collect();
            let latest = matching.iter().max_by_key(|c| c.id).map(|c| (c.id, c.title.clone()));
            let (id, title) = latest.unwrap_or_default();
            json!({
                "id": id,
                "url": url,
                "title": title,
                "content_item_count": matching.len(),
                "last_seen": "2025-03-04T05:06:07Z",
            })
        })
        .collect();
    Json(json!({ "topic_uuid": uuid, "queries": topic.queries, "sources": sources }))
        .into_response()
}

const STATUSES: [&str; 3] = ["running", "completed", "failed"];
const INITIATORS: [&str; 4] = ["periodic", "user", "admin", "cli"];

#[derive(Deserialize)]
struct ExecutionParams {
    status: Option<String>,
    initiator: Option<String>,
}

async fn list_executions(
    State(s): State<Shared>,
    Query(params): Query<ExecutionParams>,
    headers: HeaderMap,
) -> Response {
    let mut state = s.lock().unwrap();
    log(
        &mut state,
        format!(
            "GET /executions?status={}&initiator={}",
            params.status.as_deref().unwrap_or(""),
            params.initiator.as_deref().unwrap_or("")
        ),
    );
    if !signed_in(&state, &headers) {
        return detail(StatusCode::UNAUTHORIZED, "Authentication required.");
    }
    if let Some(status) = &params.status {
        if !STATUSES.contains(&status.as_str()) {
            return detail(StatusCode::BAD_REQUEST, "Invalid status.");
        }
    }
    if let Some(initiator) = &params.initiator {
        if !INITIATORS.contains(&initiator.as_str()) {
            return detail(StatusCode::BAD_REQUEST, "Invalid initiator.");
        }
    }
    let executions: Vec<Value> = state
        .executions
        .iter()
        .rev()
        .filter(|e| params.status.as_ref().map_or(true, |s| &e.status == s))
        .filter(|e| params.initiator.as_ref().map_or(true, |i| &e.initiator == i))
        .map(|e| {
            json!({
                "id": e.id,
                "status": e.status,
                "initiator": e.initiator,
                "created_at": "2025-03-04T09:00:00Z",
                "content_item_id": e.content_item_id,
                "error_message": null,
            })
        })
        .collect();
    Json(json!({ "executions": executions })).into_response()
}

#[derive(Deserialize)]
struct WebSearchBody {
    topic_uuid: String,
    initiator: Option<String>,
}

async fn web_search(
    State(s): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<WebSearchBody>,
) -> Response {
    let mut state = s.lock().unwrap();
    log(&mut state, "POST /executions/web-search".into());
    if let Err(r) = guard(&state, &headers) {
        return r;
    }
    let initiator = body.initiator.unwrap_or_else(|| "user".to_string());
    if !INITIATORS.contains(&initiator.as_str()) {
        return detail(StatusCode::BAD_REQUEST, "Invalid initiator.");
    }
    if !state.topics.iter().any(|t| t.uuid == body.topic_uuid) {
        return detail(StatusCode::NOT_FOUND, "Topic not found for UUID.");
    }
    let execution_id = state.executions.len() as i64 + 1;
    let content_id = state.contents.iter().map(|c| c.id).max().unwrap_or(0) + 1;
    let url = format!("https://search.example.com/{}/{}", body.topic_uuid, execution_id);
    state.contents.push(content(content_id, &body.topic_uuid, &url, 0.5));
    state.executions.push(FakeExecution {
        id: execution_id,
        status: "completed".into(),
        initiator: initiator.clone(),
        content_item_id: Some(content_id),
    });
    Json(json!({
        "execution_id": execution_id,
        "content_item_id": content_id,
        "initiator": initiator,
        "response": { "choices": [] },
    }))
    .into_response()
}
