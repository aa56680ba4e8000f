//! HTTP implementation of the [`Backend`] trait.
//!
//! Talks to the NewsRadar REST API with `reqwest`. Sessions are cookie
//! based: a cookie jar is shared across requests, optionally seeded from
//! `api.session_token`, and every mutating request echoes the CSRF cookie
//! back in the CSRF header.
//!
//! # Errors
//!
//! Any non-2xx response becomes a single message: the body's `detail`
//! string when present, else `"Request failed with status N"`. A 2xx body
//! that does not parse becomes `"Invalid response from server"`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use newsradar_core::backend::{Backend, ContentQuery, ExecutionQuery, TopicQuery};
use newsradar_core::models::{
    Bookmark, ContentId, ContentItem, CurrentUser, Execution, GroupDraft, GroupPatch, Initiator,
    SearchRun, Topic, TopicDraft, TopicGroup, TopicPatch, TopicSources,
};

use crate::config::ApiConfig;
use crate::records::{
    BookmarkBody, BookmarkList, ContentList, ErrorBody, ExecutionList, GroupCreateBody,
    GroupEnvelope, GroupList, GroupRecord, GroupUpdateBody, MagicLinkBody, TopicCreateBody,
    TopicEnvelope, TopicList, TopicRecord, TopicSourcesRecord, TopicUpdateBody, UserRecord,
    WebSearchBody, WebSearchRecord,
};

pub const INVALID_RESPONSE: &str = "Invalid response from server";

pub struct HttpBackend {
    client: reqwest::Client,
    jar: Arc<Jar>,
    base: Url,
    csrf_cookie: String,
    csrf_header: String,
}

impl HttpBackend {
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let mut base = Url::parse(&api.base_url)
            .with_context(|| format!("Invalid api.base_url: {}", api.base_url))?;
        // `Url::join` drops the last path segment unless it ends with '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let jar = Arc::new(Jar::default());
        if let Some(token) = &api.session_token {
            jar.add_cookie_str(&format!("{}={}; Path=/", api.session_cookie, token), &base);
        }

        let client = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            jar,
            base,
            csrf_cookie: api.csrf_cookie.clone(),
            csrf_header: api.csrf_header.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("Invalid request path: {}", path))
    }

    /// Current value of the CSRF cookie, if the backend has set one.
    fn csrf_token(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base)?;
        let cookies = header.to_str().ok()?;
        cookies
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.csrf_cookie)
            .map(|(_, value)| value.to_string())
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<reqwest::Response> {
        debug!(%method, %url, "backend request");
        let mutating = method != Method::GET;
        let mut request = self.client.request(method, url);
        if mutating {
            if let Some(token) = self.csrf_token() {
                request = request.header(self.csrf_header.as_str(), token);
            }
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("Request failed: {}", e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .as_ref()
            .and_then(ErrorBody::message)
        {
            Some(detail) => bail!("{}", detail),
            None => bail!("Request failed with status {}", status.as_u16()),
        }
    }

    async fn json<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        response.json::<T>().await.map_err(|e| {
            debug!(error = %e, "unparseable response body");
            anyhow!(INVALID_RESPONSE)
        })
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.send::<()>(Method::GET, url, None).await?;
        self.json(response).await
    }

    async fn call<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(method, self.url(path)?, Some(body)).await?;
        self.json(response).await
    }

    /// Send a request whose response body is ignored.
    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<()> {
        self.send(method, self.url(path)?, body).await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn current_user(&self) -> Result<CurrentUser> {
        let user: UserRecord = self.get(self.url("auth/me")?).await?;
        Ok(user.into())
    }

    async fn logout(&self) -> Result<()> {
        self.execute::<()>(Method::POST, "auth/logout", None).await
    }

    async fn request_magic_link(&self, email: &str, redirect_url: Option<&str>) -> Result<()> {
        let body = MagicLinkBody {
            email: email.to_string(),
            redirect_url: redirect_url.map(str::to_string),
        };
        self.execute(Method::POST, "auth/magic-link", Some(&body))
            .await
    }

    async fn list_groups(&self) -> Result<Vec<TopicGroup>> {
        let list: GroupList = self.get(self.url("topics/groups")?).await?;
        Ok(list.groups.into_iter().map(Into::into).collect())
    }

    async fn create_group(&self, draft: &GroupDraft) -> Result<TopicGroup> {
        let envelope: GroupEnvelope = self
            .call(Method::POST, "topics/groups", &GroupCreateBody::from(draft))
            .await?;
        Ok(envelope.group.into())
    }

    async fn update_group(&self, id: &str, patch: &GroupPatch) -> Result<TopicGroup> {
        let record: GroupRecord = self
            .call(
                Method::PATCH,
                &format!("topics/groups/{}", id),
                &GroupUpdateBody::from(patch),
            )
            .await?;
        Ok(record.into())
    }

    async fn delete_group(&self, id: &str) -> Result<()> {
        self.execute::<()>(Method::DELETE, &format!("topics/groups/{}", id), None)
            .await
    }

    async fn list_topics(&self, query: &TopicQuery) -> Result<Vec<Topic>> {
        let mut url = self.url("topics")?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(search) = &query.search {
                pairs.append_pair("search", search);
            }
            if let Some(group_id) = &query.group_id {
                pairs.append_pair("group_uuid", group_id);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        let list: TopicList = self.get(url).await?;
        Ok(list.topics.into_iter().map(Into::into).collect())
    }

    async fn create_topic(&self, draft: &TopicDraft) -> Result<Topic> {
        let envelope: TopicEnvelope = self
            .call(Method::POST, "topics", &TopicCreateBody::from(draft))
            .await?;
        Ok(envelope.topic.into())
    }

    async fn update_topic(&self, id: &str, patch: &TopicPatch) -> Result<Topic> {
        let record: TopicRecord = self
            .call(
                Method::PATCH,
                &format!("topics/{}", id),
                &TopicUpdateBody::from(patch),
            )
            .await?;
        Ok(record.into())
    }

    async fn delete_topic(&self, id: &str) -> Result<()> {
        self.execute::<()>(Method::DELETE, &format!("topics/{}", id), None)
            .await
    }

    async fn list_topic_sources(&self, topic_id: &str) -> Result<TopicSources> {
        let record: TopicSourcesRecord = self
            .get(self.url(&format!("topics/{}/sources", topic_id))?)
            .await?;
        Ok(record.into())
    }

    async fn list_contents(&self, query: &ContentQuery) -> Result<Vec<ContentItem>> {
        let mut url = self.url("contents")?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(topic_id) = &query.topic_id {
                pairs.append_pair("topic_uuid", topic_id);
            }
            pairs.append_pair("limit", &query.limit.to_string());
            pairs.append_pair("offset", &query.offset.to_string());
        }
        let list: ContentList = self.get(url).await?;
        Ok(list.items.into_iter().map(Into::into).collect())
    }

    async fn create_bookmark(&self, content_id: ContentId) -> Result<()> {
        self.execute(
            Method::POST,
            "contents/bookmarks",
            Some(&BookmarkBody { content_id }),
        )
        .await
    }

    async fn delete_bookmark(&self, content_id: ContentId) -> Result<()> {
        self.execute::<()>(
            Method::DELETE,
            &format!("contents/bookmarks/{}", content_id),
            None,
        )
        .await
    }

    async fn list_bookmarks(&self) -> Result<Vec<Bookmark>> {
        let list: BookmarkList = self.get(self.url("contents/bookmarks")?).await?;
        Ok(list.bookmarks.into_iter().map(Into::into).collect())
    }

    async fn list_executions(&self, query: &ExecutionQuery) -> Result<Vec<Execution>> {
        let mut url = self.url("executions")?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(status) = query.status {
                pairs.append_pair("status", status.as_str());
            }
            if let Some(initiator) = query.initiator {
                pairs.append_pair("initiator", initiator.as_str());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        let list: ExecutionList = self.get(url).await?;
        Ok(list.executions.into_iter().map(Into::into).collect())
    }

    async fn run_web_search(&self, topic_id: &str, initiator: Initiator) -> Result<SearchRun> {
        let body = WebSearchBody {
            topic_uuid: topic_id.to_string(),
            initiator,
        };
        let record: WebSearchRecord = self
            .call(Method::POST, "executions/web-search", &body)
            .await?;
        Ok(record.into())
    }
}
