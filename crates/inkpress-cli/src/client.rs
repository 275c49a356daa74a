use futures_util::{Stream, StreamExt, stream};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::sse::SseParser;
use crate::types::{
    AuthUser, BookmarkStatus, Category, Comment, LikeToggle, NewPost, Page, Post, PostAnalytics,
    PostDetail, PostSummary, Profile, RelatedPost, SearchRequest, Session, ShareLink,
    SignUpResponse, Tag, ViewCount, VoteDirection, VoteResult,
};

pub const API_KEY_HEADER: &str = "apikey";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("You must be logged in")]
    NotSignedIn,
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Typed handle on the service API. Cheap to clone; the underlying connection
/// pool is shared.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base: Url,
    api_key: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(mut base: Url, api_key: impl Into<String>) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self {
            http: Client::new(),
            base,
            api_key: api_key.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(&format!("api/v1/{}", path.trim_start_matches('/')))?)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> Result<RequestBuilder> {
        let mut builder = self
            .http
            .request(method, self.url(path)?)
            .header(API_KEY_HEADER, &self.api_key);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    fn get(&self, path: &str) -> Result<RequestBuilder> {
        self.request(reqwest::Method::GET, path)
    }

    fn post(&self, path: &str) -> Result<RequestBuilder> {
        self.request(reqwest::Method::POST, path)
    }

    fn put(&self, path: &str) -> Result<RequestBuilder> {
        self.request(reqwest::Method::PUT, path)
    }

    fn delete(&self, path: &str) -> Result<RequestBuilder> {
        self.request(reqwest::Method::DELETE, path)
    }

    fn require_token(&self) -> Result<&str> {
        self.token.as_deref().ok_or(ClientError::NotSignedIn)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["error"].as_str().map(str::to_string))
            .unwrap_or(body);
        warn!(%status, %message, "Request rejected");
        Err(ClientError::Api { status, message })
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
        let response = Self::check(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn send_empty(builder: RequestBuilder) -> Result<()> {
        Self::check(builder.send().await?).await?;
        Ok(())
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        builder: RequestBuilder,
        body: &B,
    ) -> Result<T> {
        Self::send(builder.json(body)).await
    }

    // Auth

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResponse> {
        let body = json!({ "email": email, "password": password });
        Self::send_json(self.post("auth/signup")?, &body).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let body = json!({ "email": email, "password": password });
        Self::send_json(self.post("auth/signin")?, &body).await
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.require_token()?;
        Self::send_empty(self.post("auth/signout")?).await
    }

    pub async fn current_user(&self) -> Result<AuthUser> {
        self.require_token()?;
        Self::send(self.get("auth/user")?).await
    }

    // Posts

    pub async fn list_posts(
        &self,
        page: u32,
        limit: u32,
        search: Option<&str>,
    ) -> Result<Page<PostSummary>> {
        let mut builder = self
            .get("posts")?
            .query(&[("page", page), ("limit", limit)]);
        if let Some(search) = search {
            builder = builder.query(&[("search", search)]);
        }
        Self::send(builder).await
    }

    pub async fn get_post(&self, id: i32) -> Result<PostDetail> {
        Self::send(self.get(&format!("posts/{id}"))?).await
    }

    pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
        Self::send_json(self.post("posts")?, post).await
    }

    pub async fn update_post(&self, id: i32, title: &str, content: &str) -> Result<Post> {
        let body = json!({ "title": title, "content": content });
        Self::send_json(self.put(&format!("posts/{id}"))?, &body).await
    }

    pub async fn delete_post(&self, id: i32) -> Result<()> {
        Self::send_empty(self.delete(&format!("posts/{id}"))?).await
    }

    pub async fn increment_views(&self, id: i32) -> Result<i32> {
        let counter: ViewCount = Self::send(self.post(&format!("posts/{id}/views"))?).await?;
        Ok(counter.views)
    }

    pub async fn toggle_like(&self, id: i32) -> Result<LikeToggle> {
        Self::send(self.post(&format!("posts/{id}/like"))?).await
    }

    pub async fn related(&self, id: i32) -> Result<Vec<RelatedPost>> {
        Self::send(self.get(&format!("posts/{id}/related"))?).await
    }

    pub async fn share_link(&self, id: i32, platform: &str, page_url: &str) -> Result<ShareLink> {
        let builder = self
            .get(&format!("posts/{id}/share"))?
            .query(&[("platform", platform), ("url", page_url)]);
        Self::send(builder).await
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<Page<Post>> {
        let mut params: Vec<(&str, String)> = vec![
            ("page", request.page.to_string()),
            ("limit", request.limit.to_string()),
        ];
        if !request.query.trim().is_empty() {
            params.push(("q", request.query.clone()));
        }
        if let Some(category) = request.filters.category {
            params.push(("category", category.to_string()));
        }
        if let Some(tag) = request.filters.tag {
            params.push(("tag", tag.to_string()));
        }
        if let Some(author) = &request.filters.author {
            params.push(("author", author.clone()));
        }
        debug!(?params, "Searching posts");
        Self::send(self.get("search")?.query(&params)).await
    }

    // Comments

    pub async fn comments(&self, post_id: i32) -> Result<Vec<Comment>> {
        Self::send(self.get(&format!("posts/{post_id}/comments"))?).await
    }

    pub async fn add_comment(&self, post_id: i32, content: &str) -> Result<Comment> {
        let body = json!({ "content": content });
        Self::send_json(self.post(&format!("posts/{post_id}/comments"))?, &body).await
    }

    pub async fn replies(&self, comment_id: i32) -> Result<Vec<Comment>> {
        Self::send(self.get(&format!("comments/{comment_id}/replies"))?).await
    }

    pub async fn reply(&self, comment_id: i32, content: &str) -> Result<Comment> {
        let body = json!({ "content": content });
        Self::send_json(self.post(&format!("comments/{comment_id}/replies"))?, &body).await
    }

    pub async fn vote(&self, comment_id: i32, direction: VoteDirection) -> Result<VoteResult> {
        let body = json!({ "direction": direction });
        Self::send_json(self.put(&format!("comments/{comment_id}/vote"))?, &body).await
    }

    /// Comments inserted on `post_id` from now on, as they arrive.
    pub async fn comment_stream(
        &self,
        post_id: i32,
    ) -> Result<impl Stream<Item = Result<Comment>> + Send + 'static> {
        let response = Self::check(
            self.get(&format!("posts/{post_id}/comments/stream"))?
                .send()
                .await?,
        )
        .await?;

        let mut parser = SseParser::new();
        let comments = response.bytes_stream().flat_map(move |chunk| {
            let items: Vec<Result<Comment>> = match chunk {
                Ok(bytes) => parser
                    .push(&bytes)
                    .into_iter()
                    .filter(|event| event.event.as_deref() == Some("comment"))
                    .map(|event| serde_json::from_str(&event.data).map_err(ClientError::from))
                    .collect(),
                Err(err) => vec![Err(ClientError::from(err))],
            };
            stream::iter(items)
        });
        Ok(comments)
    }

    // Bookmarks

    pub async fn bookmark_status(&self, post_id: i32) -> Result<BookmarkStatus> {
        Self::send(self.get(&format!("posts/{post_id}/bookmark"))?).await
    }

    pub async fn bookmark(&self, post_id: i32) -> Result<BookmarkStatus> {
        Self::send(self.put(&format!("posts/{post_id}/bookmark"))?).await
    }

    pub async fn unbookmark(&self, post_id: i32) -> Result<BookmarkStatus> {
        Self::send(self.delete(&format!("posts/{post_id}/bookmark"))?).await
    }

    pub async fn bookmarks(&self, page: u32, limit: u32) -> Result<Page<PostSummary>> {
        let builder = self
            .get("bookmarks")?
            .query(&[("page", page), ("limit", limit)]);
        Self::send(builder).await
    }

    // Taxonomy

    pub async fn tags(&self) -> Result<Vec<Tag>> {
        Self::send(self.get("tags")?).await
    }

    pub async fn create_tag(&self, name: &str) -> Result<Tag> {
        Self::send_json(self.post("tags")?, &json!({ "name": name })).await
    }

    pub async fn posts_by_tag(&self, tag_id: i32, page: u32, limit: u32) -> Result<Page<PostSummary>> {
        let builder = self
            .get(&format!("tags/{tag_id}/posts"))?
            .query(&[("page", page), ("limit", limit)]);
        Self::send(builder).await
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        Self::send(self.get("categories")?).await
    }

    pub async fn create_category(&self, name: &str) -> Result<Category> {
        Self::send_json(self.post("categories")?, &json!({ "name": name })).await
    }

    // Profiles, dashboard, newsletter

    pub async fn profile(&self, user_id: &str) -> Result<Profile> {
        Self::send(self.get(&format!("profiles/{user_id}"))?).await
    }

    pub async fn save_profile(
        &self,
        display_name: &str,
        bio: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<Profile> {
        let body = json!({ "display_name": display_name, "bio": bio, "avatar_url": avatar_url });
        Self::send_json(self.put("profile")?, &body).await
    }

    pub async fn analytics(&self) -> Result<Vec<PostAnalytics>> {
        Self::send(self.get("dashboard/analytics")?).await
    }

    pub async fn subscribe(&self, email: &str) -> Result<()> {
        Self::send_empty(self.post("newsletter")?.json(&json!({ "email": email }))).await
    }
}
