//! Wire types returned by the service.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub expires_at: NaiveDateTime,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpResponse {
    pub user: AuthUser,
    pub session: Option<Session>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostSummary {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub created_at: NaiveDateTime,
    pub excerpt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub author: String,
    pub user_id: Option<String>,
    pub category_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub likes: i32,
    pub views: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
    pub reading_time: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i32>,
    pub tag_ids: Vec<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelatedPost {
    pub id: i32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tag {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Comment {
    pub id: i32,
    pub post_id: i32,
    pub parent_id: Option<i32>,
    pub user_id: Option<String>,
    pub author: String,
    pub content: String,
    pub created_at: NaiveDateTime,
    pub votes: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoteResult {
    pub vote: i32,
    pub votes: i32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ViewCount {
    pub views: i32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LikeToggle {
    pub likes: i32,
    pub liked: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BookmarkStatus {
    pub post_id: i32,
    pub bookmarked: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostAnalytics {
    pub post_id: i32,
    pub title: String,
    pub views: i32,
    pub likes: i32,
    pub comments: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShareLink {
    pub platform: String,
    pub share_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub category: Option<i32>,
    pub tag: Option<i32>,
    pub author: Option<String>,
}

/// One complete search: every emission from the search controller is one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub filters: SearchFilters,
    pub page: u32,
    pub limit: u32,
}
