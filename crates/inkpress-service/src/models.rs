use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

const WORDS_PER_MINUTE: usize = 200;
const DESCRIPTION_CHARS: usize = 160;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub author: String,
    pub user_id: Option<String>,
    pub category_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub likes: i32,
    pub views: i32,
    pub image_url: Option<String>,
    pub excerpt: Option<String>,
}

impl Post {
    /// Estimated reading time in whole minutes, rounded up.
    pub fn reading_time_minutes(&self) -> usize {
        reading_time_minutes(&self.content)
    }

    /// The excerpt when present, otherwise the head of the content.
    pub fn description(&self) -> String {
        match self.excerpt.as_deref().filter(|e| !e.trim().is_empty()) {
            Some(excerpt) => excerpt.to_string(),
            None => {
                let head: String = self.content.chars().take(DESCRIPTION_CHARS).collect();
                format!("{head}...")
            }
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }
}

/// An empty body still counts as one word, so nothing reads in zero minutes.
pub fn reading_time_minutes(content: &str) -> usize {
    let words = content.split_whitespace().count().max(1);
    words.div_ceil(WORDS_PER_MINUTE)
}

pub fn format_reading_time(minutes: usize) -> String {
    format!("{minutes} min read")
}

#[derive(Debug, Clone, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::posts)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author: String,
    pub user_id: Option<String>,
    pub category_id: Option<i32>,
    pub image_url: Option<String>,
    pub excerpt: Option<String>,
}

impl NewPost {
    pub fn new(
        title: String,
        content: String,
        author: String,
        user_id: Option<String>,
        category_id: Option<i32>,
    ) -> Result<Self, crate::validation::ValidationError> {
        use crate::validation::require;

        Ok(NewPost {
            title: require("title", title)?,
            content: require("content", content)?,
            author: require("author", author)?,
            user_id,
            category_id,
            image_url: None,
            excerpt: None,
        })
    }
}

/// Listing projection used by the home page, tag pages and bookmarks.
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PostSummary {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub user_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RelatedPost {
    pub id: i32,
    pub title: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::categories)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::tags)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Tag {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::post_tags)]
pub struct NewPostTag {
    pub post_id: i32,
    pub tag_id: i32,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::comments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
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

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::comments)]
pub struct NewComment {
    pub post_id: i32,
    pub parent_id: Option<i32>,
    pub user_id: Option<String>,
    pub author: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn value(self) -> i32 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize)]
#[diesel(table_name = crate::schema::comment_votes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CommentVote {
    pub comment_id: i32,
    pub user_id: String,
    pub vote: i32,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize)]
#[diesel(table_name = crate::schema::user_profiles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserProfile {
    pub user_id: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable, Deserialize)]
#[diesel(table_name = crate::schema::user_profiles)]
pub struct ProfileUpdate {
    pub user_id: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

/// Account as issued by the auth layer. The password hash never leaves the repository.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub id: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub access_token: String,
    pub expires_at: NaiveDateTime,
    pub user: User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeToggle {
    pub likes: i32,
    pub liked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostAnalytics {
    pub post_id: i32,
    pub title: String,
    pub views: i32,
    pub likes: i32,
    pub comments: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFilters {
    pub category: Option<i32>,
    pub tag: Option<i32>,
    pub author: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}
