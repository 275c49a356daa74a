use crate::errors::ApiError;
use crate::models::{
    Category, Comment, CommentVote, LikeToggle, NewComment, NewPost, Page, Post, PostAnalytics,
    PostSummary, ProfileUpdate, RelatedPost, SearchFilters, Session, Tag, User, UserProfile,
    VoteDirection,
};
use crate::validation::Pagination;
use async_trait::async_trait;

pub const RELATED_POSTS_LIMIT: i64 = 4;

#[derive(Debug, Clone, Default)]
pub struct ListPostsParams {
    pub pagination: Pagination,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchPostsParams {
    pub query: Option<String>,
    pub filters: SearchFilters,
    pub pagination: Pagination,
}

#[async_trait]
pub trait PostRepository: Clone + Send + Sync + 'static {
    async fn list(&self, params: &ListPostsParams) -> Result<Page<PostSummary>, ApiError>;
    async fn find_by_id(&self, id: i32) -> Result<Option<Post>, ApiError>;
    /// Inserts the post, then its tag rows. The two writes are independent: when the
    /// second fails the post stays and `ApiError::TagAssociationFailed` is returned.
    async fn create(&self, post: &NewPost, tag_ids: &[i32]) -> Result<Post, ApiError>;
    async fn update(&self, id: i32, title: &str, content: &str) -> Result<Post, ApiError>;
    async fn delete(&self, id: i32) -> Result<(), ApiError>;
    async fn related(
        &self,
        category_id: i32,
        exclude_id: i32,
        limit: i64,
    ) -> Result<Vec<RelatedPost>, ApiError>;
    async fn search(&self, params: &SearchPostsParams) -> Result<Page<Post>, ApiError>;
    async fn by_tag(&self, tag_id: i32, pagination: Pagination)
    -> Result<Page<PostSummary>, ApiError>;
    async fn tags_for(&self, post_id: i32) -> Result<Vec<Tag>, ApiError>;
    /// `increment_post_views`
    async fn increment_views(&self, post_id: i32) -> Result<i32, ApiError>;
    /// `toggle_post_like`
    async fn toggle_like(&self, post_id: i32, user_id: &str) -> Result<LikeToggle, ApiError>;
    /// `get_post_analytics`
    async fn analytics(&self, user_id: &str) -> Result<Vec<PostAnalytics>, ApiError>;
}

#[async_trait]
pub trait TaxonomyRepository: Clone + Send + Sync + 'static {
    async fn categories(&self) -> Result<Vec<Category>, ApiError>;
    async fn find_category(&self, id: i32) -> Result<Option<Category>, ApiError>;
    async fn create_category(&self, name: &str) -> Result<Category, ApiError>;
    async fn tags(&self) -> Result<Vec<Tag>, ApiError>;
    async fn find_tag(&self, id: i32) -> Result<Option<Tag>, ApiError>;
    async fn create_tag(&self, name: &str) -> Result<Tag, ApiError>;
}

#[async_trait]
pub trait CommentRepository: Clone + Send + Sync + 'static {
    async fn for_post(&self, post_id: i32) -> Result<Vec<Comment>, ApiError>;
    async fn find_by_id(&self, id: i32) -> Result<Option<Comment>, ApiError>;
    async fn replies(&self, comment_id: i32) -> Result<Vec<Comment>, ApiError>;
    async fn create(&self, comment: &NewComment) -> Result<Comment, ApiError>;
    /// Upserts the (comment, user) vote row; the latest direction wins.
    async fn vote(
        &self,
        comment_id: i32,
        user_id: &str,
        direction: VoteDirection,
    ) -> Result<CommentVote, ApiError>;
}

#[async_trait]
pub trait BookmarkRepository: Clone + Send + Sync + 'static {
    async fn bookmark(&self, post_id: i32, user_id: &str) -> Result<(), ApiError>;
    async fn unbookmark(&self, post_id: i32, user_id: &str) -> Result<(), ApiError>;
    async fn is_bookmarked(&self, post_id: i32, user_id: &str) -> Result<bool, ApiError>;
    async fn bookmarked_posts(
        &self,
        user_id: &str,
        pagination: Pagination,
    ) -> Result<Page<PostSummary>, ApiError>;
}

#[async_trait]
pub trait ProfileRepository: Clone + Send + Sync + 'static {
    async fn find(&self, user_id: &str) -> Result<Option<UserProfile>, ApiError>;
    async fn upsert(&self, profile: &ProfileUpdate) -> Result<UserProfile, ApiError>;
}

#[async_trait]
pub trait NewsletterRepository: Clone + Send + Sync + 'static {
    async fn subscribe(&self, email: &str) -> Result<(), ApiError>;
}

#[async_trait]
pub trait AuthRepository: Clone + Send + Sync + 'static {
    async fn sign_up(&self, email: &str, password: &str) -> Result<User, ApiError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ApiError>;
    async fn sign_out(&self, token: &str) -> Result<(), ApiError>;
    async fn user_for_token(&self, token: &str) -> Result<Option<User>, ApiError>;
}
