use super::traits::CommentRepository;
use crate::db::{self, SharedConnection};
use crate::errors::ApiError;
use crate::models::{Comment, CommentVote, NewComment, VoteDirection};
use crate::schema::{comment_votes, comments};
use async_trait::async_trait;
use diesel::prelude::*;

#[derive(Clone)]
pub struct SqliteCommentRepository {
    db: SharedConnection,
}

impl SqliteCommentRepository {
    pub fn new(db: SharedConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CommentRepository for SqliteCommentRepository {
    async fn for_post(&self, post_id: i32) -> Result<Vec<Comment>, ApiError> {
        let mut conn = db::lock(&self.db)?;
        let result = comments::table
            .filter(comments::post_id.eq(post_id))
            .order((comments::created_at.asc(), comments::id.asc()))
            .select(Comment::as_select())
            .load(&mut *conn)?;
        Ok(result)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Comment>, ApiError> {
        let mut conn = db::lock(&self.db)?;
        let result = comments::table
            .find(id)
            .select(Comment::as_select())
            .first(&mut *conn)
            .optional()?;
        Ok(result)
    }

    async fn replies(&self, comment_id: i32) -> Result<Vec<Comment>, ApiError> {
        let mut conn = db::lock(&self.db)?;
        let result = comments::table
            .filter(comments::parent_id.eq(comment_id))
            .order((comments::created_at.asc(), comments::id.asc()))
            .select(Comment::as_select())
            .load(&mut *conn)?;
        Ok(result)
    }

    async fn create(&self, comment: &NewComment) -> Result<Comment, ApiError> {
        let mut conn = db::lock(&self.db)?;
        let result = diesel::insert_into(comments::table)
            .values(comment)
            .returning(Comment::as_returning())
            .get_result(&mut *conn)?;
        Ok(result)
    }

    async fn vote(
        &self,
        comment_id: i32,
        user_id: &str,
        direction: VoteDirection,
    ) -> Result<CommentVote, ApiError> {
        let mut conn = db::lock(&self.db)?;

        comments::table
            .find(comment_id)
            .select(comments::id)
            .first::<i32>(&mut *conn)
            .optional()?
            .ok_or(ApiError::NotFound)?;

        let row = CommentVote {
            comment_id,
            user_id: user_id.to_string(),
            vote: direction.value(),
        };

        // The vote total on `comments.votes` is maintained by database triggers.
        diesel::insert_into(comment_votes::table)
            .values(&row)
            .on_conflict((comment_votes::comment_id, comment_votes::user_id))
            .do_update()
            .set(comment_votes::vote.eq(row.vote))
            .execute(&mut *conn)?;

        let stored = comment_votes::table
            .find((comment_id, user_id))
            .select(CommentVote::as_select())
            .first(&mut *conn)?;
        Ok(stored)
    }
}
