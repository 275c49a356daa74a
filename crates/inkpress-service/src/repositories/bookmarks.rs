use super::traits::BookmarkRepository;
use crate::db::{self, SharedConnection};
use crate::errors::ApiError;
use crate::models::{Page, PostSummary};
use crate::schema::{bookmarks, posts};
use crate::validation::Pagination;
use async_trait::async_trait;
use diesel::prelude::*;

#[derive(Clone)]
pub struct SqliteBookmarkRepository {
    db: SharedConnection,
}

impl SqliteBookmarkRepository {
    pub fn new(db: SharedConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BookmarkRepository for SqliteBookmarkRepository {
    async fn bookmark(&self, post_id: i32, user_id: &str) -> Result<(), ApiError> {
        let mut conn = db::lock(&self.db)?;

        posts::table
            .find(post_id)
            .select(posts::id)
            .first::<i32>(&mut *conn)
            .optional()?
            .ok_or(ApiError::NotFound)?;

        diesel::insert_into(bookmarks::table)
            .values((
                bookmarks::post_id.eq(post_id),
                bookmarks::user_id.eq(user_id),
            ))
            .on_conflict_do_nothing()
            .execute(&mut *conn)?;
        Ok(())
    }

    async fn unbookmark(&self, post_id: i32, user_id: &str) -> Result<(), ApiError> {
        let mut conn = db::lock(&self.db)?;
        diesel::delete(bookmarks::table.find((post_id, user_id))).execute(&mut *conn)?;
        Ok(())
    }

    async fn is_bookmarked(&self, post_id: i32, user_id: &str) -> Result<bool, ApiError> {
        let mut conn = db::lock(&self.db)?;
        let found = bookmarks::table
            .find((post_id, user_id))
            .select(bookmarks::post_id)
            .first::<i32>(&mut *conn)
            .optional()?;
        Ok(found.is_some())
    }

    async fn bookmarked_posts(
        &self,
        user_id: &str,
        pagination: Pagination,
    ) -> Result<Page<PostSummary>, ApiError> {
        let mut conn = db::lock(&self.db)?;

        let total: i64 = bookmarks::table
            .filter(bookmarks::user_id.eq(user_id))
            .count()
            .get_result(&mut *conn)?;

        let items = bookmarks::table
            .inner_join(posts::table)
            .filter(bookmarks::user_id.eq(user_id))
            .order((bookmarks::created_at.desc(), posts::id.desc()))
            .offset(pagination.offset())
            .limit(pagination.limit())
            .select(PostSummary::as_select())
            .load(&mut *conn)?;

        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }
}
