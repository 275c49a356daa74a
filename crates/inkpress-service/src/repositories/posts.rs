use super::traits::{ListPostsParams, PostRepository, SearchPostsParams};
use crate::db::{self, SharedConnection, unicode_lower};
use crate::errors::ApiError;
use crate::models::{
    LikeToggle, NewPost, NewPostTag, Page, Post, PostAnalytics, PostSummary, RelatedPost, Tag,
};
use crate::schema::{comments, post_likes, post_tags, posts, tags};
use crate::validation::{Pagination, like_pattern};
use async_trait::async_trait;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use std::collections::HashMap;

type BoxedPosts = posts::BoxedQuery<'static, Sqlite>;

#[derive(Clone)]
pub struct SqlitePostRepository {
    db: SharedConnection,
}

impl SqlitePostRepository {
    pub fn new(db: SharedConnection) -> Self {
        Self { db }
    }
}

/// Case-insensitive substring match on title or content.
fn text_filter(query: BoxedPosts, term: Option<&str>) -> BoxedPosts {
    match term {
        Some(term) => {
            let pattern = like_pattern(&term.to_lowercase());
            query.filter(
                unicode_lower(posts::title)
                    .like(pattern.clone())
                    .escape('\\')
                    .or(unicode_lower(posts::content).like(pattern).escape('\\')),
            )
        }
        None => query,
    }
}

fn tagged_with(query: BoxedPosts, tag_id: i32) -> BoxedPosts {
    query.filter(
        posts::id.eq_any(
            post_tags::table
                .filter(post_tags::tag_id.eq(tag_id))
                .select(post_tags::post_id),
        ),
    )
}

fn search_filter(params: &SearchPostsParams) -> BoxedPosts {
    let mut query = text_filter(posts::table.into_boxed(), params.query.as_deref());

    if let Some(category_id) = params.filters.category {
        query = query.filter(posts::category_id.eq(category_id));
    }
    if let Some(tag_id) = params.filters.tag {
        query = tagged_with(query, tag_id);
    }
    if let Some(author) = params
        .filters
        .author
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
    {
        query = query.filter(posts::author.eq(author.to_string()));
    }

    query
}

fn newest_first(query: BoxedPosts, pagination: Pagination) -> BoxedPosts {
    query
        .order((posts::created_at.desc(), posts::id.desc()))
        .offset(pagination.offset())
        .limit(pagination.limit())
}

fn to_total(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

#[async_trait]
impl PostRepository for SqlitePostRepository {
    async fn list(&self, params: &ListPostsParams) -> Result<Page<PostSummary>, ApiError> {
        let mut conn = db::lock(&self.db)?;
        let term = params.search.as_deref();

        let total: i64 = text_filter(posts::table.into_boxed(), term)
            .count()
            .get_result(&mut *conn)?;

        let items = newest_first(text_filter(posts::table.into_boxed(), term), params.pagination)
            .select(PostSummary::as_select())
            .load(&mut *conn)?;

        Ok(Page {
            items,
            total: to_total(total),
        })
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Post>, ApiError> {
        let mut conn = db::lock(&self.db)?;
        let result = posts::table
            .find(id)
            .select(Post::as_select())
            .first(&mut *conn)
            .optional()?;
        Ok(result)
    }

    async fn create(&self, post: &NewPost, tag_ids: &[i32]) -> Result<Post, ApiError> {
        let mut conn = db::lock(&self.db)?;

        let created = diesel::insert_into(posts::table)
            .values(post)
            .returning(Post::as_returning())
            .get_result(&mut *conn)?;

        let mut tag_ids = tag_ids.to_vec();
        tag_ids.sort_unstable();
        tag_ids.dedup();

        if !tag_ids.is_empty() {
            let rows: Vec<NewPostTag> = tag_ids
                .into_iter()
                .map(|tag_id| NewPostTag {
                    post_id: created.id,
                    tag_id,
                })
                .collect();

            // No compensating delete: the post row survives a failed tag insert.
            diesel::insert_into(post_tags::table)
                .values(&rows)
                .execute(&mut *conn)
                .map_err(|source| ApiError::TagAssociationFailed {
                    post_id: created.id,
                    source,
                })?;
        }

        Ok(created)
    }

    async fn update(&self, id: i32, title: &str, content: &str) -> Result<Post, ApiError> {
        let mut conn = db::lock(&self.db)?;
        diesel::update(posts::table.find(id))
            .set((
                posts::title.eq(title),
                posts::content.eq(content),
                posts::updated_at.eq(diesel::dsl::now),
            ))
            .returning(Post::as_returning())
            .get_result(&mut *conn)
            .optional()?
            .ok_or(ApiError::NotFound)
    }

    async fn delete(&self, id: i32) -> Result<(), ApiError> {
        let mut conn = db::lock(&self.db)?;
        let deleted = diesel::delete(posts::table.find(id)).execute(&mut *conn)?;
        if deleted == 0 {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }

    async fn related(
        &self,
        category_id: i32,
        exclude_id: i32,
        limit: i64,
    ) -> Result<Vec<RelatedPost>, ApiError> {
        let mut conn = db::lock(&self.db)?;
        let result = posts::table
            .filter(posts::category_id.eq(category_id))
            .filter(posts::id.ne(exclude_id))
            .order((posts::created_at.desc(), posts::id.desc()))
            .limit(limit)
            .select(RelatedPost::as_select())
            .load(&mut *conn)?;
        Ok(result)
    }

    async fn search(&self, params: &SearchPostsParams) -> Result<Page<Post>, ApiError> {
        let mut conn = db::lock(&self.db)?;

        let total: i64 = search_filter(params).count().get_result(&mut *conn)?;
        let items = newest_first(search_filter(params), params.pagination)
            .select(Post::as_select())
            .load(&mut *conn)?;

        Ok(Page {
            items,
            total: to_total(total),
        })
    }

    async fn by_tag(
        &self,
        tag_id: i32,
        pagination: Pagination,
    ) -> Result<Page<PostSummary>, ApiError> {
        let mut conn = db::lock(&self.db)?;

        let total: i64 = tagged_with(posts::table.into_boxed(), tag_id)
            .count()
            .get_result(&mut *conn)?;
        let items = newest_first(tagged_with(posts::table.into_boxed(), tag_id), pagination)
            .select(PostSummary::as_select())
            .load(&mut *conn)?;

        Ok(Page {
            items,
            total: to_total(total),
        })
    }

    async fn tags_for(&self, post_id: i32) -> Result<Vec<Tag>, ApiError> {
        let mut conn = db::lock(&self.db)?;
        let result = tags::table
            .inner_join(post_tags::table)
            .filter(post_tags::post_id.eq(post_id))
            .order(tags::name.asc())
            .select(Tag::as_select())
            .load(&mut *conn)?;
        Ok(result)
    }

    async fn increment_views(&self, post_id: i32) -> Result<i32, ApiError> {
        let mut conn = db::lock(&self.db)?;
        diesel::update(posts::table.find(post_id))
            .set(posts::views.eq(posts::views + 1))
            .returning(posts::views)
            .get_result::<i32>(&mut *conn)
            .optional()?
            .ok_or(ApiError::NotFound)
    }

    async fn toggle_like(&self, post_id: i32, user_id: &str) -> Result<LikeToggle, ApiError> {
        let mut conn = db::lock(&self.db)?;

        conn.transaction::<_, ApiError, _>(|conn| {
            posts::table
                .find(post_id)
                .select(posts::id)
                .first::<i32>(conn)
                .optional()?
                .ok_or(ApiError::NotFound)?;

            let already_liked = post_likes::table
                .find((post_id, user_id))
                .select(post_likes::post_id)
                .first::<i32>(conn)
                .optional()?
                .is_some();

            if already_liked {
                diesel::delete(post_likes::table.find((post_id, user_id))).execute(conn)?;
            } else {
                diesel::insert_into(post_likes::table)
                    .values((
                        post_likes::post_id.eq(post_id),
                        post_likes::user_id.eq(user_id),
                    ))
                    .execute(conn)?;
            }

            let likes: i64 = post_likes::table
                .filter(post_likes::post_id.eq(post_id))
                .count()
                .get_result(conn)?;
            let likes = i32::try_from(likes).unwrap_or(i32::MAX);

            diesel::update(posts::table.find(post_id))
                .set(posts::likes.eq(likes))
                .execute(conn)?;

            Ok(LikeToggle {
                likes,
                liked: !already_liked,
            })
        })
    }

    async fn analytics(&self, user_id: &str) -> Result<Vec<PostAnalytics>, ApiError> {
        let mut conn = db::lock(&self.db)?;

        let authored: Vec<(i32, String, i32, i32)> = posts::table
            .filter(posts::user_id.eq(user_id))
            .order((posts::created_at.desc(), posts::id.desc()))
            .select((posts::id, posts::title, posts::views, posts::likes))
            .load(&mut *conn)?;

        let ids: Vec<i32> = authored.iter().map(|(id, ..)| *id).collect();
        let comment_counts: HashMap<i32, i64> = comments::table
            .filter(comments::post_id.eq_any(&ids))
            .group_by(comments::post_id)
            .select((comments::post_id, count_star()))
            .load::<(i32, i64)>(&mut *conn)?
            .into_iter()
            .collect();

        Ok(authored
            .into_iter()
            .map(|(post_id, title, views, likes)| PostAnalytics {
                post_id,
                title,
                views,
                likes,
                comments: comment_counts.get(&post_id).copied().unwrap_or(0),
            })
            .collect())
    }
}
