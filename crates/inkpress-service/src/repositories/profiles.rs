use super::traits::ProfileRepository;
use crate::db::{self, SharedConnection};
use crate::errors::ApiError;
use crate::models::{ProfileUpdate, UserProfile};
use crate::schema::user_profiles;
use async_trait::async_trait;
use diesel::prelude::*;

#[derive(Clone)]
pub struct SqliteProfileRepository {
    db: SharedConnection,
}

impl SqliteProfileRepository {
    pub fn new(db: SharedConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileRepository for SqliteProfileRepository {
    async fn find(&self, user_id: &str) -> Result<Option<UserProfile>, ApiError> {
        let mut conn = db::lock(&self.db)?;
        let result = user_profiles::table
            .find(user_id)
            .select(UserProfile::as_select())
            .first(&mut *conn)
            .optional()?;
        Ok(result)
    }

    async fn upsert(&self, profile: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        let mut conn = db::lock(&self.db)?;

        // Wholesale replace: omitted optional fields are cleared, not kept.
        diesel::insert_into(user_profiles::table)
            .values(profile)
            .on_conflict(user_profiles::user_id)
            .do_update()
            .set((
                user_profiles::display_name.eq(&profile.display_name),
                user_profiles::bio.eq(&profile.bio),
                user_profiles::avatar_url.eq(&profile.avatar_url),
                user_profiles::updated_at.eq(diesel::dsl::now),
            ))
            .execute(&mut *conn)?;

        let stored = user_profiles::table
            .find(&profile.user_id)
            .select(UserProfile::as_select())
            .first(&mut *conn)?;
        Ok(stored)
    }
}
