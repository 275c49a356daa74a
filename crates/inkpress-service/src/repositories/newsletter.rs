use super::traits::NewsletterRepository;
use crate::db::{self, SharedConnection};
use crate::errors::ApiError;
use crate::schema::newsletter_subscribers;
use async_trait::async_trait;
use diesel::prelude::*;

#[derive(Clone)]
pub struct SqliteNewsletterRepository {
    db: SharedConnection,
}

impl SqliteNewsletterRepository {
    pub fn new(db: SharedConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NewsletterRepository for SqliteNewsletterRepository {
    async fn subscribe(&self, email: &str) -> Result<(), ApiError> {
        let mut conn = db::lock(&self.db)?;
        diesel::insert_into(newsletter_subscribers::table)
            .values(newsletter_subscribers::email.eq(email))
            .execute(&mut *conn)
            .map_err(|err| ApiError::conflict_on_unique(err, "Email is already subscribed"))?;
        Ok(())
    }
}
