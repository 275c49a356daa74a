use super::traits::TaxonomyRepository;
use crate::db::{self, SharedConnection};
use crate::errors::ApiError;
use crate::models::{Category, Tag};
use crate::schema::{categories, tags};
use crate::validation::{require, slugify};
use async_trait::async_trait;
use diesel::prelude::*;

/// Categories and tags: both are a name plus a slug derived from it.
#[derive(Clone)]
pub struct SqliteTaxonomyRepository {
    db: SharedConnection,
}

impl SqliteTaxonomyRepository {
    pub fn new(db: SharedConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TaxonomyRepository for SqliteTaxonomyRepository {
    async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        let mut conn = db::lock(&self.db)?;
        let result = categories::table
            .order(categories::name.asc())
            .select(Category::as_select())
            .load(&mut *conn)?;
        Ok(result)
    }

    async fn find_category(&self, id: i32) -> Result<Option<Category>, ApiError> {
        let mut conn = db::lock(&self.db)?;
        let result = categories::table
            .find(id)
            .select(Category::as_select())
            .first(&mut *conn)
            .optional()?;
        Ok(result)
    }

    async fn create_category(&self, name: &str) -> Result<Category, ApiError> {
        let name = require("name", name.trim().to_string())?;
        let slug = slugify(&name);

        let mut conn = db::lock(&self.db)?;
        diesel::insert_into(categories::table)
            .values((categories::name.eq(&name), categories::slug.eq(&slug)))
            .returning(Category::as_returning())
            .get_result(&mut *conn)
            .map_err(|err| {
                ApiError::conflict_on_unique(err, &format!("Category '{slug}' already exists"))
            })
    }

    async fn tags(&self) -> Result<Vec<Tag>, ApiError> {
        let mut conn = db::lock(&self.db)?;
        let result = tags::table
            .order(tags::name.asc())
            .select(Tag::as_select())
            .load(&mut *conn)?;
        Ok(result)
    }

    async fn find_tag(&self, id: i32) -> Result<Option<Tag>, ApiError> {
        let mut conn = db::lock(&self.db)?;
        let result = tags::table
            .find(id)
            .select(Tag::as_select())
            .first(&mut *conn)
            .optional()?;
        Ok(result)
    }

    async fn create_tag(&self, name: &str) -> Result<Tag, ApiError> {
        let name = require("name", name.trim().to_string())?;
        let slug = slugify(&name);

        let mut conn = db::lock(&self.db)?;
        diesel::insert_into(tags::table)
            .values((tags::name.eq(&name), tags::slug.eq(&slug)))
            .returning(Tag::as_returning())
            .get_result(&mut *conn)
            .map_err(|err| ApiError::conflict_on_unique(err, &format!("Tag '{slug}' already exists")))
    }
}
