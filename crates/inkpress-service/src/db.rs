use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::errors::ApiError;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub type SharedConnection = Arc<Mutex<SqliteConnection>>;

diesel::define_sql_function! {
    /// Unicode lowercase. SQLite's builtin `lower` and `LIKE` only fold ASCII.
    fn unicode_lower(value: Text) -> Text;
}

#[derive(Error, Debug)]
pub enum DbSetupError {
    #[error("Failed to connect to database: {0}")]
    Connection(#[from] diesel::ConnectionError),
    #[error("Failed to configure connection: {0}")]
    Pragma(#[from] diesel::result::Error),
    #[error("Failed to run migrations: {0}")]
    Migration(String),
}

/// Opens the database, turns on foreign key enforcement, registers `unicode_lower`
/// and applies pending migrations.
pub fn establish_connection(database_url: &str) -> Result<SqliteConnection, DbSetupError> {
    let mut connection = SqliteConnection::establish(database_url)?;

    connection.batch_execute("PRAGMA foreign_keys = ON;")?;
    unicode_lower_utils::register_impl(&mut connection, |value: String| value.to_lowercase())?;
    connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| DbSetupError::Migration(err.to_string()))?;

    Ok(connection)
}

pub fn shared(connection: SqliteConnection) -> SharedConnection {
    Arc::new(Mutex::new(connection))
}

pub(crate) fn lock(db: &SharedConnection) -> Result<MutexGuard<'_, SqliteConnection>, ApiError> {
    db.lock().map_err(|_| {
        tracing::error!("Database connection mutex poisoned");
        ApiError::InternalError
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_database_has_blog_tables() {
        let mut conn = establish_connection(":memory:").unwrap();

        #[derive(QueryableByName)]
        struct Name {
            #[diesel(sql_type = diesel::sql_types::Text)]
            name: String,
        }

        let tables: Vec<String> = diesel::sql_query(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .load::<Name>(&mut conn)
        .unwrap()
        .into_iter()
        .map(|n| n.name)
        .collect();

        for expected in [
            "bookmarks",
            "categories",
            "comment_votes",
            "comments",
            "newsletter_subscribers",
            "post_tags",
            "posts",
            "tags",
            "user_profiles",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }
    }

    #[test]
    fn test_unicode_lower_folds_non_ascii() {
        let mut conn = establish_connection(":memory:").unwrap();
        let lowered: String = diesel::select(unicode_lower("CAFÉ Crème"))
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(lowered, "café crème");
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let mut conn = establish_connection(":memory:").unwrap();
        let result = conn.batch_execute("INSERT INTO post_tags (post_id, tag_id) VALUES (1, 1)");
        assert!(result.is_err());
    }
}
