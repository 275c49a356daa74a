use super::traits::AuthRepository;
use crate::config::AuthConfig;
use crate::db::{self, SharedConnection};
use crate::errors::ApiError;
use crate::models::{Session, User};
use crate::schema::{sessions, users};
use crate::validation::validate_password;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use diesel::prelude::*;
use rand::Rng;
use tracing::{debug, error};

#[derive(Clone)]
pub struct SqliteAuthRepository {
    db: SharedConnection,
    config: AuthConfig,
}

impl SqliteAuthRepository {
    pub fn new(db: SharedConnection, config: AuthConfig) -> Self {
        Self { db, config }
    }
}

/// 32 random bytes, hex encoded.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.r#gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Runs bcrypt work on the blocking pool so it holds neither a runtime worker nor the
/// connection lock.
async fn run_bcrypt<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, bcrypt::BcryptError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| {
            error!(error = %err, "Password hashing task failed");
            ApiError::InternalError
        })?
        .map_err(|err| {
            error!(error = %err, "Password hashing failed");
            ApiError::InternalError
        })
}

#[async_trait]
impl AuthRepository for SqliteAuthRepository {
    async fn sign_up(&self, email: &str, password: &str) -> Result<User, ApiError> {
        validate_password(password, self.config.min_password_len)?;

        let password = password.to_owned();
        let cost = self.config.password_cost;
        let password_hash = run_bcrypt(move || bcrypt::hash(password, cost)).await?;
        let id = uuid::Uuid::new_v4().to_string();

        let mut conn = db::lock(&self.db)?;
        diesel::insert_into(users::table)
            .values((
                users::id.eq(&id),
                users::email.eq(email),
                users::password_hash.eq(&password_hash),
            ))
            .returning(User::as_returning())
            .get_result(&mut *conn)
            .map_err(|err| ApiError::conflict_on_unique(err, "User already registered"))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let (user, password_hash): (User, String) = {
            let mut conn = db::lock(&self.db)?;
            users::table
                .filter(users::email.eq(email))
                .select((User::as_select(), users::password_hash))
                .first(&mut *conn)
                .optional()?
                .ok_or(ApiError::InvalidCredentials)?
        };

        let password = password.to_owned();
        let verified = run_bcrypt(move || bcrypt::verify(password, &password_hash)).await?;
        if !verified {
            return Err(ApiError::InvalidCredentials);
        }

        let token = generate_token();
        let now = Utc::now().naive_utc();
        let expires_at = now + Duration::hours(self.config.session_hours);

        let mut conn = db::lock(&self.db)?;
        let pruned = diesel::delete(sessions::table.filter(sessions::expires_at.le(now)))
            .execute(&mut *conn)?;
        if pruned > 0 {
            debug!(pruned, "Removed expired sessions");
        }

        diesel::insert_into(sessions::table)
            .values((
                sessions::token.eq(&token),
                sessions::user_id.eq(&user.id),
                sessions::expires_at.eq(expires_at),
            ))
            .execute(&mut *conn)?;

        Ok(Session {
            access_token: token,
            expires_at,
            user,
        })
    }

    async fn sign_out(&self, token: &str) -> Result<(), ApiError> {
        let mut conn = db::lock(&self.db)?;
        diesel::delete(sessions::table.find(token)).execute(&mut *conn)?;
        Ok(())
    }

    async fn user_for_token(&self, token: &str) -> Result<Option<User>, ApiError> {
        let mut conn = db::lock(&self.db)?;
        let now = Utc::now().naive_utc();
        let result = sessions::table
            .inner_join(users::table)
            .filter(sessions::token.eq(token))
            .filter(sessions::expires_at.gt(now))
            .select(User::as_select())
            .first(&mut *conn)
            .optional()?;
        Ok(result)
    }
}
