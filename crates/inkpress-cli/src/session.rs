//! Client-side session state shared with every consumer.
//!
//! [`SessionProvider`] owns the signed-in user and broadcasts changes through a
//! `watch` channel, so each subscriber observes sign-in and sign-out as soon as
//! they happen. [`TokenStore`] persists the session between CLI runs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::client::{ApiClient, ClientError, Result};
use crate::types::{AuthUser, Session};

/// The auth operations a session needs from the service.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<(AuthUser, Option<Session>)>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;
    async fn sign_out(&self, token: &str) -> Result<()>;
    async fn current_user(&self, token: &str) -> Result<AuthUser>;
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<(AuthUser, Option<Session>)> {
        let response = ApiClient::sign_up(self, email, password).await?;
        Ok((response.user, response.session))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        ApiClient::sign_in(self, email, password).await
    }

    async fn sign_out(&self, token: &str) -> Result<()> {
        self.clone()
            .with_token(Some(token.to_string()))
            .sign_out()
            .await
    }

    async fn current_user(&self, token: &str) -> Result<AuthUser> {
        self.clone()
            .with_token(Some(token.to_string()))
            .current_user()
            .await
    }
}

pub struct SessionProvider<A> {
    api: A,
    session: Mutex<Option<Session>>,
    user: watch::Sender<Option<AuthUser>>,
}

impl<A: AuthApi> SessionProvider<A> {
    pub fn new(api: A) -> Self {
        let (user, _) = watch::channel(None);
        Self {
            api,
            session: Mutex::new(None),
            user,
        }
    }

    /// A receiver that always holds the current user; `None` while signed out.
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.user.subscribe()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.user.borrow().clone()
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    async fn set(&self, session: Option<Session>) {
        let user = session.as_ref().map(|session| session.user.clone());
        *self.session.lock().await = session;
        self.user.send_replace(user);
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let session = self.api.sign_in(email, password).await?;
        let user = session.user.clone();
        info!(user_id = %user.id, "Signed in");
        self.set(Some(session)).await;
        Ok(user)
    }

    /// Registers a user. When the service hands back a session the caller is
    /// signed in straight away.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser> {
        let (user, session) = self.api.sign_up(email, password).await?;
        if session.is_some() {
            info!(user_id = %user.id, "Signed up and signed in");
            self.set(session).await;
        } else {
            info!(user_id = %user.id, "Signed up; confirmation pending");
        }
        Ok(user)
    }

    /// Ends the session. On failure the current state is left untouched.
    pub async fn sign_out(&self) -> Result<()> {
        let token = self.token().await.ok_or(ClientError::NotSignedIn)?;
        self.api.sign_out(&token).await?;
        self.set(None).await;
        info!("Signed out");
        Ok(())
    }

    /// Adopts a previously stored session if the service still honours it.
    pub async fn restore(&self, session: Session) -> Result<Option<AuthUser>> {
        match self.api.current_user(&session.access_token).await {
            Ok(user) => {
                debug!(user_id = %user.id, "Restored session");
                self.set(Some(Session { user: user.clone(), ..session })).await;
                Ok(Some(user))
            }
            Err(ClientError::Api { status, .. }) if status.as_u16() == 401 => {
                warn!("Stored session is no longer valid");
                self.set(None).await;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Session file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file is corrupt: {0}")]
    Format(#[from] serde_json::Error),
}

/// JSON file holding the last session.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::new(dir.join("inkpress").join("session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> std::result::Result<Option<Session>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save(&self, session: &Session) -> std::result::Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(session)?)?;
        Ok(())
    }

    pub fn clear(&self) -> std::result::Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
