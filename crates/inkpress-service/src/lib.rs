use axum::Router;

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod realtime;
pub mod repositories;
pub mod routes;
pub mod schema;
pub mod shutdown;
pub mod validation;

use config::AuthConfig;
use db::SharedConnection;
use realtime::RealtimeHub;
use repositories::{
    AuthRepository, BookmarkRepository, CommentRepository, NewsletterRepository, PostRepository,
    ProfileRepository, SqliteAuthRepository, SqliteBookmarkRepository, SqliteCommentRepository,
    SqliteNewsletterRepository, SqlitePostRepository, SqliteProfileRepository,
    SqliteTaxonomyRepository, TaxonomyRepository,
};
use shutdown::ShutdownState;

/// Everything a handler can reach. Handlers are generic over this trait so the
/// backend handles are injected rather than global.
pub trait AppState: Clone + Send + Sync + 'static {
    type Posts: PostRepository;
    type Taxonomy: TaxonomyRepository;
    type Comments: CommentRepository;
    type Bookmarks: BookmarkRepository;
    type Profiles: ProfileRepository;
    type Newsletter: NewsletterRepository;
    type Auth: AuthRepository;

    fn post_repo(&self) -> &Self::Posts;
    fn taxonomy_repo(&self) -> &Self::Taxonomy;
    fn comment_repo(&self) -> &Self::Comments;
    fn bookmark_repo(&self) -> &Self::Bookmarks;
    fn profile_repo(&self) -> &Self::Profiles;
    fn newsletter_repo(&self) -> &Self::Newsletter;
    fn auth_repo(&self) -> &Self::Auth;
    fn realtime(&self) -> &RealtimeHub;
    fn shutdown(&self) -> &ShutdownState;
    fn api_key(&self) -> &str;
}

#[derive(Clone)]
pub struct DefaultAppState {
    posts: SqlitePostRepository,
    taxonomy: SqliteTaxonomyRepository,
    comments: SqliteCommentRepository,
    bookmarks: SqliteBookmarkRepository,
    profiles: SqliteProfileRepository,
    newsletter: SqliteNewsletterRepository,
    auth: SqliteAuthRepository,
    realtime: RealtimeHub,
    shutdown: ShutdownState,
    api_key: String,
}

impl DefaultAppState {
    pub fn new(db: SharedConnection, api_key: impl Into<String>, auth_config: AuthConfig) -> Self {
        Self {
            posts: SqlitePostRepository::new(db.clone()),
            taxonomy: SqliteTaxonomyRepository::new(db.clone()),
            comments: SqliteCommentRepository::new(db.clone()),
            bookmarks: SqliteBookmarkRepository::new(db.clone()),
            profiles: SqliteProfileRepository::new(db.clone()),
            newsletter: SqliteNewsletterRepository::new(db.clone()),
            auth: SqliteAuthRepository::new(db, auth_config),
            realtime: RealtimeHub::new(),
            shutdown: ShutdownState::new(),
            api_key: api_key.into(),
        }
    }
}

impl AppState for DefaultAppState {
    type Posts = SqlitePostRepository;
    type Taxonomy = SqliteTaxonomyRepository;
    type Comments = SqliteCommentRepository;
    type Bookmarks = SqliteBookmarkRepository;
    type Profiles = SqliteProfileRepository;
    type Newsletter = SqliteNewsletterRepository;
    type Auth = SqliteAuthRepository;

    fn post_repo(&self) -> &Self::Posts {
        &self.posts
    }

    fn taxonomy_repo(&self) -> &Self::Taxonomy {
        &self.taxonomy
    }

    fn comment_repo(&self) -> &Self::Comments {
        &self.comments
    }

    fn bookmark_repo(&self) -> &Self::Bookmarks {
        &self.bookmarks
    }

    fn profile_repo(&self) -> &Self::Profiles {
        &self.profiles
    }

    fn newsletter_repo(&self) -> &Self::Newsletter {
        &self.newsletter
    }

    fn auth_repo(&self) -> &Self::Auth {
        &self.auth
    }

    fn realtime(&self) -> &RealtimeHub {
        &self.realtime
    }

    fn shutdown(&self) -> &ShutdownState {
        &self.shutdown
    }

    fn api_key(&self) -> &str {
        &self.api_key
    }
}

pub fn create_app<S: AppState>(state: S) -> Router {
    routes::create_router(&state).with_state(state)
}
