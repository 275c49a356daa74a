mod auth;
mod bookmarks;
mod comments;
mod newsletter;
mod posts;
mod profiles;
mod taxonomy;
mod traits;

pub use auth::SqliteAuthRepository;
pub use bookmarks::SqliteBookmarkRepository;
pub use comments::SqliteCommentRepository;
pub use newsletter::SqliteNewsletterRepository;
pub use posts::SqlitePostRepository;
pub use profiles::SqliteProfileRepository;
pub use taxonomy::SqliteTaxonomyRepository;
pub use traits::*;
