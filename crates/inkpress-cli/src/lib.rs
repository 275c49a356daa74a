pub mod client;
pub mod feed;
pub mod search;
pub mod session;
pub mod sse;
pub mod types;

pub use client::{ApiClient, ClientError};
pub use feed::CommentFeed;
pub use search::SearchController;
pub use session::{SessionProvider, TokenStore};
