use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::types::Comment;

/// Comments for one post, merged from fetches and realtime pushes.
///
/// Entries are keyed by id so a comment that arrives through both channels is
/// shown once. Fetched copies are authoritative; a push never replaces a comment
/// that is already present.
#[derive(Debug, Default)]
pub struct CommentFeed {
    post_id: i32,
    comments: BTreeMap<(NaiveDateTime, i32), Comment>,
    index: BTreeMap<i32, NaiveDateTime>,
}

impl CommentFeed {
    pub fn new(post_id: i32) -> Self {
        Self {
            post_id,
            ..Self::default()
        }
    }

    pub fn post_id(&self) -> i32 {
        self.post_id
    }

    /// Merges a fetched batch. Returns how many comments were new.
    pub fn extend_fetched(&mut self, fetched: impl IntoIterator<Item = Comment>) -> usize {
        let post_id = self.post_id;
        fetched
            .into_iter()
            .filter(|comment| comment.post_id == post_id)
            .map(|comment| self.insert(comment))
            .filter(|&added| added)
            .count()
    }

    /// Applies a realtime insert. Returns `true` when the comment was not
    /// already known.
    pub fn push(&mut self, comment: Comment) -> bool {
        if comment.post_id != self.post_id || self.index.contains_key(&comment.id) {
            return false;
        }
        self.insert(comment)
    }

    fn insert(&mut self, comment: Comment) -> bool {
        let added = match self.index.insert(comment.id, comment.created_at) {
            Some(previous) => {
                self.comments.remove(&(previous, comment.id));
                false
            }
            None => true,
        };
        self.comments.insert((comment.created_at, comment.id), comment);
        added
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Comment> {
        self.comments.values()
    }

    pub fn get(&self, id: i32) -> Option<&Comment> {
        let created_at = self.index.get(&id)?;
        self.comments.get(&(*created_at, id))
    }
}
