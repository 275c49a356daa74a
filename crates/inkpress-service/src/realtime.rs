use crate::models::Comment;
use tokio::sync::broadcast;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum CommentEvent {
    Inserted(Comment),
}

impl CommentEvent {
    pub fn post_id(&self) -> i32 {
        match self {
            CommentEvent::Inserted(comment) => comment.post_id,
        }
    }
}

/// Push channel for row changes, the stand-in for a hosted realtime service.
///
/// Delivery is best effort: a subscriber that falls behind loses the oldest events.
#[derive(Clone)]
pub struct RealtimeHub {
    sender: broadcast::Sender<CommentEvent>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: CommentEvent) {
        // An error only means nobody is listening right now.
        match self.sender.send(event) {
            Ok(receivers) => debug!(receivers, "Published comment event"),
            Err(_) => debug!("Comment event dropped, no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CommentEvent> {
        self.sender.subscribe()
    }

    /// Inserted comments for one post, in publish order.
    pub fn comments_for_post(
        &self,
        post_id: i32,
    ) -> impl Stream<Item = Comment> + Send + use<> {
        BroadcastStream::new(self.subscribe()).filter_map(move |event| match event {
            Ok(CommentEvent::Inserted(comment)) if comment.post_id == post_id => Some(comment),
            Ok(_) => None,
            Err(err) => {
                warn!(post_id, error = %err, "Realtime subscriber lagged");
                None
            }
        })
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}
