use parley_domain::models::{Comment, PostId};
use std::sync::Arc;
use tokio::sync::mpsc;

pub type SubscriptionId = u64;

/// Receiving half of one live subscription.
///
/// Yields comments created on `post_id` after the subscription was registered.
/// The stream ends once the subscription is removed from the registry.
#[derive(Debug)]
pub struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) post_id: PostId,
    pub(crate) receiver: mpsc::Receiver<Arc<Comment>>,
}

impl Subscription {
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    #[must_use]
    pub const fn post_id(&self) -> PostId {
        self.post_id
    }

    /// Next comment, `None` once the subscription has been removed.
    pub async fn recv(&mut self) -> Option<Arc<Comment>> {
        self.receiver.recv().await
    }

    /// Non-blocking variant of [`Subscription::recv`].
    pub fn try_recv(&mut self) -> Option<Arc<Comment>> {
        self.receiver.try_recv().ok()
    }
}
