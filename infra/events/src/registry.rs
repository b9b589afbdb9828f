use crate::error::SubscriptionError;
use crate::subscription::{Subscription, SubscriptionId};
use fxhash::FxHashMap;
use parking_lot::RwLock;
use parley_domain::config::SubscriptionConfig;
use parley_domain::models::{Comment, PostId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

const MIN_CAPACITY: usize = 1;

type Sender = mpsc::Sender<Arc<Comment>>;
type Subscribers = FxHashMap<SubscriptionId, Entry>;

/// One registered subscriber. `removed` releases its cleanup task, which holds
/// the only other sender.
#[derive(Debug)]
struct Entry {
    sender: Sender,
    removed: CancellationToken,
}

#[derive(Debug)]
struct RegistryInner {
    posts: RwLock<FxHashMap<PostId, Subscribers>>,
    next_id: AtomicU64,
    capacity: usize,
    /// Cancelled on shutdown; releases every cleanup task.
    closed: CancellationToken,
}

/// Process-wide map of live subscribers, keyed by post.
///
/// Cheap to clone; all clones share one map. Every mutation takes the write
/// lock, `publish` snapshots the senders under the read lock and delivers
/// after releasing it.
#[derive(Debug, Clone)]
pub struct SubscriptionRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::with_capacity_unchecked(SubscriptionConfig::default().buffer)
    }
}

impl SubscriptionRegistry {
    /// Creates a registry whose subscribers buffer `config.buffer` notifications.
    ///
    /// # Errors
    /// [`SubscriptionError::InvalidCapacity`] if the buffer is zero.
    pub fn new(config: SubscriptionConfig) -> Result<Self, SubscriptionError> {
        let capacity = validate_capacity(config.buffer)?;
        Ok(Self::with_capacity_unchecked(capacity))
    }

    fn with_capacity_unchecked(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                posts: RwLock::new(FxHashMap::default()),
                next_id: AtomicU64::new(1),
                capacity,
                closed: CancellationToken::new(),
            }),
        }
    }

    /// Registers a subscriber on `post_id` for as long as `ctx` is alive.
    ///
    /// A background task removes the entry once `ctx` is cancelled or the
    /// returned [`Subscription`] is dropped. Must be called inside a Tokio runtime.
    ///
    /// # Errors
    /// [`SubscriptionError::Closed`] after [`SubscriptionRegistry::shutdown`].
    pub fn subscribe(
        &self,
        post_id: PostId,
        ctx: &CancellationToken,
    ) -> Result<Subscription, SubscriptionError> {
        let (sender, receiver) = mpsc::channel(self.inner.capacity);
        let removed = CancellationToken::new();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut posts = self.inner.posts.write();
            // Checked under the lock so shutdown cannot miss this entry.
            if self.inner.closed.is_cancelled() {
                return Err(SubscriptionError::Closed {
                    context: Some(format!("post {post_id}").into()),
                });
            }
            let entry = Entry { sender: sender.clone(), removed: removed.clone() };
            posts.entry(post_id).or_default().insert(id, entry);
        }
        debug!(post_id, subscription = id, "Subscriber registered");

        let registry = Arc::downgrade(&self.inner);
        let ctx = ctx.clone();
        let closed = self.inner.closed.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = ctx.cancelled() => {},
                () = closed.cancelled() => return,
                () = removed.cancelled() => {},
                () = sender.closed() => {},
            }
            drop(sender);
            remove(&registry, post_id, id);
        });

        Ok(Subscription { id, post_id, receiver })
    }

    /// Removes one subscriber and ends its stream once buffered comments are
    /// drained. Returns whether it was registered.
    pub fn unsubscribe(&self, post_id: PostId, id: SubscriptionId) -> bool {
        remove_entry(&self.inner, post_id, id)
    }

    /// Fans `comment` out to every subscriber of `comment.article_id`.
    ///
    /// Returns the number of subscribers the comment was queued for. Never
    /// blocks: a full buffer drops the notification, a closed channel is skipped.
    pub fn publish(&self, comment: &Comment) -> usize {
        let post_id = comment.article_id;
        let senders: Vec<(SubscriptionId, Sender)> = {
            let posts = self.inner.posts.read();
            posts
                .get(&post_id)
                .map(|subs| subs.iter().map(|(id, entry)| (*id, entry.sender.clone())).collect())
                .unwrap_or_default()
        };

        if senders.is_empty() {
            trace!(post_id, comment = comment.id, "No subscribers for post");
            return 0;
        }

        let event = Arc::new(comment.clone());
        let mut delivered = 0;
        for (id, sender) in senders {
            match sender.try_send(Arc::clone(&event)) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(
                        post_id,
                        subscription = id,
                        comment = comment.id,
                        "Subscriber buffer full; notification dropped"
                    );
                },
                Err(TrySendError::Closed(_)) => {
                    trace!(post_id, subscription = id, "Subscriber already gone");
                },
            }
        }

        trace!(post_id, comment = comment.id, delivered, "Comment published");
        delivered
    }

    /// Number of live subscribers on `post_id`.
    #[must_use]
    pub fn subscriber_count(&self, post_id: PostId) -> usize {
        self.inner.posts.read().get(&post_id).map_or(0, FxHashMap::len)
    }

    /// Number of posts with at least one subscriber.
    #[must_use]
    pub fn post_count(&self) -> usize {
        self.inner.posts.read().len()
    }

    /// Live subscribers across all posts.
    #[must_use]
    pub fn total(&self) -> usize {
        self.inner.posts.read().values().map(FxHashMap::len).sum()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Drops every channel and refuses new subscribers.
    ///
    /// Returns the number of subscriptions that were closed.
    pub fn shutdown(&self) -> usize {
        let mut posts = self.inner.posts.write();
        self.inner.closed.cancel();
        let count = posts.values().map(FxHashMap::len).sum();
        posts.clear();
        drop(posts);

        debug!(count, "Subscription registry shut down");
        count
    }
}

fn remove(registry: &Weak<RegistryInner>, post_id: PostId, id: SubscriptionId) {
    if let Some(inner) = registry.upgrade() {
        remove_entry(&inner, post_id, id);
    }
}

fn remove_entry(inner: &RegistryInner, post_id: PostId, id: SubscriptionId) -> bool {
    let mut posts = inner.posts.write();
    let Some(subs) = posts.get_mut(&post_id) else {
        return false;
    };
    let entry = subs.remove(&id);
    if subs.is_empty() {
        posts.remove(&post_id);
    }
    drop(posts);

    let Some(entry) = entry else {
        return false;
    };
    entry.removed.cancel();
    debug!(post_id, subscription = id, "Subscriber removed");
    true
}

fn validate_capacity(capacity: usize) -> Result<usize, SubscriptionError> {
    if capacity < MIN_CAPACITY {
        return Err(SubscriptionError::InvalidCapacity {
            message: format!("capacity must be >= {MIN_CAPACITY}").into(),
            context: None,
        });
    }
    Ok(capacity)
}
