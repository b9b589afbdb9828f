//! # Live Subscriptions
//!
//! A process-wide registry of per-post subscribers. Comment creation calls
//! [`SubscriptionRegistry::publish`] after the insert commits and every open
//! subscription on that post receives the comment through its own bounded
//! channel.
//!
//! ## Delivery
//!
//! * **Best-effort**: a full buffer drops the notification, a closed receiver is skipped.
//! * **No history**: subscribers only see comments published after they joined.
//! * **Scoped**: a subscription is removed when its `CancellationToken` is
//!   cancelled, when its receiver is dropped, or on registry shutdown.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use parley_domain::models::Comment;
//! use parley_events::{SubscriptionError, SubscriptionRegistry};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SubscriptionError> {
//!     let registry = SubscriptionRegistry::default();
//!     let scope = CancellationToken::new();
//!     let mut subscription = registry.subscribe(7, &scope)?;
//!
//!     let comment = Comment {
//!         id: 1,
//!         text: "first".to_owned(),
//!         article_id: 7,
//!         parent_id: None,
//!         created_at: Utc::now(),
//!     };
//!     assert_eq!(registry.publish(&comment), 1);
//!     assert_eq!(subscription.recv().await.map(|c| c.id), Some(1));
//!     Ok(())
//! }
//! ```

mod error;
mod registry;
mod subscription;

pub use error::{SubscriptionError, SubscriptionErrorExt};
pub use registry::SubscriptionRegistry;
pub use subscription::{Subscription, SubscriptionId};
