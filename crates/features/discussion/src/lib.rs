//! Discussion feature slice: posts, threaded comments and live comment streams.
//!
//! Comment listings requested within one scheduling window are coalesced by a
//! request-scoped [`Loader`] into a single storage round trip per
//! discriminant, then split back into one keyset page per key. Creating a
//! comment fans it out to the post's live subscribers before returning.

mod error;
mod fetcher;
mod service;
mod thread;

#[cfg(feature = "server")]
pub mod api;

pub use error::{DiscussionError, DiscussionErrorExt};
pub use fetcher::CommentFetcher;
pub use service::{DiscussionService, Loader, RequestScope};
pub use thread::{DEFAULT_DEPTH, MAX_DEPTH, Thread, ThreadQuery};

#[cfg(feature = "server")]
pub use error::ErrorBody;

use parley_database::Database;
use parley_domain::config::ApiConfig;
use parley_events::SubscriptionRegistry;
use parley_kernel::domain::registry::InitializedSlice;

/// Discussion feature state
#[parley_derive::parley_slice]
pub struct Discussion {
    pub service: DiscussionService,
}

/// Initialize the discussion feature over shared storage and subscriptions.
///
/// # Errors
/// [`DiscussionError::Validation`] when the pagination limits are inconsistent.
pub fn init(
    config: &ApiConfig,
    database: &Database,
    subscriptions: &SubscriptionRegistry,
) -> Result<InitializedSlice, DiscussionError> {
    let pagination = config.pagination;
    if pagination.default_first > pagination.max_first {
        return Err(DiscussionError::Validation {
            message: format!(
                "pagination.default_first ({}) exceeds pagination.max_first ({})",
                pagination.default_first, pagination.max_first
            )
            .into(),
            context: None,
        });
    }

    let service = DiscussionService::new(database.clone(), subscriptions.clone(), config);
    tracing::info!(
        backend = ?database.backend(),
        max_batch = config.loader.max_batch,
        wait_ms = config.loader.wait_ms,
        "Discussion slice initialized"
    );

    Ok(InitializedSlice::new(Discussion::new(DiscussionInner { service })))
}
