use parley_domain::models::LoadTarget;
use std::borrow::Cow;
use std::error::Error;
use std::sync::Arc;

/// Outcome of a failed `load`.
///
/// Clonable so one fetch failure can be handed to every waiter of a batch.
#[parley_derive::parley_error]
#[derive(Clone)]
pub enum LoaderError {
    /// The key's group came back empty.
    #[error("No comments found for {target}{}", format_context(.context))]
    NotFound { target: LoadTarget, context: Option<Cow<'static, str>> },

    /// The bulk fetch (or this key's part of it) failed.
    #[error("Batch fetch failed{}: {source}", format_context(.context))]
    Fetch { source: Arc<dyn Error + Send + Sync>, context: Option<Cow<'static, str>> },

    /// The owning request scope ended before the key resolved.
    #[error("Load cancelled{}", format_context(.context))]
    Cancelled { context: Option<Cow<'static, str>> },
}

impl LoaderError {
    pub(crate) fn fetch<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::Fetch { source: Arc::new(err), context: None }
    }

    pub(crate) const fn cancelled() -> Self {
        Self::Cancelled { context: None }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
