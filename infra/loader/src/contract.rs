use parley_domain::models::{Discriminant, LoadTarget};
use std::borrow::Cow;

/// A fetch result that does not match the request it answers.
#[parley_derive::parley_error]
pub enum ContractError {
    #[error("Group {target} was not requested{}", format_context(.context))]
    UnknownGroup { target: LoadTarget, context: Option<Cow<'static, str>> },

    #[error("Group {target} is not contiguous{}", format_context(.context))]
    SplitGroup { target: LoadTarget, context: Option<Cow<'static, str>> },

    #[error("Comment {id} does not belong to any {discriminant:?} group{}", format_context(.context))]
    Ungrouped { id: i64, discriminant: Discriminant, context: Option<Cow<'static, str>> },

    #[error("Key {target} appears twice in one request{}", format_context(.context))]
    DuplicateKey { target: LoadTarget, context: Option<Cow<'static, str>> },
}

/// A single key the fetcher reported as failed while its siblings succeeded.
#[derive(Debug, Clone, thiserror::Error)]
#[error("fetching {target} failed: {reason}")]
pub struct KeyFetchError {
    pub target: LoadTarget,
    pub reason: String,
}
