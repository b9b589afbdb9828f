use std::borrow::Cow;

/// Rejections raised while turning wire queries into load keys.
#[parley_derive::parley_error]
#[derive(Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Either post_id or parent_id must be set{}", format_context(.context))]
    MissingTarget { context: Option<Cow<'static, str>> },

    #[error("Only one of post_id and parent_id may be set{}", format_context(.context))]
    AmbiguousTarget { context: Option<Cow<'static, str>> },

    #[error("Page size {first} exceeds the limit of {max}{}", format_context(.context))]
    FirstOutOfRange { first: u32, max: u32, context: Option<Cow<'static, str>> },

    #[error("Batch mixes article and parent keys{}", format_context(.context))]
    MixedBatch { context: Option<Cow<'static, str>> },
}
