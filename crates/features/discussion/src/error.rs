use parley_database::DatabaseError;
use parley_domain::QueryError;
use parley_events::SubscriptionError;
use parley_loader::LoaderError;
use std::borrow::Cow;

/// A specialized [`DiscussionError`] enum of this crate.
#[parley_derive::parley_error]
pub enum DiscussionError {
    /// Unknown post or comment, or an empty listing.
    #[error("{message}{}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Malformed input that never reached storage.
    #[error("{message}{}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("{source}{}", format_context(.context))]
    Query { source: QueryError, context: Option<Cow<'static, str>> },

    /// Comment insert on a closed post.
    #[error("post closed to add comments{}", format_context(.context))]
    PostClosed { context: Option<Cow<'static, str>> },

    #[error("{source}{}", format_context(.context))]
    Loader { source: LoaderError, context: Option<Cow<'static, str>> },

    #[error("{source}{}", format_context(.context))]
    Database { source: DatabaseError, context: Option<Cow<'static, str>> },

    #[error("{source}{}", format_context(.context))]
    Subscription { source: SubscriptionError, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal discussion error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl DiscussionError {
    pub(crate) fn not_found(message: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound { message: message.into(), context: None }
    }

    pub(crate) fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Validation { message: message.into(), context: None }
    }

    /// Lifts storage and loader not-found outcomes into [`DiscussionError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Loader { source, .. } => source.is_not_found(),
            Self::Database { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

#[cfg(feature = "server")]
mod response {
    use super::DiscussionError;
    use axum::Json;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use parley_database::DatabaseError;
    use parley_derive::api_model;
    use parley_loader::LoaderError;
    use std::error::Error;

    const INTERNAL: &str = "Internal Server Error";

    /// Error body of every discussion endpoint.
    #[api_model]
    pub struct ErrorBody {
        pub message: String,
        pub status: u16,
    }

    impl DiscussionError {
        #[must_use]
        pub fn status(&self) -> StatusCode {
            match self {
                Self::NotFound { .. } => StatusCode::NOT_FOUND,
                Self::Validation { .. } | Self::Query { .. } => StatusCode::BAD_REQUEST,
                Self::PostClosed { .. } => StatusCode::FORBIDDEN,
                Self::Loader { source, .. } => match source {
                    LoaderError::NotFound { .. } => StatusCode::NOT_FOUND,
                    LoaderError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
                    LoaderError::Fetch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                },
                Self::Database { source, .. } => match source {
                    DatabaseError::NotFound { .. } => StatusCode::NOT_FOUND,
                    DatabaseError::Validation { .. } | DatabaseError::Query { .. } => {
                        StatusCode::BAD_REQUEST
                    },
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                },
                Self::Subscription { .. } => StatusCode::SERVICE_UNAVAILABLE,
                Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    /// `err` followed by every `source()` below it. Wrappers that only repeat
    /// their source's message are collapsed.
    fn cause_chain(err: &dyn Error) -> String {
        let mut chain = err.to_string();
        let mut next = err.source();
        while let Some(cause) = next {
            let text = cause.to_string();
            if !chain.ends_with(&text) {
                chain.push_str(": ");
                chain.push_str(&text);
            }
            next = cause.source();
        }
        chain
    }

    impl IntoResponse for DiscussionError {
        fn into_response(self) -> Response {
            let status = self.status();
            let message = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
                tracing::error!(error = %cause_chain(&self), "Request failed");
                INTERNAL.to_owned()
            } else {
                tracing::debug!(error = %self, %status, "Request rejected");
                self.to_string()
            };

            (status, Json(ErrorBody { message, status: status.as_u16() })).into_response()
        }
    }
}

#[cfg(feature = "server")]
pub use response::ErrorBody;
