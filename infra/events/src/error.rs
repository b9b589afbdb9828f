use std::borrow::Cow;

/// Errors raised by the subscription registry.
#[parley_derive::parley_error]
pub enum SubscriptionError {
    /// Subscriber buffers must hold at least one notification.
    #[error("Invalid capacity{}: {message}", format_context(.context))]
    InvalidCapacity { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The registry was shut down and accepts no new subscribers.
    #[error("Subscription registry closed{}", format_context(.context))]
    Closed { context: Option<Cow<'static, str>> },
}
