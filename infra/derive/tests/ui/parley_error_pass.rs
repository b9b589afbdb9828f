use parley_derive::parley_error;
use std::borrow::Cow;

#[parley_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Not found{}", format_context(.context))]
    NotFound { context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read() -> Result<(), DemoError> {
    Err(std::io::Error::other("disk")).context("reading snapshot")
}

fn missing() -> Result<(), DemoError> {
    Err(DemoError::NotFound { context: None })
}

fn main() {
    let err = read().unwrap_err();
    assert_eq!(err.to_string(), "IO error (reading snapshot): disk");

    let err = missing().context("post 7").unwrap_err();
    assert_eq!(err.to_string(), "Not found (post 7)");

    let err: DemoError = "boom".into();
    assert_eq!(err.to_string(), "Internal error: boom");

    let err: DemoError = format!("code {}", 3).into();
    assert!(matches!(err, DemoError::Internal { .. }));
}
