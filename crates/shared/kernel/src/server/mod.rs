//! Axum plumbing shared by every slice.

mod health;
pub mod router;
mod state;

pub use health::HealthResponse;
pub use state::{ApiState, ApiStateBuilder, ApiStateError, ApiStateErrorExt, ApiStateInner};

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
