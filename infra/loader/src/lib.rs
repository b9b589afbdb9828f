//! # Comment Loader
//!
//! Solves the N+1 problem of a recursively threaded comment tree: independent
//! resolver tasks call [`Coalescer::load`], the coalescer merges every key that
//! arrives within a short window into a few bulk fetches, splits each result
//! back into per-key slices and hands every caller its own page.
//!
//! ## Pieces
//!
//! * [`Coalescer`]: the request-scoped batching handle (cheap to clone).
//! * [`BatchFetcher`]: what the coalescer calls once per uniform sub-batch.
//! * [`demultiplex`]: splits one [`CommentBatch`] into per-key slots.
//! * [`paginate`]: trims an overfetched slice into a [`Page`].
//!
//! # Example
//!
//! ```rust
//! use parley_domain::config::LoaderConfig;
//! use parley_domain::models::{BatchRequest, CommentBatch, LoadKey};
//! use parley_loader::{BatchFetcher, Coalescer, LoaderError};
//!
//! #[derive(Debug)]
//! struct Empty;
//!
//! impl BatchFetcher for Empty {
//!     type Error = std::io::Error;
//!
//!     async fn fetch(&self, _request: &BatchRequest) -> Result<CommentBatch, Self::Error> {
//!         Ok(CommentBatch::flat(Vec::new()))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let loader = Coalescer::new(Empty, LoaderConfig::default());
//! let result = loader.load(LoadKey::article(1, 10)).await;
//! assert!(matches!(result, Err(LoaderError::NotFound { .. })));
//! # }
//! ```
//!
//! [`CommentBatch`]: parley_domain::models::CommentBatch
//! [`Page`]: parley_domain::models::Page

mod coalescer;
mod contract;
mod demux;
mod error;
mod page;

pub use coalescer::{BatchFetcher, Coalescer, LoaderStats};
pub use contract::{ContractError, KeyFetchError};
pub use demux::{Slot, demultiplex};
pub use error::LoaderError;
pub use page::paginate;
