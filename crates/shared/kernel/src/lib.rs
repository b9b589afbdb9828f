//! Kernel utilities shared across slices.
//! Keep this crate lightweight: ids, config loading, and (with `server`) the
//! shared API state plus system routes.
//!
//! ## ID generation
//! Use `safe_nanoid!` for URL-safe, unambiguous IDs (request ids, log correlation):
//! ```rust
//! # use parley_kernel::safe_nanoid;
//! let id = safe_nanoid!();
//! assert_eq!(id.len(), 12);
//! ```
//!
//! ## Config loading
//! ```rust,no_run
//! use parley_kernel::config::load_config;
//! use parley_kernel::domain::config::ApiConfig;
//!
//! let cfg: ApiConfig = load_config(Some("server")).unwrap();
//! ```
pub mod config;
#[cfg(feature = "server")]
pub mod server;

// Alphabet excludes visually ambiguous characters (I, O, l, 0, 1).
pub const SAFE_ALPHABET: &[char; 55] = &[
    '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f',
    'g', 'h', 'j', 'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

pub use nanoid::nanoid;
pub use parley_domain as domain;

/// Generates an unambiguous `NanoID` (no visually confusing characters).
#[macro_export]
macro_rules! safe_nanoid {
    () => {
        $crate::nanoid!(12, $crate::SAFE_ALPHABET)
    };
    ($size:expr) => {
        $crate::nanoid!($size, $crate::SAFE_ALPHABET)
    };
}
