//! # Domain Models
//!
//! Pure domain types for Parley: posts, comments, load keys, batch results,
//! pages and the configuration tree. Keep it lean: no I/O, networking, or
//! heavy logic, just data and the validation that guards it.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod registry;

pub use error::QueryError;
