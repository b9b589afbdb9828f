//! Facade crate for the Parley feature slices and shared modules.
//! Re-exports domain/kernel primitives and aggregates feature initialization.
//! Keep this crate thin: it composes other crates, it does not implement business logic.
//!
//! ## Usage
//! - Add `parley` with the `server` feature for the HTTP surface.
//! - Call [`init`] to build every feature slice over shared storage and subscriptions.

use parley_database::Database;
use parley_domain::config::ApiConfig;
use parley_domain::registry::InitializedSlice;
use parley_events::SubscriptionRegistry;

pub use parley_database as database;
pub use parley_domain as domain;
pub use parley_events as events;
pub use parley_kernel as kernel;
pub use parley_loader as loader;

#[cfg(feature = "server")]
pub mod server {
    pub mod router {
        pub use parley_discussion::api::discussion_router;
        pub use parley_kernel::server::router::system_router;
    }
}

/// Feature registry for runtime introspection.
pub mod features {
    pub use parley_discussion as discussion;

    /// Build-time enabled features (by Cargo feature).
    pub const ENABLED: &[&str] = &[
        "discussion",
        #[cfg(feature = "server")]
        "server",
    ];

    #[must_use]
    pub fn is_enabled(name: &str) -> bool {
        ENABLED.contains(&name)
    }
}

/// Initialize every feature slice.
///
/// # Errors
/// Returns the first slice initialization failure.
pub fn init(
    config: &ApiConfig,
    database: &Database,
    subscriptions: &SubscriptionRegistry,
) -> Result<Vec<InitializedSlice>, Box<dyn std::error::Error + Send + Sync>> {
    let slices = vec![features::discussion::init(config, database, subscriptions)?];
    Ok(slices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discussion_is_always_enabled() {
        assert!(features::is_enabled("discussion"));
        assert!(!features::is_enabled("licensing"));
    }

    #[test]
    fn init_rejects_inconsistent_pagination() {
        let mut config = ApiConfig::default();
        config.pagination.default_first = config.pagination.max_first + 1;
        let database = Database::from(parley_database::MemoryStore::default());

        let err = init(&config, &database, &SubscriptionRegistry::default()).unwrap_err();
        assert!(err.to_string().contains("pagination.default_first"));
    }
}
