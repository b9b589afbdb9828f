//! # Parley Server
//!
//! HTTP front of the discussion service: `Axum` routes, `SurrealDB` or in-memory
//! storage, a request-scoped comment loader and live comment streams.
//!
//! ## Example
//! ```no_run
//! use parley_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Server::builder()
//!         .port(4583)
//!         .build()
//!         .await?
//!         .run()
//!         .await
//! }
//! ```

mod router;

use anyhow::{Context, Result, anyhow};
use axum_server::Handle;
use parley::domain::config::ApiConfig;
use parley::kernel::server::ApiState;
use parley_database::Database;
use parley_events::SubscriptionRegistry;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// A fluent builder for configuring and initializing the [`Server`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct ServerBuilder {
    cfg: ApiConfig,
}

impl ServerBuilder {
    /// Set up the server's configuration.
    pub fn config(mut self, cfg: ApiConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.cfg.server.port = port;
        self
    }

    /// Consumes the builder and initializes the server.
    ///
    /// # Process
    /// 1. Opens the configured storage backend via [`Database::builder`]
    /// 2. Creates the process-wide subscription registry
    /// 3. Initializes every feature slice over both
    /// 4. Constructs application state
    ///
    /// # Errors
    /// Returns an error if:
    /// * The database cannot be reached or rejects the credentials
    /// * The subscription buffer is zero
    /// * A feature slice rejects the configuration
    pub async fn build(self) -> Result<Server> {
        let address = SocketAddr::new(self.cfg.server.address, self.cfg.server.port);
        info!(address = %address, backend = ?self.cfg.database.backend, "Initializing server");

        let db = Database::builder()
            .config(&self.cfg.database)
            .init()
            .await
            .context("Failed to establish database connection")?;

        let subscriptions = SubscriptionRegistry::new(self.cfg.subscriptions)
            .context("Invalid subscription configuration")?;

        let slices = parley::init(&self.cfg, &db, &subscriptions)
            .map_err(|e| anyhow!("Platform bootstrap failed: {e}"))?;

        let state = ApiState::builder()
            .config(self.cfg)
            .db(db)
            .subscriptions(subscriptions)
            .register_slices(slices)
            .build()
            .context("Failed to finalize API state registry")?;
        Ok(Server { state })
    }
}

/// A fully initialized server instance ready to run.
#[must_use = "call .run().await to start the server"]
#[derive(Debug)]
pub struct Server {
    state: ApiState,
}

impl Server {
    /// Returns a new [`ServerBuilder`] to configure the server.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Starts the server and runs until the shutdown signal is received.
    ///
    /// On shutdown the subscription registry is closed first, which ends every
    /// live comment stream so the graceful drain is not held open by them.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the configured address.
    pub async fn run(self) -> Result<()> {
        let server = &self.state.config.server;
        let address = SocketAddr::new(server.address, server.port);
        let subscriptions = self.state.subscriptions.clone();
        let app = router::init(self.state);

        let handle = Handle::<SocketAddr>::new();
        let shutdown_handle = handle.clone();

        tokio::spawn(async move {
            if let Err(e) = shutdown_signal().await {
                error!("Error while waiting for shutdown signal: {e}");
                return;
            }
            let closed = subscriptions.shutdown();
            info!(closed, "Shutdown signal received, starting graceful shutdown...");
            shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });

        info!("Starting HTTP server on http://{address}");
        axum_server::bind(address)
            .handle(handle)
            .serve(app.into_make_service())
            .await
            .context("HTTP server failed")?;

        info!("Server shutdown complete");
        Ok(())
    }

    /// Returns a reference to the application state.
    #[must_use]
    pub const fn state(&self) -> &ApiState {
        &self.state
    }
}

/// Listens for shutdown signals (Ctrl+C, SIGTERM).
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => res?,
        res = terminate => res?,
    }

    Ok(())
}
