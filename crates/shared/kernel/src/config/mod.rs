use config::{Config, Environment, File, Map};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

/// Prefix of environment overrides, e.g. `PARLEY__LOADER__WAIT_MS=10`.
pub const ENV_PREFIX: &str = "PARLEY";

const DEFAULT_PATH: &str = "server";

#[parley_derive::parley_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Layers a config file under `PARLEY__` environment overrides.
///
/// The file (default `server`, extension resolved by the `config` crate, so
/// `server.toml` matches) is optional: every section of
/// [`ApiConfig`](parley_domain::config::ApiConfig) has serde defaults, so the
/// service starts with an in-memory backend when nothing is configured.
/// Nested keys use `__` as separator: `PARLEY__DATABASE__BACKEND=surreal`
/// sets `database.backend`.
///
/// # Errors
/// Returns an error when the file cannot be parsed, an override is malformed,
/// or the merged tree does not deserialize into `T`.
///
/// # Example
/// ```rust
/// use parley_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// let cfg: AppConfig = load_config(Some("config/local")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    load_config_with(path, None)
}

/// Like [`load_config`], but reads `PARLEY__*` overrides from `vars` instead of
/// the process environment when given.
///
/// # Errors
/// Same as [`load_config`].
pub fn load_config_with<T>(
    path: Option<impl AsRef<Path>>,
    vars: Option<Map<String, String>>,
) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let path = path.map_or_else(|| PathBuf::from(DEFAULT_PATH), |p| p.as_ref().to_path_buf());
    info!(path = %path.display(), "Loading config");

    let config = Config::builder()
        .add_source(File::from(path.as_path()).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(vars),
        )
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
