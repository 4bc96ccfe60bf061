// Configuration module entry point
// Loads layered configuration and holds the per-process application state

mod state;
mod types;

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use crate::error::{Result, ServerError};
use crate::logger::{AccessLogFormat, Level};

// Re-export public types
pub use state::AppState;
pub use types::{AssetsConfig, Config, HttpConfig, LoggingConfig, ServerConfig};

/// Config file consulted when no path is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "grapher";

/// Prefix of environment variable overrides, e.g. `GRAPHER_SERVER__PORT=8080`
pub const ENV_PREFIX: &str = "GRAPHER";

impl Config {
    /// Load configuration from the default file (`grapher.toml`, optional)
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from specified file path (without extension)
    ///
    /// Sources in increasing priority: built-in defaults, the config file if it
    /// exists, then `GRAPHER_<SECTION>__<KEY>` environment variables.
    pub fn load_from(config_path: &str) -> Result<Self> {
        Self::load_with_env(config_path, ENV_PREFIX)
    }

    /// Same as [`Config::load_from`] with overrides read from `<env_prefix>_*` variables
    pub fn load_with_env(config_path: &str, env_prefix: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 4200)?
            .set_default("assets.root_dir", "ui")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("http.server_name", "grapher-web")?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("assets.index_files"),
            )
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values that would only fail later, at request time
    pub fn validate(&self) -> Result<()> {
        self.logging
            .level
            .parse::<Level>()
            .map_err(ServerError::Config)?;
        self.logging
            .access_log_format
            .parse::<AccessLogFormat>()
            .map_err(ServerError::Config)?;

        if self.assets.index_files.is_empty() {
            return Err(ServerError::Config(
                "assets.index_files must name at least one file".to_string(),
            ));
        }
        if let Some(bad) = self
            .assets
            .index_files
            .iter()
            .find(|f| f.is_empty() || f.contains(['/', '\\']))
        {
            return Err(ServerError::Config(format!(
                "Invalid index file name '{bad}': must be a plain file name"
            )));
        }
        if self.server.connection_timeout == 0 {
            return Err(ServerError::Config(
                "server.connection_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve `host:port` to the address the listener binds
    pub fn get_socket_addr(&self) -> Result<SocketAddr> {
        let host = self.server.host.trim_start_matches('[').trim_end_matches(']');
        (host, self.server.port)
            .to_socket_addrs()
            .map_err(|e| {
                ServerError::Config(format!(
                    "Invalid address '{}:{}': {e}",
                    self.server.host, self.server.port
                ))
            })?
            .next()
            .ok_or_else(|| {
                ServerError::Config(format!(
                    "Address '{}:{}' did not resolve",
                    self.server.host, self.server.port
                ))
            })
    }

    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.server.connection_timeout)
    }
}
