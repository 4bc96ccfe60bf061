// Application state module
// Immutable per-process state shared by every request

use super::types::Config;
use crate::error::{Result, ServerError};
use crate::handler::AssetRoot;
use crate::logger::AccessLogFormat;

/// Application state
///
/// Built once by `Server::start` and never mutated afterwards.
pub struct AppState {
    pub config: Config,
    /// Canonicalized asset root
    pub root: AssetRoot,
    /// Parsed once so requests never re-validate the format string
    pub access_log_format: AccessLogFormat,
}

impl AppState {
    /// Validate configuration and open the asset root
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let root = AssetRoot::open(&config.assets)?;
        let access_log_format = config
            .logging
            .access_log_format
            .parse()
            .map_err(ServerError::Config)?;

        Ok(Self {
            config,
            root,
            access_log_format,
        })
    }
}
