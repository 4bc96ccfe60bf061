//! Startup error types
//!
//! Only failures that abort the process live here. Anything that goes wrong while
//! handling a request is turned into an HTTP status instead.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Result type for server lifecycle operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Fatal server error
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid configuration or missing root directory
    #[error("Configuration error: {0}")]
    Config(String),

    /// The listening socket could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// IO error outside of binding (log files, listener registration)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<config::ConfigError> for ServerError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
