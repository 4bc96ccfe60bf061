//! Local static file server for the Grapher web UI bundle.
//!
//! Serves a directory of assets over plain HTTP, one connection at a time. It is
//! meant for local development and testing only.
//!
//! ```no_run
//! use grapher_web::{Config, Server};
//!
//! # async fn demo() -> grapher_web::Result<()> {
//! let mut config = Config::default();
//! config.assets.root_dir = "dist/ui".into();
//! let server = Server::start(config)?;
//! server.run().await
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;

pub use crate::config::Config;
pub use crate::error::{Result, ServerError};
pub use crate::server::{Server, ShutdownHandle};
