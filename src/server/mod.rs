//! Server module
//!
//! Owns the listening socket and runs the accept loop. Connections are served
//! one at a time on the calling task; the listener is closed when the `Server`
//! (or the future returned by [`Server::run`]) is dropped, on every exit path.

pub mod connection;
pub mod listener;
pub mod signal;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::config::{AppState, Config};
use crate::error::Result;
use crate::logger;

pub use listener::bind_listener;

/// Clonable handle used to stop a running server from another task
#[derive(Clone, Default)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownHandle {
    /// Ask the server to stop. Safe to call before `run` starts or more than once.
    pub fn stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
        // notify_one keeps a permit if nobody is waiting yet
        self.notify.notify_one();
    }

    pub fn is_stopped(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if !self.is_stopped() {
            self.notify.notified().await;
        }
    }
}

/// A bound static file server
pub struct Server {
    listener: std::net::TcpListener,
    local_addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Validate `config`, open the asset root and bind the listener.
    ///
    /// Fails with `ServerError::Config` for a missing root or bad address and
    /// `ServerError::Bind` when the address cannot be bound.
    pub fn start(config: Config) -> Result<Self> {
        let addr = config.get_socket_addr()?;
        let state = Arc::new(AppState::new(config)?);
        let listener = bind_listener(addr)?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            local_addr,
            state,
            shutdown: ShutdownHandle::default(),
        })
    }

    /// Address actually bound (resolves port 0)
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Accept and serve connections until [`ShutdownHandle::stop`] is called.
    ///
    /// Must be polled inside a tokio runtime.
    pub async fn run(self) -> Result<()> {
        let Self {
            listener,
            local_addr,
            state,
            shutdown,
        } = self;
        let listener = TcpListener::from_std(listener)?;
        let timeout = state.config.connection_timeout();

        logger::log_server_start(&local_addr, state.root.path());

        while !shutdown.is_stopped() {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            // in-flight connections are aborted on stop
                            tokio::select! {
                                () = connection::serve_connection(stream, peer_addr, &state, timeout) => {}
                                () = shutdown.wait() => {}
                            }
                        }
                        Err(e) => {
                            logger::log_error(&format!("Failed to accept connection: {e}"));
                        }
                    }
                }

                () = shutdown.wait() => {}
            }
        }

        drop(listener);
        logger::log_server_stopped(&local_addr);
        Ok(())
    }

    /// Close the listening socket without serving
    pub fn stop(self) {
        let addr = self.local_addr;
        drop(self);
        logger::log_server_stopped(&addr);
    }
}
