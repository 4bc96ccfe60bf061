// Listener module
// Creates the single TCP listener the server accepts on

use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;

use crate::error::{Result, ServerError};

/// Backlog of pending connections while one is being served
const LISTEN_BACKLOG: i32 = 128;

/// Bind a non-blocking `std::net::TcpListener` on `addr`.
///
/// `SO_REUSEADDR` is set on unix so a restart is not blocked by sockets in
/// `TIME_WAIT`. `SO_REUSEPORT` is never set: a port held by another process must
/// fail here with [`ServerError::Bind`].
pub fn bind_listener(addr: SocketAddr) -> Result<std::net::TcpListener> {
    bind_socket(addr).map_err(|source| ServerError::Bind { addr, source })
}

fn bind_socket(addr: SocketAddr) -> std::io::Result<std::net::TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    #[cfg(unix)]
    socket.set_reuse_address(true)?;

    // Required before handing the socket to tokio
    socket.set_nonblocking(true)?;

    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    Ok(socket.into())
}
