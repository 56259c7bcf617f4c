//! Port probing and listener setup

use std::io;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpSocket};

const LISTEN_BACKLOG: u32 = 1024;

/// Check that nothing is listening on `addr` by binding and releasing it.
pub fn probe_port(addr: SocketAddr) -> io::Result<()> {
    let probe = std::net::TcpListener::bind(addr)?;
    drop(probe);
    Ok(())
}

/// Bind a listener with address reuse enabled, so a restart right after a
/// previous instance exits is not blocked by lingering sockets.
pub fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(LISTEN_BACKLOG)
}

/// Probe, then bind. One attempt of the listen sequence.
pub fn listen_once(addr: SocketAddr) -> io::Result<TcpListener> {
    probe_port(addr)?;
    bind_listener(addr)
}

/// Accept errors that only affect the connection being accepted
pub fn is_transient_accept_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}
