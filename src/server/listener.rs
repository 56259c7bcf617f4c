//! Broadcast server listener
//!
//! Handles the bind-and-retry sequence and the TCP accept loop, spawning a
//! connection task per subscriber.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::registry::ConnectionRegistry;
use crate::server::bind;
use crate::server::config::ServerConfig;
use crate::server::connection::{serve_subscriber, SubscriberSettings};
use crate::server::identity::StreamIdentity;

/// WebSocket broadcast server
pub struct BroadcastServer {
    config: ServerConfig,
    identity: StreamIdentity,
    registry: Arc<ConnectionRegistry>,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl BroadcastServer {
    /// Create a new server. Fails if an explicit stream identity is invalid.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let identity = StreamIdentity::from_config(config.stream_identity.as_deref())?;
        Ok(Self::with_identity(config, identity))
    }

    /// Create a new server with a given identity
    pub fn with_identity(config: ServerConfig, identity: StreamIdentity) -> Self {
        Self {
            config,
            identity,
            registry: Arc::new(ConnectionRegistry::new()),
            local_addr: Mutex::new(None),
        }
    }

    /// Get a reference to the connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn identity(&self) -> &StreamIdentity {
        &self.identity
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Address actually bound, once listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run the listen sequence until `shutdown` turns true.
    ///
    /// Each attempt probes the port, binds and runs the accept loop. A failed
    /// bind or an unrecoverable accept error starts the next attempt after
    /// `bind_backoff`, up to `bind_retries` retries.
    pub async fn serve(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr = self.config.bind_addr;
        let attempts = self.config.bind_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            if *shutdown.borrow() {
                return Ok(());
            }
            attempt += 1;

            let err = match bind::listen_once(addr) {
                Ok(listener) => {
                    let bound = listener.local_addr()?;
                    *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner) = Some(bound);
                    tracing::info!(
                        addr = %bound,
                        path = %self.identity.path(),
                        "Broadcast server listening"
                    );

                    match self.accept_loop(&listener, &mut shutdown).await {
                        Ok(()) => return Ok(()),
                        Err(e) => {
                            tracing::error!(error = %e, "Accept loop failed");
                            e
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(addr = %addr, attempt = attempt, error = %e, "Port unavailable");
                    e
                }
            };

            if attempt >= attempts {
                tracing::error!(addr = %addr, attempts = attempts, "Giving up on listening");
                return Err(Error::BindExhausted {
                    addr,
                    attempts,
                    last: err,
                });
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.bind_backoff) => {}
                _ = shutdown.changed() => return Ok(()),
            }
        }
    }

    async fn accept_loop(
        &self,
        listener: &TcpListener,
        shutdown: &mut watch::Receiver<bool>,
    ) -> io::Result<()> {
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    // A dropped sender also means shutdown
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Broadcast server stopped accepting");
                        return Ok(());
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer_addr)) => self.handle_connection(socket, peer_addr),
                    Err(e) if bind::is_transient_accept_error(&e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        tracing::debug!(peer = %peer_addr, "New connection");

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }

        tokio::spawn(serve_subscriber(
            socket,
            peer_addr,
            self.identity.clone(),
            Arc::clone(&self.registry),
            SubscriberSettings {
                queue: self.config.subscriber_queue,
                handshake_timeout: self.config.handshake_timeout,
            },
        ));
    }

    fn configure_socket(&self, socket: &TcpStream) -> io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn server_on(addr: SocketAddr, retries: u32) -> Arc<BroadcastServer> {
        let config = ServerConfig::with_addr(addr)
            .stream_identity("test")
            .bind_retry(retries, Duration::from_millis(100));
        Arc::new(BroadcastServer::new(config).unwrap())
    }

    async fn wait_bound(server: &BroadcastServer) -> Option<SocketAddr> {
        for _ in 0..100 {
            if let Some(addr) = server.local_addr() {
                return Some(addr);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }

    #[test]
    fn test_invalid_identity_rejected() {
        let config = ServerConfig::default().stream_identity("no/slash");

        assert!(matches!(BroadcastServer::new(config), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_binds_after_occupant_releases() {
        let occupant = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = occupant.local_addr().unwrap();
        let server = server_on(addr, 3);
        let (tx, rx) = watch::channel(false);

        let task = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.serve(rx).await })
        };

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(server.local_addr().is_none());
        drop(occupant);

        assert_eq!(wait_bound(&server).await, Some(addr));

        tx.send(true).unwrap();
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_bind_retries_exhausted() {
        let occupant = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = occupant.local_addr().unwrap();
        let server = server_on(addr, 2);
        let (_tx, rx) = watch::channel(false);

        let err = server.serve(rx).await.unwrap_err();
        match err {
            Error::BindExhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error {}", other),
        }
        drop(occupant);
    }

    #[tokio::test]
    async fn test_shutdown_before_serve() {
        let server = server_on("127.0.0.1:0".parse().unwrap(), 0);
        let (_tx, rx) = watch::channel(true);

        assert!(server.serve(rx).await.is_ok());
        assert!(server.local_addr().is_none());
    }
}
