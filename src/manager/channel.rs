//! Supervisor control channel
//!
//! A TCP client to the supervising process. While connected, the producer
//! pushes one telemetry line per tick through a [`ManagerLink`] and a
//! listener task watches the socket for the termination marker.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};

use crate::pipeline::FrameTelemetry;
use crate::server::Halt;

use super::config::ManagerConfig;
use super::protocol::inspect_read;

/// Connection state of the supervisor link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

impl LinkState {
    fn to_u8(self) -> u8 {
        match self {
            LinkState::Disconnected => 0,
            LinkState::Connecting => 1,
            LinkState::Connected => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => LinkState::Connecting,
            2 => LinkState::Connected,
            _ => LinkState::Disconnected,
        }
    }
}

struct LinkInner {
    state: AtomicU8,
    tx: Mutex<Option<mpsc::Sender<String>>>,
}

/// Telemetry handle to the supervisor
///
/// Cheap to clone. Every operation is a no-op while disconnected, so the
/// producer can push unconditionally.
#[derive(Clone)]
pub struct ManagerLink {
    inner: Arc<LinkInner>,
}

impl ManagerLink {
    /// A link that never connects
    pub fn disconnected() -> Self {
        Self {
            inner: Arc::new(LinkInner {
                state: AtomicU8::new(LinkState::Disconnected.to_u8()),
                tx: Mutex::new(None),
            }),
        }
    }

    fn tx(&self) -> MutexGuard<'_, Option<mpsc::Sender<String>>> {
        self.inner.tx.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> LinkState {
        LinkState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    fn set_state(&self, state: LinkState) {
        self.inner.state.store(state.to_u8(), Ordering::Release);
    }

    fn attach(&self, tx: mpsc::Sender<String>) {
        *self.tx() = Some(tx);
        self.set_state(LinkState::Connected);
    }

    /// Best-effort telemetry push. Returns whether the line was queued.
    pub fn push(&self, telemetry: &FrameTelemetry) -> bool {
        if !self.is_connected() {
            return false;
        }
        match self.tx().as_ref() {
            Some(tx) => match tx.try_send(telemetry.to_line()) {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(error = %e, "Telemetry line dropped");
                    false
                }
            },
            None => false,
        }
    }

    /// Invalidate the link. Further pushes are skipped.
    pub fn close(&self) {
        self.tx().take();
        self.set_state(LinkState::Disconnected);
    }
}

impl Default for ManagerLink {
    fn default() -> Self {
        Self::disconnected()
    }
}

/// Supervisor channel: connect with bounded retry, then run the writer and
/// listener tasks
pub struct ManagerChannel {
    config: ManagerConfig,
    link: ManagerLink,
    halt: Arc<dyn Halt>,
}

impl ManagerChannel {
    pub fn new(config: ManagerConfig, halt: Arc<dyn Halt>) -> Self {
        Self {
            config,
            link: ManagerLink::disconnected(),
            halt,
        }
    }

    /// Handle for pushing telemetry
    pub fn link(&self) -> ManagerLink {
        self.link.clone()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Connect to the supervisor.
    ///
    /// Tries up to `connect_attempts` times with `retry_delay` between
    /// attempts. On failure the link stays disconnected and no further
    /// attempts are made. `shutdown` abandons pending attempts, and later
    /// ends the listener without halting.
    pub async fn connect(&self, mut shutdown: watch::Receiver<bool>) -> bool {
        self.link.set_state(LinkState::Connecting);
        let attempts = self.config.connect_attempts.max(1);

        for attempt in 1..=attempts {
            if *shutdown.borrow() {
                break;
            }
            let connected = tokio::select! {
                result = TcpStream::connect(self.config.addr) => result,
                _ = shutdown.changed() => break,
            };
            match connected {
                Ok(stream) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        tracing::debug!(error = %e, "Failed to set TCP_NODELAY on supervisor socket");
                    }
                    tracing::info!(addr = %self.config.addr, attempt = attempt, "Connected to supervisor");
                    self.spawn_tasks(stream, shutdown);
                    return true;
                }
                Err(e) => {
                    tracing::warn!(
                        addr = %self.config.addr,
                        attempt = attempt,
                        attempts = attempts,
                        error = %e,
                        "Supervisor connection failed"
                    );
                    if attempt < attempts {
                        tokio::select! {
                            _ = tokio::time::sleep(self.config.retry_delay) => {}
                            _ = shutdown.changed() => break,
                        }
                    }
                }
            }
        }

        if *shutdown.borrow() {
            tracing::debug!("Supervisor connection abandoned on shutdown");
        } else {
            tracing::error!(addr = %self.config.addr, "Giving up on supervisor connection");
        }
        self.link.set_state(LinkState::Disconnected);
        false
    }

    fn spawn_tasks(&self, stream: TcpStream, shutdown: watch::Receiver<bool>) {
        let (reader, writer) = stream.into_split();
        let (tx, rx) = mpsc::channel(self.config.telemetry_capacity.max(1));
        self.link.attach(tx);

        tokio::spawn(write_telemetry(writer, rx, self.link.clone()));
        tokio::spawn(listen(
            reader,
            self.config.clone(),
            Arc::clone(&self.halt),
            self.link.clone(),
            shutdown,
        ));
    }
}

async fn write_telemetry(
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::Receiver<String>,
    link: ManagerLink,
) {
    while let Some(line) = rx.recv().await {
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            tracing::warn!(error = %e, "Supervisor telemetry write failed");
            link.close();
            break;
        }
    }
}

/// Poll the supervisor socket until shutdown or a halt condition.
async fn listen(
    mut reader: OwnedReadHalf,
    config: ManagerConfig,
    halt: Arc<dyn Halt>,
    link: ManagerLink,
    shutdown: watch::Receiver<bool>,
) {
    let mut buf = [0u8; 1024];

    loop {
        if *shutdown.borrow() {
            tracing::debug!("Supervisor listener stopped");
            link.close();
            return;
        }

        let read = match tokio::time::timeout(config.poll_timeout, reader.read(&mut buf)).await {
            Ok(read) => read,
            Err(_) => continue,
        };

        if let Some(reason) = inspect_read(&read, &buf, config.termination_marker) {
            link.close();
            match read {
                Err(ref e) => tracing::error!(error = %e, "Supervisor read failed"),
                Ok(_) => tracing::warn!(reason = %reason, "Supervisor requested halt"),
            }
            if reason != crate::server::HaltReason::TerminationMarker {
                tokio::time::sleep(config.loss_grace).await;
            }
            halt.halt(reason);
            return;
        }
    }
}
