//! Server lifecycle
//!
//! ```text
//! Created ──start()──► Starting ──► Running ──stop()──► Stopping ──► Stopped
//! ```
//!
//! `start` spawns the producer thread, connects the supervisor channel if one
//! is configured, and runs the listen sequence. `stop` is the single
//! cancellation point: an atomic exchange makes it idempotent, so signal
//! handling and normal control flow can both call it.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::manager::{ManagerChannel, ManagerConfig};
use crate::pipeline::Pipeline;
use crate::registry::{CloseReason, ConnectionRegistry};

use super::config::ServerConfig;
use super::halt::Halt;
use super::identity::StreamIdentity;
use super::listener::BroadcastServer;

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl LifecycleState {
    fn to_u8(self) -> u8 {
        match self {
            LifecycleState::Created => 0,
            LifecycleState::Starting => 1,
            LifecycleState::Running => 2,
            LifecycleState::Stopping => 3,
            LifecycleState::Stopped => 4,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => LifecycleState::Created,
            1 => LifecycleState::Starting,
            2 => LifecycleState::Running,
            3 => LifecycleState::Stopping,
            _ => LifecycleState::Stopped,
        }
    }
}

/// Broadcast server plus the producer thread and supervisor channel it
/// coordinates
pub struct StreamServer {
    server: BroadcastServer,
    manager: Option<ManagerChannel>,
    state: AtomicU8,
    stop_requested: AtomicBool,
    running: Arc<AtomicBool>,
    producer: Mutex<Option<JoinHandle<u64>>>,
    shutdown: watch::Sender<bool>,
}

impl StreamServer {
    /// Create a new server. Fails if an explicit stream identity is invalid.
    pub fn new(config: ServerConfig) -> Result<Self> {
        Ok(Self::from_server(BroadcastServer::new(config)?))
    }

    fn from_server(server: BroadcastServer) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            server,
            manager: None,
            state: AtomicU8::new(LifecycleState::Created.to_u8()),
            stop_requested: AtomicBool::new(false),
            running: Arc::new(AtomicBool::new(false)),
            producer: Mutex::new(None),
            shutdown,
        }
    }

    /// Connect to a supervisor on start. `halt` is invoked when the
    /// supervisor orders termination or goes away.
    pub fn with_manager(mut self, config: ManagerConfig, halt: Arc<dyn Halt>) -> Self {
        self.manager = Some(ManagerChannel::new(config, halt));
        self
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: LifecycleState) {
        self.state.store(state.to_u8(), Ordering::Release);
    }

    pub fn config(&self) -> &ServerConfig {
        self.server.config()
    }

    pub fn identity(&self) -> &StreamIdentity {
        self.server.identity()
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.server.registry()
    }

    /// Address actually bound, once listening
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.server.local_addr()
    }

    /// Start the producer and serve until stopped.
    ///
    /// Returns `Ok(())` after `stop`, or the listen error once bind retries
    /// are exhausted (the server is stopped before returning it).
    pub async fn start(&self, pipeline: Pipeline) -> Result<()> {
        let created = LifecycleState::Created.to_u8();
        let starting = LifecycleState::Starting.to_u8();
        if self
            .state
            .compare_exchange(created, starting, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyStarted);
        }
        tracing::info!(identity = %self.identity(), "Starting stream server");

        let mut pipeline = pipeline;
        if let Some(manager) = &self.manager {
            pipeline = pipeline.with_manager(manager.link());
        }

        if let Err(e) = self.spawn_producer(pipeline) {
            return self.abort_start(e).await;
        }
        self.set_state(LifecycleState::Running);

        let serve = self.server.serve(self.shutdown.subscribe());
        tokio::pin!(serve);
        let result = match &self.manager {
            // A serve error ends start without waiting out the connect retries
            Some(manager) => tokio::select! {
                result = &mut serve => result,
                _ = manager.connect(self.shutdown.subscribe()) => serve.await,
            },
            None => serve.await,
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) => self.abort_start(e).await,
        }
    }

    async fn abort_start(&self, e: Error) -> Result<()> {
        tracing::error!(error = %e, "Stream server failed");
        self.stop().await;
        Err(e)
    }

    fn spawn_producer(&self, pipeline: Pipeline) -> Result<()> {
        let producer =
            pipeline.into_producer(Arc::clone(self.registry()), self.config().send_metadata);
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::Release);

        let handle = std::thread::Builder::new()
            .name("frame-producer".into())
            .spawn(move || producer.run(&running))?;

        *self.producer.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    fn take_producer(&self) -> Option<JoinHandle<u64>> {
        self.producer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Stop the server. Only the first call does anything; it returns `true`.
    ///
    /// Order: stop and join the producer, close every subscriber with a
    /// going-away code, stop accepting, then wait `shutdown_grace` for
    /// in-flight sends.
    pub async fn stop(&self) -> bool {
        if self.stop_requested.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.set_state(LifecycleState::Stopping);
        tracing::info!("Stopping stream server");

        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.take_producer() {
            match tokio::task::spawn_blocking(move || handle.join()).await {
                Ok(Ok(ticks)) => tracing::debug!(ticks = ticks, "Frame producer joined"),
                Ok(Err(_)) => tracing::error!("Frame producer panicked"),
                Err(e) => tracing::error!(error = %e, "Failed to join frame producer"),
            }
        }

        self.registry().close_all(CloseReason::GoingAway);
        self.shutdown.send_replace(true);

        tokio::time::sleep(self.config().shutdown_grace).await;
        self.set_state(LifecycleState::Stopped);
        tracing::info!("Stream server stopped");
        true
    }
}

impl Drop for StreamServer {
    fn drop(&mut self) {
        if self.stop_requested.swap(true, Ordering::AcqRel) {
            return;
        }

        self.running.store(false, Ordering::Release);
        self.registry().close_all(CloseReason::GoingAway);
        self.shutdown.send_replace(true);

        if let Some(handle) = self.take_producer() {
            if handle.join().is_err() {
                tracing::error!("Frame producer panicked");
            }
        }
        self.set_state(LifecycleState::Stopped);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::detect::{Detectors, Rect};
    use crate::pipeline::{Annotation, EncodeOptions, Frame, PipelineConfig, SyntheticSource};

    fn pipeline() -> Pipeline {
        Pipeline::new(
            Box::new(SyntheticSource::new(8, 8, 1_000_000).with_fps(200.0)),
            Detectors::body_only(Box::new(|_: &Frame, _: Rect| Ok::<_, Error>(Vec::new()))),
            Box::new(|_: &Frame, _: &Annotation, _: &EncodeOptions| {
                Ok::<_, Error>(Bytes::from_static(b"jpeg"))
            }),
            PipelineConfig::default(),
        )
    }

    fn test_server() -> Arc<StreamServer> {
        let config = ServerConfig::with_addr("127.0.0.1:0".parse().unwrap())
            .shutdown_grace(Duration::from_millis(10));
        Arc::new(StreamServer::new(config).unwrap())
    }

    async fn wait_running(server: &StreamServer) {
        for _ in 0..200 {
            if server.local_addr().is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("server never bound");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_stop_tears_down_once() {
        let server = test_server();
        let task = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.start(pipeline()).await })
        };
        wait_running(&server).await;
        assert_eq!(server.state(), LifecycleState::Running);

        let (a, b) = tokio::join!(server.stop(), server.stop());
        assert!(a ^ b, "exactly one stop performs teardown");
        assert!(!server.stop().await);

        assert_eq!(server.state(), LifecycleState::Stopped);
        assert!(server.registry().is_closed());
        assert!(server.take_producer().is_none());
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_start_twice_rejected() {
        let server = test_server();
        let task = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.start(pipeline()).await })
        };
        wait_running(&server).await;

        assert!(matches!(server.start(pipeline()).await, Err(Error::AlreadyStarted)));

        server.stop().await;
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bind_failure_stops_server() {
        let occupant = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = ServerConfig::with_addr(occupant.local_addr().unwrap())
            .bind_retry(1, Duration::from_millis(10))
            .shutdown_grace(Duration::ZERO);
        let server = StreamServer::new(config).unwrap();

        let result = server.start(pipeline()).await;
        assert!(matches!(result, Err(Error::BindExhausted { .. })));
        assert_eq!(server.state(), LifecycleState::Stopped);
        assert!(!server.stop().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bind_failure_does_not_wait_for_supervisor() {
        let occupant = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let unreachable = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap()
        };
        let config = ServerConfig::with_addr(occupant.local_addr().unwrap())
            .bind_retry(0, Duration::ZERO)
            .shutdown_grace(Duration::ZERO);
        let manager = ManagerConfig::with_addr(unreachable).retries(5, Duration::from_secs(30));
        let server = StreamServer::new(config)
            .unwrap()
            .with_manager(manager, Arc::new(crate::server::RecordedHalt::new()));

        let result = tokio::time::timeout(Duration::from_secs(5), server.start(pipeline()))
            .await
            .expect("start waited on supervisor retries");
        assert!(matches!(result, Err(Error::BindExhausted { .. })));
        assert_eq!(server.state(), LifecycleState::Stopped);
    }

    #[test]
    fn test_drop_without_start() {
        let server = StreamServer::new(ServerConfig::default()).unwrap();
        assert_eq!(server.state(), LifecycleState::Created);
        drop(server);
    }
}
