//! OS signal handling
//!
//! Interrupt and terminate signals run the normal [`StreamServer::stop`]
//! path, then force the process down `force_exit_delay` after the signal
//! whether or not that cleanup has finished.

use std::future::Future;
use std::io;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::halt::{Halt, HaltReason};
use super::lifecycle::StreamServer;

/// Resolves on Ctrl+C or SIGTERM
#[cfg(unix)]
pub async fn termination_signal() -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

/// Resolves on Ctrl+C
#[cfg(not(unix))]
pub async fn termination_signal() -> io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Wait for `signal`, stop `server`, then halt.
///
/// The halt happens at `force_exit_delay` after the signal even if `stop` is
/// still waiting on a stuck producer.
pub async fn shutdown_on<F>(signal: F, server: Arc<StreamServer>, halt: Arc<dyn Halt>)
where
    F: Future<Output = ()>,
{
    signal.await;
    let deadline = Instant::now() + server.config().force_exit_delay;
    tracing::info!("Shutdown signal received");

    if tokio::time::timeout_at(deadline, server.stop()).await.is_err() {
        tracing::warn!("Cleanup did not finish before the forced exit");
    }
    tokio::time::sleep_until(deadline).await;
    halt.halt(HaltReason::Signal);
}

/// Install the signal handler for `server`
pub fn install(server: Arc<StreamServer>, halt: Arc<dyn Halt>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let signal = async {
            if let Err(e) = termination_signal().await {
                tracing::error!(error = %e, "Failed to listen for termination signals");
                std::future::pending::<()>().await;
            }
        };
        shutdown_on(signal, server, halt).await;
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::detect::{Detectors, Rect};
    use crate::error::Error;
    use crate::pipeline::{Annotation, EncodeOptions, Frame, Pipeline, PipelineConfig, SyntheticSource};
    use crate::server::{LifecycleState, RecordedHalt, ServerConfig};

    #[tokio::test]
    async fn test_signal_stops_then_halts() {
        let config = ServerConfig::with_addr("127.0.0.1:0".parse().unwrap())
            .shutdown_grace(Duration::ZERO)
            .force_exit_delay(Duration::from_millis(200));
        let server = Arc::new(StreamServer::new(config).unwrap());
        let halt = Arc::new(RecordedHalt::new());

        shutdown_on(std::future::ready(()), Arc::clone(&server), halt.clone()).await;

        assert_eq!(server.state(), LifecycleState::Stopped);
        assert!(server.registry().is_closed());
        assert_eq!(halt.reasons(), vec![HaltReason::Signal]);
    }

    #[tokio::test]
    async fn test_signal_after_stop_still_halts() {
        let config = ServerConfig::with_addr("127.0.0.1:0".parse().unwrap())
            .shutdown_grace(Duration::ZERO)
            .force_exit_delay(Duration::ZERO);
        let server = Arc::new(StreamServer::new(config).unwrap());
        let halt = Arc::new(RecordedHalt::new());

        assert!(server.stop().await);
        shutdown_on(std::future::ready(()), Arc::clone(&server), halt.clone()).await;

        assert_eq!(halt.last(), Some(HaltReason::Signal));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stuck_producer_still_halts() {
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let detector = move |_: &Frame, _: Rect| {
            let _ = entered_tx.send(());
            let _ = release_rx.recv_timeout(Duration::from_secs(30));
            Ok::<_, Error>(Vec::new())
        };
        let pipeline = Pipeline::new(
            Box::new(SyntheticSource::new(8, 8, 10)),
            Detectors::body_only(Box::new(detector)),
            Box::new(|_: &Frame, _: &Annotation, _: &EncodeOptions| {
                Ok::<_, Error>(Bytes::from_static(b"jpeg"))
            }),
            PipelineConfig::default(),
        );

        let config = ServerConfig::with_addr("127.0.0.1:0".parse().unwrap())
            .shutdown_grace(Duration::ZERO)
            .force_exit_delay(Duration::from_millis(50));
        let server = Arc::new(StreamServer::new(config).unwrap());
        let halt = Arc::new(RecordedHalt::new());

        let _task = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.start(pipeline).await })
        };
        tokio::task::spawn_blocking(move || entered_rx.recv_timeout(Duration::from_secs(5)))
            .await
            .unwrap()
            .unwrap();

        let finished = tokio::time::timeout(
            Duration::from_secs(2),
            shutdown_on(std::future::ready(()), Arc::clone(&server), halt.clone()),
        )
        .await;
        assert!(finished.is_ok(), "halt must not wait for the producer");
        assert_eq!(halt.reasons(), vec![HaltReason::Signal]);

        // Let the producer thread finish so the runtime can shut down
        drop(release_tx);
    }
}
