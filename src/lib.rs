//! Live camera broadcast with detection overlays
//!
//! A single producer thread reads frames, runs an external detector on a
//! configurable window, annotates and encodes each frame, and fans the
//! result out to every WebSocket subscriber of `/camera<identity>`. A TCP
//! control channel reports per-frame telemetry to a supervising process,
//! which can terminate this one at any time.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use camcast::detect::{Detectors, Rect};
//! use camcast::pipeline::{Annotation, EncodeOptions, Frame, Pipeline, PipelineConfig, SyntheticSource};
//! use camcast::server::{signal, ProcessExit, ServerConfig, StreamServer};
//!
//! # async fn example() -> camcast::Result<()> {
//! let server = Arc::new(StreamServer::new(ServerConfig::default())?);
//! signal::install(Arc::clone(&server), Arc::new(ProcessExit));
//!
//! let pipeline = Pipeline::new(
//!     Box::new(SyntheticSource::new(640, 480, 300).looping()),
//!     Detectors::body_only(Box::new(|_: &Frame, _: Rect| Ok::<_, camcast::Error>(Vec::new()))),
//!     Box::new(|_: &Frame, _: &Annotation, _: &EncodeOptions| {
//!         Ok::<_, camcast::Error>(bytes::Bytes::new())
//!     }),
//!     PipelineConfig::default(),
//! );
//! server.start(pipeline).await
//! # }
//! ```

pub mod detect;
pub mod error;
pub mod manager;
pub mod pipeline;
pub mod registry;
pub mod server;

pub use error::{Error, Result};
pub use server::{ServerConfig, StreamServer};
