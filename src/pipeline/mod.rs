//! Frame processing pipeline
//!
//! ```text
//! FrameSource ─► DetectionWindow ─► Detectors ─► FrameAnnotator ─► FrameEncoder
//!                                                                      │
//!                      ManagerLink::push ◄── FrameTelemetry ◄──────────┤
//!                                                                      ▼
//!                                               ConnectionRegistry::broadcast
//! ```
//!
//! Decoding, detection, drawing and compression are collaborators supplied
//! through [`FrameSource`], [`crate::detect::Detector`] and [`FrameEncoder`].

pub mod annotate;
pub mod config;
pub mod encode;
pub mod frame;
pub mod producer;
pub mod source;
pub mod telemetry;

pub use annotate::{overlay_text, Annotation, Color, FrameAnnotator};
pub use config::PipelineConfig;
pub use encode::{EncodeOptions, FrameEncoder};
pub use frame::Frame;
pub use producer::{FrameTick, Pipeline, Producer, Step};
pub use source::{FrameSource, SourceKind, SyntheticSource};
pub use telemetry::{fps_from_elapsed, FrameTelemetry};
