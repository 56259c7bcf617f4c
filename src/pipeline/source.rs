//! Frame sources
//!
//! Decoding is supplied from outside through [`FrameSource`]. File-backed
//! sources loop on end-of-stream; live sources end the producer loop.

use bytes::Bytes;

use crate::error::Result;

use super::frame::Frame;

/// How a source behaves at end-of-stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Finite input that is rewound and replayed
    File,
    /// Camera or other live device; end-of-stream is final
    Live,
}

/// Producer-side frame supplier
pub trait FrameSource: Send {
    /// Next frame, or `None` at end-of-stream
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Seek back to the first frame (file sources only)
    fn rewind(&mut self) -> Result<()>;

    fn kind(&self) -> SourceKind;

    /// Native frame rate, if the source knows it
    fn frame_rate(&self) -> Option<f64> {
        None
    }
}

/// In-memory source producing a fixed number of blank frames
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    width: i32,
    height: i32,
    frames: u64,
    position: u64,
    kind: SourceKind,
    fps: Option<f64>,
}

impl SyntheticSource {
    /// `frames` blank frames of `width`x`height`, behaving as a live source
    pub fn new(width: i32, height: i32, frames: u64) -> Self {
        Self {
            width,
            height,
            frames,
            position: 0,
            kind: SourceKind::Live,
            fps: None,
        }
    }

    /// Behave as a file source (loop on end-of-stream)
    pub fn looping(mut self) -> Self {
        self.kind = SourceKind::File;
        self
    }

    /// Report a native frame rate
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = Some(fps);
        self
    }

    /// Frames handed out since the last rewind
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.position >= self.frames {
            return Ok(None);
        }
        self.position += 1;

        // Stamp the frame number so encoders can tell frames apart
        let data = Bytes::copy_from_slice(&self.position.to_be_bytes());
        Ok(Some(Frame::new(self.width, self.height, data)))
    }

    fn rewind(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn frame_rate(&self) -> Option<f64> {
        self.fps
    }
}
