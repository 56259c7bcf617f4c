//! Encoder collaborator interface

use bytes::Bytes;

use crate::error::Result;

use super::annotate::Annotation;
use super::frame::Frame;

/// Downsample and compression settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeOptions {
    /// Resize factor applied on both axes before compression
    pub scale: f32,
    /// JPEG quality, 0-100
    pub jpeg_quality: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            scale: 0.5,
            jpeg_quality: 60,
        }
    }
}

/// Draws an annotation onto a frame and compresses the result
pub trait FrameEncoder: Send {
    fn encode(&mut self, frame: &Frame, annotation: &Annotation, options: &EncodeOptions)
        -> Result<Bytes>;
}

impl<F> FrameEncoder for F
where
    F: FnMut(&Frame, &Annotation, &EncodeOptions) -> Result<Bytes> + Send,
{
    fn encode(
        &mut self,
        frame: &Frame,
        annotation: &Annotation,
        options: &EncodeOptions,
    ) -> Result<Bytes> {
        self(frame, annotation, options)
    }
}
