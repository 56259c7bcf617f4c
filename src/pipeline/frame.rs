//! Raw frame type

use bytes::Bytes;

use crate::detect::Size;

/// A decoded frame as handed out by a [`FrameSource`](super::FrameSource)
///
/// Pixel layout is whatever the source and encoder agree on; the pipeline
/// only looks at the dimensions.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
    /// Pixel data (zero-copy via reference counting)
    pub data: Bytes,
}

impl Frame {
    pub fn new(width: i32, height: i32, data: Bytes) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// Frame with no pixel data
    pub fn blank(width: i32, height: i32) -> Self {
        Self::new(width, height, Bytes::new())
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}
