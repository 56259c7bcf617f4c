//! Detection modes and their rectangle margins
//!
//! Each mode carries a margin profile used to turn a raw detector hit into
//! the box that gets drawn. Body hits from a people detector are loose, so
//! they are shrunk; face hits are tight, so they are grown.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde::Serialize;

use super::rect::Rect;

/// Which detector pathway is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Mode {
    Face,
    Body,
}

/// Per-mode rectangle adjustment, as fractions of the detected size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    /// Origin shift along x (positive moves right)
    pub offset_x: f64,
    /// Origin shift along y (positive moves down)
    pub offset_y: f64,
    /// Final width scale
    pub scale_x: f64,
    /// Final height scale
    pub scale_y: f64,
}

const BODY_MARGINS: Margins = Margins {
    offset_x: 0.1,
    offset_y: 0.07,
    scale_x: 0.8,
    scale_y: 0.8,
};

const FACE_MARGINS: Margins = Margins {
    offset_x: -0.1,
    offset_y: -0.1,
    scale_x: 1.2,
    scale_y: 1.2,
};

impl Mode {
    /// Display name used in overlays and telemetry
    pub fn name(self) -> &'static str {
        match self {
            Mode::Face => "Face",
            Mode::Body => "Body",
        }
    }

    pub fn margins(self) -> Margins {
        match self {
            Mode::Face => FACE_MARGINS,
            Mode::Body => BODY_MARGINS,
        }
    }

    pub fn toggled(self) -> Mode {
        match self {
            Mode::Face => Mode::Body,
            Mode::Body => Mode::Face,
        }
    }

    /// Apply this mode's margins to a detector rectangle.
    ///
    /// Offsets and sizes are computed from the original size and rounded to
    /// the nearest pixel independently, so the result only depends on the
    /// rectangle's size and is shifted along with its origin.
    pub fn adjust(self, r: Rect) -> Rect {
        let m = self.margins();
        let w = r.width as f64;
        let h = r.height as f64;

        Rect {
            x: r.x + (w * m.offset_x).round() as i32,
            y: r.y + (h * m.offset_y).round() as i32,
            width: (w * m.scale_x).round() as i32,
            height: (h * m.scale_y).round() as i32,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Mode::Face => 0,
            Mode::Body => 1,
        }
    }

    fn from_u8(v: u8) -> Mode {
        if v == 1 {
            Mode::Body
        } else {
            Mode::Face
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared, externally togglable mode
///
/// Cloning yields another handle to the same mode.
#[derive(Debug, Clone)]
pub struct ModeSwitch {
    inner: Arc<AtomicU8>,
}

impl ModeSwitch {
    pub fn new(mode: Mode) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(mode.to_u8())),
        }
    }

    pub fn get(&self) -> Mode {
        Mode::from_u8(self.inner.load(Ordering::Relaxed))
    }

    pub fn set(&self, mode: Mode) {
        self.inner.store(mode.to_u8(), Ordering::Relaxed);
    }

    /// Flip between Face and Body, returning the new mode
    pub fn toggle(&self) -> Mode {
        let prev = self.inner.fetch_xor(1, Ordering::Relaxed);
        let mode = Mode::from_u8(prev ^ 1);
        tracing::info!(mode = %mode, "Detection mode toggled");
        mode
    }
}
