//! Frame annotation
//!
//! Turns detector hits into the boxes and overlay line the encoder draws.
//! Drawing itself belongs to the [`FrameEncoder`](super::FrameEncoder).

use crate::detect::{Detection, Mode, Rect};

/// RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };
}

/// Everything to draw onto one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Boxes in full-frame coordinates
    pub boxes: Vec<Rect>,
    pub box_color: Color,
    pub box_thickness: i32,
    /// Overlay line, e.g. `Mode: Face ||| FPS: 29.8`
    pub overlay: String,
    /// Baseline origin of the overlay text
    pub overlay_origin: (i32, i32),
    pub overlay_color: Color,
}

/// Overlay line for a mode and FPS value
pub fn overlay_text(mode: Mode, fps: f64) -> String {
    format!("Mode: {} ||| FPS: {:.1}", mode.name(), fps)
}

/// Builds [`Annotation`]s from detections
#[derive(Debug, Clone, Default)]
pub struct FrameAnnotator;

impl FrameAnnotator {
    pub fn new() -> Self {
        Self
    }

    /// Map region-local hits into full-frame boxes.
    ///
    /// Hits are reshaped with the mode's margins and shifted by the origin
    /// of the region detection ran on. A full-frame region has origin (0, 0).
    pub fn place(&self, rects: &[Rect], region: Rect, mode: Mode) -> Vec<Rect> {
        let (dx, dy) = region.origin();
        rects
            .iter()
            .map(|r| mode.adjust(*r).translate(dx, dy))
            .collect()
    }

    pub fn annotate(&self, detection: &Detection, region: Rect, mode: Mode, fps: f64) -> Annotation {
        Annotation {
            boxes: self.place(&detection.rects, region, mode),
            box_color: Color::GREEN,
            box_thickness: 2,
            overlay: overlay_text(mode, fps),
            overlay_origin: (10, 30),
            overlay_color: Color::RED,
        }
    }
}
