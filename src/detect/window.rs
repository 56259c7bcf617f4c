//! Detection window
//!
//! Restricts detection to a sub-rectangle of each frame. [`resolve`] is the
//! pure clamping rule; [`DetectionWindow`] wraps it with the configured
//! deactivation policy and the one-time degradation warning.

use super::rect::{Rect, Size};

/// Requested detection sub-rectangle
///
/// Active iff both width and height are positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowSpec {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl WindowSpec {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Spec that always detects on the full frame
    pub fn full_frame() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// What happens after a window degrades to full-frame detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPolicy {
    /// Stay on full-frame detection for the rest of the run
    Sticky,
    /// Re-evaluate the window on every frame
    PerFrame,
}

/// Result of resolving a window against a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    /// Region to run detection on, always inside the frame
    pub region: Rect,
    /// Whether `region` is a sub-window rather than the full frame
    pub active: bool,
    /// The spec was active but could not be fitted into the frame
    pub degraded: bool,
}

impl Resolved {
    fn full(bounds: Size, degraded: bool) -> Self {
        Self {
            region: Rect::full(bounds),
            active: false,
            degraded,
        }
    }
}

/// Clamp `spec` into `bounds`.
///
/// x and y are clamped into `[0, dim - 1]`, then width and height are cut so
/// the region ends inside the frame. An inactive spec, or one whose clamped
/// size is empty, resolves to the full frame with `active == false`.
pub fn resolve(bounds: Size, spec: &WindowSpec) -> Resolved {
    if !spec.is_active() {
        return Resolved::full(bounds, false);
    }

    let x = spec.x.clamp(0, (bounds.width - 1).max(0));
    let y = spec.y.clamp(0, (bounds.height - 1).max(0));
    let width = spec.width.min(bounds.width - x);
    let height = spec.height.min(bounds.height - y);

    if width <= 0 || height <= 0 {
        return Resolved::full(bounds, true);
    }

    Resolved {
        region: Rect::new(x, y, width, height),
        active: true,
        degraded: false,
    }
}

/// Stateful detection window applying a [`WindowPolicy`]
#[derive(Debug, Clone)]
pub struct DetectionWindow {
    spec: WindowSpec,
    policy: WindowPolicy,
    disabled: bool,
    warned: bool,
}

impl DetectionWindow {
    pub fn new(spec: WindowSpec, policy: WindowPolicy) -> Self {
        Self {
            spec,
            policy,
            disabled: false,
            warned: false,
        }
    }

    pub fn spec(&self) -> &WindowSpec {
        &self.spec
    }

    /// Whether a sticky degradation has switched the window off
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Resolve the detection region for a frame of the given size
    pub fn region_for(&mut self, bounds: Size) -> Resolved {
        if self.disabled {
            return Resolved::full(bounds, false);
        }

        let resolved = resolve(bounds, &self.spec);
        if resolved.degraded {
            if !self.warned {
                tracing::warn!(
                    x = self.spec.x,
                    y = self.spec.y,
                    width = self.spec.width,
                    height = self.spec.height,
                    frame_width = bounds.width,
                    frame_height = bounds.height,
                    policy = ?self.policy,
                    "Detection window does not fit the frame, using full frame"
                );
                self.warned = true;
            }
            if self.policy == WindowPolicy::Sticky {
                self.disabled = true;
            }
        }
        resolved
    }
}
