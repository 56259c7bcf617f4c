//! Integer frame geometry

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle (origin top-left)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering the whole frame
    pub fn full(bounds: Size) -> Self {
        Self::new(0, 0, bounds.width, bounds.height)
    }

    /// Top-left corner
    pub fn origin(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Shift by an offset, keeping the size
    pub fn translate(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    /// Whether `self` lies entirely inside `bounds`
    pub fn is_within(&self, bounds: Size) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.width >= 0
            && self.height >= 0
            && self.x + self.width <= bounds.width
            && self.y + self.height <= bounds.height
    }
}
