//! Detection geometry and the detector seam
//!
//! Image-space detection itself is supplied from outside through the
//! [`Detector`] trait. This module owns everything around it: where on the
//! frame to run ([`DetectionWindow`]), which pathway runs ([`Mode`],
//! [`Detectors`]), and how hits are reshaped before drawing
//! ([`Mode::adjust`]).

pub mod detector;
pub mod mode;
pub mod rect;
pub mod window;

pub use detector::{Detection, Detector, Detectors};
pub use mode::{Margins, Mode, ModeSwitch};
pub use rect::{Rect, Size};
pub use window::{resolve, DetectionWindow, Resolved, WindowPolicy, WindowSpec};
