//! Detector collaborator interface

use std::time::{Duration, Instant};

use crate::error::Result;
use crate::pipeline::Frame;

use super::mode::Mode;
use super::rect::Rect;

/// Object detector run on a frame region
///
/// Implementations crop `frame` to `region` themselves and return hits in
/// region-local coordinates (relative to `region`'s origin).
pub trait Detector: Send {
    fn detect(&mut self, frame: &Frame, region: Rect) -> Result<Vec<Rect>>;
}

impl<F> Detector for F
where
    F: FnMut(&Frame, Rect) -> Result<Vec<Rect>> + Send,
{
    fn detect(&mut self, frame: &Frame, region: Rect) -> Result<Vec<Rect>> {
        self(frame, region)
    }
}

/// Detector output for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Hits in region-local coordinates
    pub rects: Vec<Rect>,
    /// Time spent inside the detector
    pub elapsed: Duration,
}

/// Detector pathways keyed by [`Mode`]
///
/// A missing face detector falls back to the body detector.
pub struct Detectors {
    face: Option<Box<dyn Detector>>,
    body: Box<dyn Detector>,
}

impl Detectors {
    pub fn new(face: Box<dyn Detector>, body: Box<dyn Detector>) -> Self {
        Self {
            face: Some(face),
            body,
        }
    }

    /// Only a body detector is available
    pub fn body_only(body: Box<dyn Detector>) -> Self {
        Self { face: None, body }
    }

    pub fn has_face(&self) -> bool {
        self.face.is_some()
    }

    /// Detector used for `mode`
    pub fn select(&mut self, mode: Mode) -> &mut dyn Detector {
        match (mode, self.face.as_mut()) {
            (Mode::Face, Some(face)) => face.as_mut(),
            _ => self.body.as_mut(),
        }
    }

    /// Run the detector for `mode` on `region`, timing the call
    pub fn run(&mut self, mode: Mode, frame: &Frame, region: Rect) -> Result<Detection> {
        let started = Instant::now();
        let rects = self.select(mode).detect(frame, region)?;
        Ok(Detection {
            rects,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(hits: Vec<Rect>) -> Box<dyn Detector> {
        Box::new(move |_: &Frame, _: Rect| Ok::<_, crate::Error>(hits.clone()))
    }

    #[test]
    fn test_select_by_mode() {
        let frame = Frame::blank(10, 10);
        let mut detectors = Detectors::new(
            fixed(vec![Rect::new(1, 1, 1, 1)]),
            fixed(vec![Rect::new(2, 2, 2, 2), Rect::new(3, 3, 3, 3)]),
        );
        let region = Rect::full(frame.size());

        assert_eq!(detectors.run(Mode::Face, &frame, region).unwrap().rects.len(), 1);
        assert_eq!(detectors.run(Mode::Body, &frame, region).unwrap().rects.len(), 2);
    }

    #[test]
    fn test_face_falls_back_to_body() {
        let frame = Frame::blank(10, 10);
        let mut detectors = Detectors::body_only(fixed(vec![Rect::new(2, 2, 2, 2)]));

        assert!(!detectors.has_face());
        let detection = detectors
            .run(Mode::Face, &frame, Rect::full(frame.size()))
            .unwrap();
        assert_eq!(detection.rects, vec![Rect::new(2, 2, 2, 2)]);
    }
}
