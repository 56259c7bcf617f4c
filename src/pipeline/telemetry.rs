//! Per-tick telemetry
//!
//! The same record feeds the subscriber JSON message and the supervisor
//! line protocol.

use std::time::Duration;

use serde::Serialize;

use crate::detect::Mode;
use crate::error::Result;

/// Lower bound on measured processing time, keeps FPS finite
const MIN_ELAPSED_SECS: f64 = 1e-6;

/// Processing rate implied by one detection pass
pub fn fps_from_elapsed(elapsed: Duration) -> f64 {
    1.0 / elapsed.as_secs_f64().max(MIN_ELAPSED_SECS)
}

/// Summary of one frame tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameTelemetry {
    pub detected_count: usize,
    pub mode: Mode,
    #[serde(serialize_with = "one_decimal")]
    pub fps: f64,
}

fn one_decimal<S: serde::Serializer>(fps: &f64, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64((fps * 10.0).round() / 10.0)
}

impl FrameTelemetry {
    pub fn new(detected_count: usize, mode: Mode, fps: f64) -> Self {
        Self {
            detected_count,
            mode,
            fps,
        }
    }

    /// `{"detectedCount":<n>,"mode":"<Face|Body>","fps":<x.y>}`
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Newline-terminated supervisor line, `<count>:<mode>:<fps>\n`
    pub fn to_line(&self) -> String {
        format!("{}:{}:{:.1}\n", self.detected_count, self.mode.name(), self.fps)
    }
}
