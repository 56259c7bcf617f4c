//! Frame producer loop
//!
//! One sequential loop per server: read a frame, detect, annotate, encode,
//! broadcast, push telemetry, sleep until the next tick. It runs on its own
//! OS thread because detection and encoding are blocking CPU work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::detect::{Detection, DetectionWindow, Detectors, ModeSwitch, Rect};
use crate::error::Result;
use crate::manager::ManagerLink;
use crate::registry::{BroadcastPayload, BroadcastReport, ConnectionRegistry};

use super::annotate::FrameAnnotator;
use super::config::PipelineConfig;
use super::encode::FrameEncoder;
use super::frame::Frame;
use super::source::{FrameSource, SourceKind};
use super::telemetry::{fps_from_elapsed, FrameTelemetry};

/// Everything produced by one tick
#[derive(Debug, Clone)]
pub struct FrameTick {
    /// Region detection ran on
    pub region: Rect,
    pub detection: Detection,
    pub telemetry: FrameTelemetry,
    /// Encoded frame
    pub payload: Bytes,
    pub report: BroadcastReport,
}

/// Result of one loop iteration
#[derive(Debug)]
pub enum Step {
    /// A frame went out
    Tick(Box<FrameTick>),
    /// The frame could not be processed and was dropped
    Skipped,
    /// A file source reached its end and was rewound
    Rewound,
    /// A live source ended
    Exhausted,
}

/// Collaborators and settings for the producer
pub struct Pipeline {
    source: Box<dyn FrameSource>,
    detectors: Detectors,
    encoder: Box<dyn FrameEncoder>,
    config: PipelineConfig,
    mode: ModeSwitch,
    manager: ManagerLink,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn FrameSource>,
        detectors: Detectors,
        encoder: Box<dyn FrameEncoder>,
        config: PipelineConfig,
    ) -> Self {
        let mode = ModeSwitch::new(config.initial_mode);
        Self {
            source,
            detectors,
            encoder,
            config,
            mode,
            manager: ManagerLink::disconnected(),
        }
    }

    /// Push per-tick telemetry to the supervisor
    pub fn with_manager(mut self, link: ManagerLink) -> Self {
        self.manager = link;
        self
    }

    /// Handle for toggling the mode while running
    pub fn mode_switch(&self) -> ModeSwitch {
        self.mode.clone()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Bind the pipeline to the registry it broadcasts into.
    ///
    /// With `send_metadata` each tick sends a JSON text message before the
    /// binary frame; without it only the binary frame is sent.
    pub fn into_producer(self, registry: Arc<ConnectionRegistry>, send_metadata: bool) -> Producer {
        let window = DetectionWindow::new(self.config.window, self.config.window_policy);
        Producer {
            source: self.source,
            detectors: self.detectors,
            encoder: self.encoder,
            annotator: FrameAnnotator::new(),
            window,
            mode: self.mode,
            manager: self.manager,
            config: self.config,
            registry,
            send_metadata,
            rewound_empty: false,
        }
    }
}

/// The running producer
pub struct Producer {
    source: Box<dyn FrameSource>,
    detectors: Detectors,
    encoder: Box<dyn FrameEncoder>,
    annotator: FrameAnnotator,
    window: DetectionWindow,
    mode: ModeSwitch,
    manager: ManagerLink,
    config: PipelineConfig,
    registry: Arc<ConnectionRegistry>,
    send_metadata: bool,
    /// Rewound without producing a frame since
    rewound_empty: bool,
}

impl Producer {
    /// Delay between ticks
    pub fn frame_delay(&self) -> Duration {
        self.config.frame_delay(self.source.frame_rate())
    }

    /// Run one iteration. Only frame source failures are returned as errors.
    pub fn step(&mut self) -> Result<Step> {
        let frame = match self.source.next_frame()? {
            Some(frame) if !frame.is_empty() => frame,
            _ => return self.end_of_stream(),
        };
        self.rewound_empty = false;

        match self.process(&frame) {
            Ok(tick) => Ok(Step::Tick(Box::new(tick))),
            Err(e) => {
                tracing::warn!(error = %e, "Frame dropped");
                Ok(Step::Skipped)
            }
        }
    }

    fn end_of_stream(&mut self) -> Result<Step> {
        match self.source.kind() {
            // A file that yields nothing right after a rewind will never
            // yield anything
            SourceKind::File if !self.rewound_empty => {
                self.source.rewind()?;
                self.rewound_empty = true;
                tracing::debug!("Source rewound");
                Ok(Step::Rewound)
            }
            _ => Ok(Step::Exhausted),
        }
    }

    fn process(&mut self, frame: &Frame) -> Result<FrameTick> {
        let mode = self.mode.get();
        let resolved = self.window.region_for(frame.size());

        let detection = self.detectors.run(mode, frame, resolved.region)?;
        let fps = fps_from_elapsed(detection.elapsed);

        let annotation = self
            .annotator
            .annotate(&detection, resolved.region, mode, fps);
        let payload = self
            .encoder
            .encode(frame, &annotation, &self.config.encode)?;

        let telemetry = FrameTelemetry::new(detection.rects.len(), mode, fps);

        let mut payloads = Vec::with_capacity(2);
        if self.send_metadata {
            payloads.push(BroadcastPayload::text(telemetry.to_json()?));
        }
        payloads.push(BroadcastPayload::binary(payload.clone()));

        let report = self.registry.broadcast(&payloads);
        self.manager.push(&telemetry);

        Ok(FrameTick {
            region: resolved.region,
            detection,
            telemetry,
            payload,
            report,
        })
    }

    /// Tick at the source cadence until `running` is cleared or a live
    /// source ends. Returns the number of frames sent.
    pub fn run(mut self, running: &AtomicBool) -> u64 {
        let delay = self.frame_delay();
        let mut ticks = 0u64;

        tracing::info!(
            delay_ms = delay.as_millis() as u64,
            mode = %self.mode.get(),
            metadata = self.send_metadata,
            "Frame producer started"
        );

        while running.load(Ordering::Acquire) {
            match self.step() {
                Ok(Step::Tick(_)) => ticks += 1,
                Ok(Step::Skipped) => {}
                Ok(Step::Rewound) => continue,
                Ok(Step::Exhausted) => {
                    tracing::info!("Frame source ended");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Frame source failed");
                    break;
                }
            }
            std::thread::sleep(delay);
        }

        tracing::info!(ticks = ticks, "Frame producer stopped");
        ticks
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::*;
    use crate::detect::{Mode, WindowPolicy, WindowSpec};
    use crate::error::Error;
    use crate::pipeline::{Annotation, EncodeOptions, SyntheticSource};
    use crate::registry::{Outbound, PayloadKind};

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn boxes_encoder() -> Box<dyn FrameEncoder> {
        // Encodes the number of boxes so tests can see what was drawn
        Box::new(|_: &Frame, a: &Annotation, _: &EncodeOptions| {
            Ok::<_, Error>(Bytes::from(vec![a.boxes.len() as u8]))
        })
    }

    fn detectors(hits: Vec<Rect>) -> Detectors {
        Detectors::body_only(Box::new(move |_: &Frame, _: Rect| Ok::<_, Error>(hits.clone())))
    }

    fn producer(source: SyntheticSource, hits: Vec<Rect>, config: PipelineConfig) -> Producer {
        Pipeline::new(Box::new(source), detectors(hits), boxes_encoder(), config)
            .into_producer(Arc::new(ConnectionRegistry::new()), true)
    }

    #[test]
    fn test_tick_broadcasts_json_then_binary() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (_, mut rx) = registry.register(peer(), 8).unwrap();
        let mut producer = Pipeline::new(
            Box::new(SyntheticSource::new(64, 48, 1)),
            detectors(vec![Rect::new(0, 0, 10, 10)]),
            boxes_encoder(),
            PipelineConfig::default().initial_mode(Mode::Body),
        )
        .into_producer(Arc::clone(&registry), true);

        let tick = match producer.step().unwrap() {
            Step::Tick(tick) => tick,
            other => panic!("unexpected step {:?}", other),
        };
        assert_eq!(tick.telemetry.detected_count, 1);
        assert_eq!(tick.report.delivered, 1);

        match rx.try_recv().unwrap() {
            Outbound::Payload(p) => {
                assert_eq!(p.kind, PayloadKind::Text);
                let json = std::str::from_utf8(&p.data).unwrap();
                assert!(json.starts_with(r#"{"detectedCount":1,"mode":"Body","fps":"#));
            }
            other => panic!("unexpected {:?}", other),
        }
        match rx.try_recv().unwrap() {
            Outbound::Payload(p) => {
                assert_eq!(p.kind, PayloadKind::Binary);
                assert_eq!(&p.data[..], &[1u8]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_binary_only_variant() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (_, mut rx) = registry.register(peer(), 8).unwrap();
        let mut producer = Pipeline::new(
            Box::new(SyntheticSource::new(64, 48, 1)),
            detectors(Vec::new()),
            boxes_encoder(),
            PipelineConfig::default(),
        )
        .into_producer(Arc::clone(&registry), false);

        assert!(matches!(producer.step().unwrap(), Step::Tick(_)));
        assert!(matches!(
            rx.try_recv().unwrap(),
            Outbound::Payload(ref p) if p.kind == PayloadKind::Binary
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_window_hits_translated() {
        let config = PipelineConfig::default()
            .initial_mode(Mode::Face)
            .window(WindowSpec::new(100, 50, 200, 200), WindowPolicy::Sticky);
        let mut producer = producer(
            SyntheticSource::new(640, 480, 1),
            vec![Rect::new(10, 10, 50, 50)],
            config,
        );

        let tick = match producer.step().unwrap() {
            Step::Tick(tick) => tick,
            other => panic!("unexpected step {:?}", other),
        };
        assert_eq!(tick.region, Rect::new(100, 50, 200, 200));
        // Raw hits stay region-local
        assert_eq!(tick.detection.rects, vec![Rect::new(10, 10, 50, 50)]);
    }

    #[test]
    fn test_live_source_exhausts() {
        let mut producer = producer(SyntheticSource::new(8, 8, 2), Vec::new(), PipelineConfig::default());

        assert!(matches!(producer.step().unwrap(), Step::Tick(_)));
        assert!(matches!(producer.step().unwrap(), Step::Tick(_)));
        assert!(matches!(producer.step().unwrap(), Step::Exhausted));
    }

    #[test]
    fn test_file_source_loops() {
        let mut producer = producer(
            SyntheticSource::new(8, 8, 2).looping(),
            Vec::new(),
            PipelineConfig::default(),
        );

        assert!(matches!(producer.step().unwrap(), Step::Tick(_)));
        assert!(matches!(producer.step().unwrap(), Step::Tick(_)));
        assert!(matches!(producer.step().unwrap(), Step::Rewound));
        assert!(matches!(producer.step().unwrap(), Step::Tick(_)));
    }

    #[test]
    fn test_empty_file_source_exhausts() {
        let mut producer = producer(
            SyntheticSource::new(8, 8, 0).looping(),
            Vec::new(),
            PipelineConfig::default(),
        );

        assert!(matches!(producer.step().unwrap(), Step::Rewound));
        assert!(matches!(producer.step().unwrap(), Step::Exhausted));
    }

    #[test]
    fn test_detector_error_skips_frame() {
        let failing = Detectors::body_only(Box::new(|_: &Frame, _: Rect| {
            Err::<Vec<Rect>, _>(Error::Detector("model unavailable".into()))
        }));
        let mut producer = Pipeline::new(
            Box::new(SyntheticSource::new(8, 8, 1)),
            failing,
            boxes_encoder(),
            PipelineConfig::default(),
        )
        .into_producer(Arc::new(ConnectionRegistry::new()), true);

        assert!(matches!(producer.step().unwrap(), Step::Skipped));
    }

    #[test]
    fn test_run_stops_on_live_end() {
        let producer = producer(
            SyntheticSource::new(8, 8, 3).with_fps(1000.0),
            Vec::new(),
            PipelineConfig::default(),
        );
        let running = AtomicBool::new(true);

        assert_eq!(producer.run(&running), 3);
    }

    #[test]
    fn test_run_honours_running_flag() {
        let producer = producer(
            SyntheticSource::new(8, 8, 3).with_fps(1000.0),
            Vec::new(),
            PipelineConfig::default(),
        );
        let running = AtomicBool::new(false);

        assert_eq!(producer.run(&running), 0);
    }
}
