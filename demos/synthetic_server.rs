//! Synthetic camera stream
//!
//! Run with: cargo run --example synthetic_server [PORT] [--manager ADDR]
//!
//! Streams a looping synthetic source with a fake detector that sweeps one
//! box across the frame. The "encoded" frame is the overlay text, so any
//! WebSocket client can watch it:
//!
//!   websocat ws://localhost:5555/camera<identity>
//!
//! The detection mode flips between Face and Body every five seconds.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use camcast::detect::{Detectors, Rect};
use camcast::manager::ManagerConfig;
use camcast::pipeline::{
    Annotation, EncodeOptions, Frame, Pipeline, PipelineConfig, SyntheticSource,
};
use camcast::server::{signal, ProcessExit, ServerConfig, StreamServer, DEFAULT_PORT};

fn sweeping_detector() -> Box<dyn camcast::detect::Detector> {
    let mut x = 0;
    Box::new(move |frame: &Frame, region: Rect| {
        x = (x + 8) % frame.width.max(1);
        let hit = Rect::new(x.min(region.width.saturating_sub(64)).max(0), 40, 64, 128);
        Ok::<_, camcast::Error>(vec![hit])
    })
}

fn text_encoder(_: &Frame, annotation: &Annotation, _: &EncodeOptions) -> camcast::Result<Bytes> {
    let summary = format!("{} [{} boxes]", annotation.overlay, annotation.boxes.len());
    Ok(Bytes::from(summary))
}

fn print_usage() {
    eprintln!("Usage: synthetic_server [PORT] [--manager ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  PORT            Port to listen on (default: {})", DEFAULT_PORT);
    eprintln!("  --manager ADDR  Report telemetry to a supervisor at ADDR");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let mut port = DEFAULT_PORT;
    let mut manager: Option<SocketAddr> = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--manager" {
            match iter.next().map(|a| a.parse()) {
                Some(Ok(addr)) => manager = Some(addr),
                _ => {
                    print_usage();
                    std::process::exit(1);
                }
            }
        } else {
            match arg.parse() {
                Ok(p) => port = p,
                Err(_) => {
                    eprintln!("Error: invalid port '{}'", arg);
                    print_usage();
                    std::process::exit(1);
                }
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("camcast=debug".parse()?)
                .add_directive("synthetic_server=debug".parse()?),
        )
        .init();

    let mut server = StreamServer::new(ServerConfig::default().port(port))?;
    if let Some(addr) = manager {
        server = server.with_manager(ManagerConfig::with_addr(addr), Arc::new(ProcessExit));
    }
    let server = Arc::new(server);
    signal::install(Arc::clone(&server), Arc::new(ProcessExit));

    let pipeline = Pipeline::new(
        Box::new(SyntheticSource::new(640, 480, 300).looping().with_fps(15.0)),
        Detectors::new(sweeping_detector(), sweeping_detector()),
        Box::new(text_encoder),
        PipelineConfig::default(),
    );

    let modes = pipeline.mode_switch();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        interval.tick().await;
        loop {
            interval.tick().await;
            modes.toggle();
        }
    });

    println!("Streaming on ws://localhost:{}{}", port, server.identity().path());
    server.start(pipeline).await?;
    Ok(())
}
