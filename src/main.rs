//! Demo binary: runs the detection pipeline against a live backend with a
//! synthetic test-pattern camera and prints events until the target is
//! detected.
//!
//! Usage:
//!   signify-pipeline B
//!   signify-pipeline --word HELLO --endpoint ws://10.0.0.5:8000/ws

use std::time::Duration;

use anyhow::{bail, Context};
use image::{Rgba, RgbaImage};
use tracing::info;

use signify_pipeline::{
    logging, CameraPort, CaptureError, DetectionEvent, PipelineConfig, SignDetection,
};

/// Synthetic camera producing a moving gradient so encoded frames differ
struct TestPatternCamera {
    frame_index: u32,
}

impl TestPatternCamera {
    fn new() -> Self {
        Self { frame_index: 0 }
    }
}

impl CameraPort for TestPatternCamera {
    fn is_ready(&self) -> bool {
        true
    }

    fn capture_frame(&mut self) -> Result<RgbaImage, CaptureError> {
        self.frame_index = self.frame_index.wrapping_add(1);
        let shift = (self.frame_index % 256) as u8;
        let frame = RgbaImage::from_fn(640, 480, |x, y| {
            Rgba([
                (x % 256) as u8,
                (y % 256) as u8,
                shift,
                255,
            ])
        });
        Ok(frame)
    }
}

struct Args {
    target: Target,
    endpoint: Option<String>,
}

enum Target {
    Letter(String),
    Word(String),
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut target = None;
    let mut endpoint = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--word" => {
                let word = args.next().context("--word requires a value")?;
                target = Some(Target::Word(word));
            }
            "--endpoint" => {
                endpoint = Some(args.next().context("--endpoint requires a value")?);
            }
            other if !other.starts_with("--") => {
                target = Some(Target::Letter(other.to_string()));
            }
            other => bail!("unknown argument: {}", other),
        }
    }

    let target = target.context(
        "usage: signify-pipeline <LETTER> | --word <WORD> [--endpoint <URL>]",
    )?;
    Ok(Args { target, endpoint })
}

fn main() -> anyhow::Result<()> {
    let _log_guard = logging::init()?;

    let args = parse_args()?;
    let mut config = PipelineConfig::load();
    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    }

    let pipeline = SignDetection::initialize(config, Box::new(TestPatternCamera::new()))?;
    let (events, _subscription) = pipeline.subscribe();

    match &args.target {
        Target::Letter(letter) => {
            info!("Detecting letter '{}'", letter);
            pipeline.start_detection(letter)?;
        }
        Target::Word(word) => {
            info!("Detecting word '{}'", word);
            pipeline.start_word_detection(word)?;
        }
    }

    loop {
        match events.recv_timeout(Duration::from_secs(60)) {
            Ok(event @ (DetectionEvent::LetterDetected(_) | DetectionEvent::WordDetected(_))) => {
                println!("{}", event.description());
                break;
            }
            Ok(event) => println!("{}", event.description()),
            Err(_) => {
                bail!("no detection within 60 seconds, giving up");
            }
        }
    }

    pipeline.stop_detection()?;
    Ok(())
}
