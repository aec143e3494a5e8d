//! Frame source.
//!
//! Periodically pulls still frames from a camera, downscales and compresses
//! them to JPEG, and hands them off as base64 for the transport. The camera
//! itself sits behind a trait so tests and the demo binary can supply
//! synthetic frames.

use std::io::Cursor;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{imageops::FilterType, DynamicImage, RgbaImage};
use tracing::{debug, warn};

use crate::error::CaptureError;

/// Camera abstraction
///
/// Implementations grab one still frame per call. A frame is full-size RGBA;
/// scaling and encoding happen in the frame source, not the camera.
pub trait CameraPort: Send {
    /// Whether the camera is initialized and can deliver frames
    fn is_ready(&self) -> bool;

    /// Acquire a single still frame
    fn capture_frame(&mut self) -> Result<RgbaImage, CaptureError>;
}

/// Capture cadence and encoding parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureOptions {
    /// Time between capture attempts
    pub frame_interval: Duration,

    /// JPEG quality in [0.0, 1.0]
    pub quality: f64,

    /// Frames wider than this are downscaled, preserving aspect ratio
    pub max_width: u32,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(200),
            quality: 0.5,
            max_width: 640,
        }
    }
}

/// Failures are logged on the first occurrence and every Nth after that,
/// so a camera that stays broken does not flood the log at frame rate
const FAILURE_LOG_EVERY: u64 = 10;

/// Capture session snapshot, exposed through pipeline status
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CaptureStats {
    pub is_capturing: bool,
    pub frame_count: u64,
    pub frames_skipped: u64,
    pub frame_interval: Duration,
    pub quality: f64,
}

/// One encoded frame plus the metadata the consumer may want to display
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    /// Base64 JPEG payload, ready for the wire
    pub jpeg_b64: String,

    /// Encoded dimensions, after any downscale
    pub width: u32,
    pub height: u32,

    /// 1-based position within the current capture session
    pub frame_number: u64,

    /// Capture time
    pub timestamp: Instant,
}

/// Periodic frame producer
///
/// Owns the camera and the capture clock. At most one capture session runs
/// at a time; starting while a session is active is a logged no-op, so the
/// session counters keep their meaning across repeated start requests.
pub struct FrameSource {
    camera: Box<dyn CameraPort>,
    options: CaptureOptions,
    capturing: bool,
    last_capture: Option<Instant>,
    frame_count: u64,
    frames_skipped: u64,
}

impl FrameSource {
    pub fn new(camera: Box<dyn CameraPort>, options: CaptureOptions) -> Self {
        Self {
            camera,
            options,
            capturing: false,
            last_capture: None,
            frame_count: 0,
            frames_skipped: 0,
        }
    }

    /// Whether the underlying camera can deliver frames
    pub fn is_ready(&self) -> bool {
        self.camera.is_ready()
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            is_capturing: self.capturing,
            frame_count: self.frame_count,
            frames_skipped: self.frames_skipped,
            frame_interval: self.options.frame_interval,
            quality: self.options.quality,
        }
    }

    /// Begin a capture session. Returns false (and changes nothing) when a
    /// session is already running.
    pub fn start_capture(&mut self) -> bool {
        if self.capturing {
            debug!("Capture already active, ignoring start");
            return false;
        }
        self.capturing = true;
        self.frame_count = 0;
        self.frames_skipped = 0;
        self.last_capture = None;
        true
    }

    /// End the capture session; safe to call when idle
    pub fn stop_capture(&mut self) {
        self.capturing = false;
        self.last_capture = None;
    }

    /// Replace capture options at runtime; takes effect from the next tick
    pub fn set_options(&mut self, options: CaptureOptions) {
        self.options = options;
    }

    pub fn options(&self) -> CaptureOptions {
        self.options
    }

    /// Advance the capture clock to `now`.
    ///
    /// Returns an encoded frame when a session is running, the interval has
    /// elapsed, and the camera delivered a still; `None` otherwise. Camera
    /// failures skip the tick and never end the session; they are logged on
    /// the first occurrence and every Nth after that.
    pub fn tick_at(&mut self, now: Instant) -> Option<CapturedFrame> {
        if !self.capturing {
            return None;
        }
        if let Some(last) = self.last_capture {
            if now.duration_since(last) < self.options.frame_interval {
                return None;
            }
        }
        self.last_capture = Some(now);

        if !self.camera.is_ready() {
            self.frames_skipped += 1;
            return None;
        }

        let frame = match self.camera.capture_frame() {
            Ok(frame) => frame,
            Err(e) => {
                self.frames_skipped += 1;
                if should_log_failure(self.frames_skipped) {
                    warn!(
                        "Frame capture failed ({} skipped so far): {}",
                        self.frames_skipped, e
                    );
                }
                return None;
            }
        };

        match encode_frame(&frame, &self.options) {
            Ok((jpeg_b64, width, height)) => {
                self.frame_count += 1;
                Some(CapturedFrame {
                    jpeg_b64,
                    width,
                    height,
                    frame_number: self.frame_count,
                    timestamp: now,
                })
            }
            Err(e) => {
                self.frames_skipped += 1;
                if should_log_failure(self.frames_skipped) {
                    warn!(
                        "Frame encoding failed ({} skipped so far): {}",
                        self.frames_skipped, e
                    );
                }
                None
            }
        }
    }

    /// Convenience wrapper over [`tick_at`](Self::tick_at) using the wall clock
    pub fn tick(&mut self) -> Option<CapturedFrame> {
        self.tick_at(Instant::now())
    }
}

fn should_log_failure(skipped: u64) -> bool {
    skipped == 1 || skipped % FAILURE_LOG_EVERY == 0
}

/// Downscale to `max_width` (preserving aspect ratio), compress to JPEG at
/// the configured quality, and base64-encode the result; returns the
/// payload with the encoded dimensions
fn encode_frame(
    frame: &RgbaImage,
    options: &CaptureOptions,
) -> Result<(String, u32, u32), CaptureError> {
    let (width, height) = frame.dimensions();

    let scaled = if width > options.max_width {
        let scale = options.max_width as f64 / width as f64;
        let new_height = ((height as f64 * scale).round() as u32).max(1);
        debug!(
            "Downscaling frame {}x{} -> {}x{}",
            width, height, options.max_width, new_height
        );
        DynamicImage::ImageRgba8(frame.clone()).resize_exact(
            options.max_width,
            new_height,
            FilterType::Triangle,
        )
    } else {
        DynamicImage::ImageRgba8(frame.clone())
    };

    // JPEG has no alpha channel
    let rgb = scaled.to_rgb8();

    let quality = (options.quality.clamp(0.0, 1.0) * 100.0).round() as u8;
    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.max(1));
    rgb.write_with_encoder(encoder)
        .map_err(CaptureError::EncodeFailed)?;

    Ok((BASE64.encode(buffer.into_inner()), rgb.width(), rgb.height()))
}
