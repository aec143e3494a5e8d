//! Real-time sign language detection pipeline.
//!
//! Streams camera frames to a recognition backend over a persistent
//! WebSocket and reconciles the asynchronous recognition results against
//! the letter or word the application currently expects. The three moving
//! parts are a frame source (periodic capture and JPEG encoding), a
//! transport (connection lifecycle, reconnection, frame throttling), and a
//! detection coordinator (target matching policy); [`SignDetection`] runs
//! them on a single worker thread and is the public entry point.
//!
//! ```no_run
//! use signify_pipeline::{PipelineConfig, SignDetection};
//! # fn camera() -> Box<dyn signify_pipeline::CameraPort> { unimplemented!() }
//!
//! # fn main() -> anyhow::Result<()> {
//! let pipeline = SignDetection::initialize(PipelineConfig::load(), camera())?;
//! let (events, _id) = pipeline.subscribe();
//! pipeline.start_detection("B")?;
//!
//! for event in events.iter() {
//!     println!("{}", event.description());
//! }
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod detection;
pub mod error;
pub mod events;
pub mod logging;
pub mod pipeline;
pub mod protocol;
pub mod transport;

pub use capture::{CameraPort, CaptureOptions, CaptureStats, CapturedFrame, FrameSource};
pub use config::PipelineConfig;
pub use detection::{Coordinator, DetectionSettings, Target};
pub use error::{AppResult, CaptureError, ConfigError, DetectionError, TransportError};
pub use events::{DetectionEvent, EventBus, SubscriberId};
pub use pipeline::{ConfigUpdate, PipelineStatus, SignDetection};
pub use transport::{
    BackoffPolicy, ConnectionState, Connector, SocketLink, Transport, TransportEvent,
};
