//! Pipeline orchestration.
//!
//! Ties the frame source, transport, and coordinator together in one worker
//! thread, and exposes the thread-safe `SignDetection` handle the
//! application drives. All pipeline state lives on the worker; the handle
//! only sends commands and reads a status snapshot, so no callback ever runs
//! on an application thread while the pipeline mutates itself.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::capture::{CameraPort, CaptureStats, FrameSource};
use crate::config::PipelineConfig;
use crate::detection::{Coordinator, SettingsUpdate, Target, TargetChange};
use crate::error::{AppResult, DetectionError};
use crate::events::{DetectionEvent, EventBus, SubscriberId};
use crate::protocol::FrameEnvelope;
use crate::transport::{
    ConnectionState, Connector, Transport, TransportEvent, TransportStats, WsConnector,
};

/// Loop cadence; commands and inbound messages are picked up within one tick
const TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Commands from the handle to the worker
enum PipelineCommand {
    SetTarget(Target),
    Stop,
    Disconnect,
    UpdateConfig(ConfigUpdate),
    Shutdown,
}

/// Live configuration updates; applied without restarting detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigUpdate {
    ConfidenceThreshold(f64),
    RequiredConsecutiveDetections(u32),
    DebugMode(bool),
    FrameInterval(Duration),
    JpegQuality(f64),
    MaxFrameWidth(u32),
    MinSendInterval(Duration),
}

/// Snapshot of pipeline state, refreshed every tick
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStatus {
    pub connection: ConnectionState,
    pub target: Option<Target>,
    pub camera_ready: bool,
    pub capture: CaptureStats,
    pub transport: TransportStats,
}

impl PipelineStatus {
    /// Whether detection is in progress (a target is active)
    pub fn is_detecting(&self) -> bool {
        self.target.is_some()
    }
}

impl Default for PipelineStatus {
    fn default() -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            target: None,
            camera_ready: false,
            capture: CaptureStats::default(),
            transport: TransportStats::default(),
        }
    }
}

/// Handle to a running detection pipeline
///
/// Cheap to share behind an `Arc`; dropping the last handle shuts the worker
/// down.
pub struct SignDetection {
    commands: Sender<PipelineCommand>,
    events: EventBus,
    status: Arc<RwLock<PipelineStatus>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl SignDetection {
    /// Create and start the pipeline with the production WebSocket
    /// connector. The camera should already be initialized; frames are not
    /// pulled until detection starts.
    pub fn initialize(config: PipelineConfig, camera: Box<dyn CameraPort>) -> AppResult<Self> {
        Self::initialize_with(config, camera, Box::new(WsConnector))
    }

    /// Create and start the pipeline with a custom connector
    pub fn initialize_with(
        config: PipelineConfig,
        camera: Box<dyn CameraPort>,
        connector: Box<dyn Connector>,
    ) -> AppResult<Self> {
        config.validate().context("invalid pipeline configuration")?;

        let transport = Transport::new(
            config.endpoint.clone(),
            connector,
            config.backoff_policy(),
            config.min_send_interval(),
        );
        let frames = FrameSource::new(camera, config.capture_options());
        let coordinator = Coordinator::new(config.detection_settings());
        let events = EventBus::new();
        let status = Arc::new(RwLock::new(PipelineStatus::default()));

        let (tx, rx) = unbounded();
        let worker = {
            let bus = events.clone();
            let status = Arc::clone(&status);
            thread::Builder::new()
                .name("signify-pipeline".to_string())
                .spawn(move || run_pipeline_loop(transport, frames, coordinator, bus, rx, status))
                .context("failed to spawn pipeline worker")?
        };

        info!("Pipeline initialized for {}", config.endpoint);
        Ok(Self {
            commands: tx,
            events,
            status,
            worker: Some(worker),
        })
    }

    /// Start letter detection: connects to the backend if needed, resets its
    /// recognition state, and begins streaming frames
    pub fn start_detection(&self, letter: &str) -> AppResult<()> {
        self.set_target(Target::Letter(normalize_letter(letter)?))
    }

    /// Start word detection
    pub fn start_word_detection(&self, word: &str) -> AppResult<()> {
        self.set_target(Target::Word(normalize_word(word)?))
    }

    /// Switch the letter target mid-session (quiz advanced to the next
    /// prompt). Equivalent to `start_detection` when nothing is running.
    pub fn update_target_letter(&self, letter: &str) -> AppResult<()> {
        self.start_detection(letter)
    }

    /// Switch the word target mid-session
    pub fn update_target_word(&self, word: &str) -> AppResult<()> {
        self.start_word_detection(word)
    }

    /// Stop detection: clears the target and stops frame capture. The
    /// connection stays up so the next round starts without a reconnect;
    /// results still in flight are discarded, not surfaced.
    pub fn stop_detection(&self) -> AppResult<()> {
        self.send_command(PipelineCommand::Stop)
    }

    /// Stop detection and close the connection. Reconnection is suppressed
    /// until detection is started again.
    pub fn disconnect(&self) -> AppResult<()> {
        self.send_command(PipelineCommand::Disconnect)
    }

    /// Apply a configuration change at runtime
    pub fn update_config(&self, update: ConfigUpdate) -> AppResult<()> {
        self.send_command(PipelineCommand::UpdateConfig(update))
    }

    /// Whether the pipeline can detect right now: camera ready and backend
    /// connected
    pub fn is_ready(&self) -> bool {
        let status = self.status.read();
        status.camera_ready && status.connection.is_connected()
    }

    /// Current status snapshot
    pub fn status(&self) -> PipelineStatus {
        self.status.read().clone()
    }

    /// Subscribe to pipeline events; each subscriber gets its own ordered
    /// stream
    pub fn subscribe(&self) -> (Receiver<DetectionEvent>, SubscriberId) {
        self.events.subscribe()
    }

    /// Drop an event subscription
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.events.unsubscribe(id);
    }

    fn set_target(&self, target: Target) -> AppResult<()> {
        self.send_command(PipelineCommand::SetTarget(target))
    }

    fn send_command(&self, command: PipelineCommand) -> AppResult<()> {
        self.commands
            .send(command)
            .map_err(|_| DetectionError::NotInitialized)
            .context("pipeline worker is not running")
    }
}

impl Drop for SignDetection {
    fn drop(&mut self) {
        let _ = self.commands.send(PipelineCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Uppercase and validate a letter target
fn normalize_letter(letter: &str) -> AppResult<String> {
    let trimmed = letter.trim();
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_alphabetic() => Ok(c.to_uppercase().to_string()),
        _ => Err(DetectionError::InvalidTarget(letter.to_string()))
            .context("letter target must be a single alphabetic character"),
    }
}

/// Uppercase and validate a word target
fn normalize_word(word: &str) -> AppResult<String> {
    let trimmed = word.trim();
    if trimmed.is_empty() {
        return Err(DetectionError::InvalidTarget(word.to_string()))
            .context("word target must not be empty");
    }
    Ok(trimmed.to_uppercase())
}

/// Backend reset message for a target
fn reset_for(target: &Target) -> FrameEnvelope {
    match target {
        Target::Letter(value) => FrameEnvelope::letter_reset(value),
        Target::Word(value) => FrameEnvelope::word_reset(value),
    }
}

/// The single worker loop
///
/// Every tick: drain commands, advance the transport (reconnects, inbound
/// messages), capture and send a frame if due, refresh the status snapshot.
/// Sequential handling keeps event order identical to transport arrival
/// order.
fn run_pipeline_loop(
    mut transport: Transport,
    mut frames: FrameSource,
    mut coordinator: Coordinator,
    bus: EventBus,
    commands: Receiver<PipelineCommand>,
    status: Arc<RwLock<PipelineStatus>>,
) {
    info!("Pipeline worker started");
    let mut was_connected = false;

    loop {
        let now = Instant::now();
        let mut events = Vec::new();

        loop {
            match commands.try_recv() {
                Ok(PipelineCommand::SetTarget(target)) => {
                    handle_set_target(&mut transport, &mut coordinator, target, now, &mut events);
                    frames.start_capture();
                }
                Ok(PipelineCommand::Stop) => {
                    info!("Stopping detection");
                    coordinator.clear_target();
                    frames.stop_capture();
                }
                Ok(PipelineCommand::Disconnect) => {
                    info!("Disconnecting from backend");
                    coordinator.clear_target();
                    frames.stop_capture();
                    transport.disconnect();
                }
                Ok(PipelineCommand::UpdateConfig(update)) => {
                    apply_config_update(&mut transport, &mut frames, &mut coordinator, update);
                }
                Ok(PipelineCommand::Shutdown) => {
                    info!("Pipeline worker shutting down");
                    transport.disconnect();
                    return;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    transport.disconnect();
                    return;
                }
            }
        }

        events.extend(transport.poll_at(now));

        // Events are held back until the status snapshot reflects this tick;
        // a subscriber reading status() on receipt must never see the
        // previous tick's state
        let mut outbound = Vec::new();

        for event in events {
            match event {
                TransportEvent::Connected => {
                    // Re-announce the target before anything observes the
                    // connection as up, so the backend never recognizes
                    // against stale state
                    if let Some(target) = coordinator.target().cloned() {
                        if let Err(e) = transport.send_reset_at(now, &reset_for(&target)) {
                            warn!("Failed to send target reset: {}", e);
                        }
                    }
                    if !was_connected {
                        outbound.push(DetectionEvent::ConnectionChange(true));
                        was_connected = true;
                    }
                }
                TransportEvent::ConnectionLost => {
                    debug!("Connection lost, reconnecting");
                    if was_connected {
                        outbound.push(DetectionEvent::ConnectionChange(false));
                        was_connected = false;
                    }
                }
                TransportEvent::RetriesExhausted => {
                    error!("Recognition backend unreachable, giving up");
                }
                TransportEvent::Message(msg) => {
                    outbound.extend(coordinator.handle_message(&msg));
                }
            }
        }

        // Transitions with no transport event (a Disconnect command, say)
        let connected = transport.is_connected();
        if connected != was_connected {
            outbound.push(DetectionEvent::ConnectionChange(connected));
            was_connected = connected;
        }

        // tick_at is a no-op unless a capture session is running; frames
        // produced while disconnected or throttled are dropped, not queued
        if let Some(frame) = frames.tick_at(now) {
            match transport.send_frame_at(now, frame.jpeg_b64) {
                Ok(sent) => {
                    if !sent {
                        debug!("Frame {} dropped", frame.frame_number);
                    }
                }
                Err(e) => warn!("Frame send failed: {}", e),
            }
        }

        *status.write() = PipelineStatus {
            connection: transport.state(),
            target: coordinator.target().cloned(),
            camera_ready: frames.is_ready(),
            capture: frames.stats(),
            transport: transport.stats(),
        };

        for event in outbound {
            bus.publish(event);
        }

        thread::sleep(TICK_INTERVAL);
    }
}

fn handle_set_target(
    transport: &mut Transport,
    coordinator: &mut Coordinator,
    target: Target,
    now: Instant,
    events: &mut Vec<TransportEvent>,
) {
    info!("Setting target: {}", target.description());
    let change = coordinator.set_target(target.clone());

    match transport.state() {
        ConnectionState::Disconnected | ConnectionState::Failed => {
            // Connection success is handled with the other transport
            // events, which re-sends the reset
            events.extend(transport.connect_at(now));
        }
        _ => {
            if change == TargetChange::Updated {
                if let Err(e) = transport.send_reset_at(now, &reset_for(&target)) {
                    warn!("Failed to send target reset: {}", e);
                }
            }
        }
    }
}

fn apply_config_update(
    transport: &mut Transport,
    frames: &mut FrameSource,
    coordinator: &mut Coordinator,
    update: ConfigUpdate,
) {
    debug!("Applying config update: {:?}", update);
    match update {
        ConfigUpdate::ConfidenceThreshold(threshold) => {
            coordinator.apply_settings(SettingsUpdate::ConfidenceThreshold(threshold));
        }
        ConfigUpdate::RequiredConsecutiveDetections(count) => {
            coordinator.apply_settings(SettingsUpdate::RequiredConsecutiveDetections(count));
        }
        ConfigUpdate::DebugMode(enabled) => {
            coordinator.apply_settings(SettingsUpdate::DebugMode(enabled));
        }
        ConfigUpdate::FrameInterval(interval) => {
            let mut options = frames.options();
            options.frame_interval = interval;
            frames.set_options(options);
        }
        ConfigUpdate::JpegQuality(quality) => {
            let mut options = frames.options();
            options.quality = quality.clamp(0.0, 1.0);
            frames.set_options(options);
        }
        ConfigUpdate::MaxFrameWidth(width) => {
            let mut options = frames.options();
            options.max_width = width.max(1);
            frames.set_options(options);
        }
        ConfigUpdate::MinSendInterval(interval) => {
            transport.set_min_send_interval(interval);
        }
    }
}
