//! Detection coordinator.
//!
//! The policy brain of the pipeline: interprets recognition results against
//! the live target and decides when a detection fires. Pure state and
//! policy, no I/O, so the match rules are testable without a socket or
//! camera.

use tracing::debug;

use super::target::Target;
use crate::events::DetectionEvent;
use crate::protocol::RecognitionMessage;

/// Runtime-tunable match policy
///
/// The quiz and speed game modes tune these differently to trade latency
/// against precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionSettings {
    /// Minimum probability to accept a match (inclusive)
    pub confidence_threshold: f64,

    /// Number of consecutive qualifying results required before a detection
    /// fires; 1 means single-shot acceptance
    pub required_consecutive_detections: u32,

    /// Log every comparison at debug level
    pub debug_mode: bool,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.8,
            required_consecutive_detections: 1,
            debug_mode: false,
        }
    }
}

/// Single-field settings update (applied at runtime without stopping capture)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingsUpdate {
    ConfidenceThreshold(f64),
    RequiredConsecutiveDetections(u32),
    DebugMode(bool),
}

/// Result of a target change request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetChange {
    /// Target value and mode are identical to the current target; no
    /// backend reset should be sent
    Unchanged,

    /// Target was replaced; a backend reset should be sent if connected
    Updated,
}

/// Coordinator state: the active target plus match bookkeeping
pub struct Coordinator {
    target: Option<Target>,
    last_fired: Option<String>,
    consecutive_detections: u32,
    settings: DetectionSettings,
}

impl Coordinator {
    /// Create a coordinator with the given match policy
    pub fn new(settings: DetectionSettings) -> Self {
        Self {
            target: None,
            last_fired: None,
            consecutive_detections: 0,
            settings,
        }
    }

    /// Current active target, if any
    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    /// Whether a target is active (detection in progress)
    pub fn is_active(&self) -> bool {
        self.target.is_some()
    }

    /// Current match policy
    pub fn settings(&self) -> DetectionSettings {
        self.settings
    }

    /// Apply a runtime settings update
    pub fn apply_settings(&mut self, update: SettingsUpdate) {
        match update {
            SettingsUpdate::ConfidenceThreshold(threshold) => {
                self.settings.confidence_threshold = threshold.clamp(0.0, 1.0);
                debug!(
                    "Updated confidence threshold: {}",
                    self.settings.confidence_threshold
                );
            }
            SettingsUpdate::RequiredConsecutiveDetections(count) => {
                self.settings.required_consecutive_detections = count.max(1);
                debug!(
                    "Updated required consecutive detections: {}",
                    self.settings.required_consecutive_detections
                );
            }
            SettingsUpdate::DebugMode(enabled) => {
                self.settings.debug_mode = enabled;
                debug!("Debug mode: {}", enabled);
            }
        }
    }

    /// Replace the active target. Setting a letter target clears any word
    /// target and vice versa. Re-arms the detection latch either way;
    /// returns `Unchanged` when the new target equals the current one so
    /// callers can skip the redundant backend reset.
    pub fn set_target(&mut self, target: Target) -> TargetChange {
        self.last_fired = None;
        self.consecutive_detections = 0;

        if self.target.as_ref() == Some(&target) {
            return TargetChange::Unchanged;
        }

        debug!(
            "Target changed: {} -> {}",
            self.target
                .as_ref()
                .map(Target::description)
                .unwrap_or_else(|| "none".to_string()),
            target.description()
        );

        self.target = Some(target);
        TargetChange::Updated
    }

    /// Clear the active target; in-flight results arriving afterwards are
    /// ignored rather than acted upon
    pub fn clear_target(&mut self) {
        self.target = None;
        self.last_fired = None;
        self.consecutive_detections = 0;
    }

    /// Interpret one recognition result against the active target.
    ///
    /// Always emits a `ConfidenceUpdate` while a target is active. A
    /// detection event fires when the reported value equals the target value
    /// and the confidence meets the threshold (inclusive), sustained for
    /// `required_consecutive_detections` results.
    ///
    /// Field selection follows the target mode: letter targets compare
    /// against `maxarg_letter`, word targets against `maxarg_word`, each
    /// falling back to the other field when its own is absent.
    pub fn handle_message(&mut self, msg: &RecognitionMessage) -> Vec<DetectionEvent> {
        let Some(target) = self.target.clone() else {
            // No target: result arrived after stop, discard
            return Vec::new();
        };

        let detected = match &target {
            Target::Letter(_) => msg
                .maxarg_letter
                .as_deref()
                .or(msg.maxarg_word.as_deref()),
            Target::Word(_) => msg
                .maxarg_word
                .as_deref()
                .or(msg.maxarg_letter.as_deref()),
        };
        let confidence = msg.target_arg_prob;

        if self.settings.debug_mode {
            debug!(
                "Recognition result: target={} detected={:?} confidence={:.1}% threshold={:.1}%",
                target.description(),
                detected,
                confidence * 100.0,
                self.settings.confidence_threshold * 100.0
            );
        }

        let mut events = vec![DetectionEvent::ConfidenceUpdate {
            confidence,
            detected: detected.map(str::to_owned),
        }];

        let Some(value) = detected else {
            return events;
        };

        if value == target.value() && confidence >= self.settings.confidence_threshold {
            // Latched after firing: the target was already detected and the
            // caller has yet to advance the game, so further matches for
            // the same value stay quiet
            if self.last_fired.as_deref() == Some(value) {
                return events;
            }

            self.consecutive_detections += 1;
            if self.consecutive_detections >= self.settings.required_consecutive_detections {
                debug!("Detection fired for {}", target.description());
                events.push(match &target {
                    Target::Letter(_) => DetectionEvent::LetterDetected(value.to_string()),
                    Target::Word(_) => DetectionEvent::WordDetected(value.to_string()),
                });
                self.last_fired = Some(value.to_string());
                self.consecutive_detections = 0;
            }
        } else {
            // Wrong value or low confidence breaks the streak
            self.consecutive_detections = 0;
        }

        events
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(DetectionSettings::default())
    }
}
