//! Wire protocol for the recognition backend.
//!
//! JSON messages over a persistent WebSocket. Outbound messages carry an
//! optional base64 JPEG frame plus optional target-reset hints; inbound
//! messages carry the backend's current best guess and its confidence.
//! Field names live only in this module so a backend-side rename stays a
//! one-file change.

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Outbound envelope: one frame and/or a target reset.
///
/// `new_letter` resets backend recognition state for letter mode. Word-mode
/// resets use the analogous `new_word` field; the backend contract for this
/// field should be confirmed before deployment (see DESIGN.md).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameEnvelope {
    pub jpeg_blob: Option<String>,
    pub new_letter: Option<String>,
    pub new_word: Option<String>,
}

impl FrameEnvelope {
    /// Envelope carrying a frame with no reset hint
    pub fn frame(jpeg_b64: String) -> Self {
        Self {
            jpeg_blob: Some(jpeg_b64),
            new_letter: None,
            new_word: None,
        }
    }

    /// Out-of-band control message resetting backend state for a new letter
    pub fn letter_reset(letter: &str) -> Self {
        Self {
            jpeg_blob: None,
            new_letter: Some(letter.to_string()),
            new_word: None,
        }
    }

    /// Out-of-band control message resetting backend state for a new word
    pub fn word_reset(word: &str) -> Self {
        Self {
            jpeg_blob: None,
            new_letter: None,
            new_word: Some(word.to_string()),
        }
    }

    /// Serialize for transmission
    pub fn encode(&self) -> Result<String, TransportError> {
        serde_json::to_string(self).map_err(TransportError::MalformedMessage)
    }
}

/// Inbound recognition result.
///
/// The backend reports its current best guess asynchronously; there is no
/// correspondence between a given outbound frame and a given result. Absent
/// fields decode as None so older backends that only report letters still
/// parse.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RecognitionMessage {
    #[serde(default)]
    pub maxarg_letter: Option<String>,
    #[serde(default)]
    pub maxarg_word: Option<String>,
    #[serde(default)]
    pub target_arg_prob: f64,
}

impl RecognitionMessage {
    /// Decode a raw text frame from the socket
    pub fn decode(raw: &str) -> Result<Self, TransportError> {
        serde_json::from_str(raw).map_err(TransportError::MalformedMessage)
    }
}
