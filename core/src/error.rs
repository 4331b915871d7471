//! Error types surfaced by the keyboard core.

use thiserror::Error;

use crate::engine::EngineError;
use crate::host::NetworkError;
use crate::overlay::OverlayKind;

/// Errors reported by the keyboard core.
///
/// None of these are fatal: the key path degrades to "reset and report" and
/// overlay failures stay inside the overlay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyboardError {
    #[error("malformed key event (code {code}, unicode {unicode:#x})")]
    MalformedKeyEvent { code: i32, unicode: u32 },

    #[error("candidate index {index} out of range (len {len})")]
    CandidateIndexOutOfRange { index: usize, len: usize },

    #[error("decoding engine failed: {0}")]
    Engine(#[from] EngineError),

    #[error("AI query failed: {0}")]
    Network(#[from] NetworkError),

    #[error("an AI query is already in flight")]
    RequestInFlight,

    #[error("no overlay prompt is active")]
    NoActiveOverlay,

    #[error("operation not valid for {0:?} overlay")]
    WrongOverlayKind(OverlayKind),

    #[error("no AI client configured")]
    NoAiClient,

    #[error("nothing to submit")]
    EmptyPrompt,
}
