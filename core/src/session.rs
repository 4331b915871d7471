//! Keyboard session state.
//!
//! The `ImeSession` struct bundles the composing buffer, the candidate list
//! and the current input mode. Mode changes go through methods that keep the
//! three consistent: the buffer is non-empty only in Composing, candidates
//! exist only in Composing or Predicting.

use crate::candidate::{Candidate, CandidateList};
use crate::composing::ComposingBuffer;

/// Current input mode of the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Nothing is being composed and no candidates are shown
    #[default]
    Idle,
    /// Raw input is being collected and decoded
    Composing,
    /// Associative or literal candidates are shown after a commit
    Predicting,
}

/// Session state owned by the state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImeSession {
    buffer: ComposingBuffer,
    candidates: CandidateList,
    mode: InputMode,
}

impl ImeSession {
    /// Create a new idle session.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &ComposingBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut ComposingBuffer {
        &mut self.buffer
    }

    pub fn candidates(&self) -> &CandidateList {
        &self.candidates
    }

    pub fn candidates_mut(&mut self) -> &mut CandidateList {
        &mut self.candidates
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Clear buffer and candidates and return to Idle.
    pub fn clear(&mut self) {
        self.buffer.reset();
        self.candidates.clear();
        self.mode = InputMode::Idle;
    }

    /// Enter Composing; candidates are refreshed by the caller.
    pub fn start_composing(&mut self) {
        if self.mode == InputMode::Predicting {
            self.candidates.clear();
        }
        self.mode = InputMode::Composing;
    }

    /// Show `candidates` in Predicting mode, or go Idle when there are none.
    pub fn predict(&mut self, candidates: Vec<Candidate>) {
        self.buffer.reset();
        if candidates.is_empty() {
            self.candidates.clear();
            self.mode = InputMode::Idle;
        } else {
            self.candidates.replace(candidates);
            self.mode = InputMode::Predicting;
        }
    }

    /// True when nothing is being composed.
    pub fn is_finish(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle() {
        let session = ImeSession::new();
        assert_eq!(session.mode(), InputMode::Idle);
        assert!(session.is_finish());
        assert!(session.candidates().is_empty());
    }

    #[test]
    fn test_predict_with_and_without_candidates() {
        let mut session = ImeSession::new();
        session.buffer_mut().append('n');
        session.start_composing();

        session.predict(vec![Candidate::new("好")]);
        assert_eq!(session.mode(), InputMode::Predicting);
        assert!(session.buffer().is_empty());

        session.predict(Vec::new());
        assert_eq!(session.mode(), InputMode::Idle);
        assert!(session.candidates().is_empty());
    }

    #[test]
    fn test_start_composing_drops_predictions() {
        let mut session = ImeSession::new();
        session.predict(vec![Candidate::new("好")]);
        session.start_composing();
        assert_eq!(session.mode(), InputMode::Composing);
        assert!(session.candidates().is_empty());
    }

    #[test]
    fn test_clear() {
        let mut session = ImeSession::new();
        session.buffer_mut().append('a');
        session.start_composing();
        session.candidates_mut().replace(vec![Candidate::new("a")]);
        session.clear();
        assert_eq!(session, ImeSession::new());
    }
}
