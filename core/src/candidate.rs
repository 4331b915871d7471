//! Candidate types for the candidate bar.
//!
//! This module provides:
//! - `Candidate`: a single selectable string with its origin tag
//! - `CandidateList`: ranked list with a clamped active-index cursor

use serde::{Deserialize, Serialize};

use crate::error::KeyboardError;

/// Glyph shown next to clipboard and phrase items.
pub const CLIP_GLYPH: &str = "📋";

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CandidateTag {
    /// Produced by the decoding engine; selecting it may continue composition.
    #[default]
    Engine,
    /// Clipboard or quick-phrase entry; always committed as literal text.
    Clip,
}

/// A single candidate string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,
    #[serde(default)]
    pub tag: CandidateTag,
}

impl Candidate {
    pub fn new<T: Into<String>>(text: T) -> Self {
        Candidate {
            text: text.into(),
            tag: CandidateTag::Engine,
        }
    }

    pub fn clip<T: Into<String>>(text: T) -> Self {
        Candidate {
            text: text.into(),
            tag: CandidateTag::Clip,
        }
    }

    pub fn is_clip(&self) -> bool {
        self.tag == CandidateTag::Clip
    }

    /// Fixed glyph rendered next to the candidate, if any.
    pub fn glyph(&self) -> Option<&'static str> {
        match self.tag {
            CandidateTag::Clip => Some(CLIP_GLYPH),
            CandidateTag::Engine => None,
        }
    }
}

/// Horizontal direction for cursor and active-candidate movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// Ranked candidate list with an active index.
///
/// Insertion order is engine rank. The active index is always inside
/// `[0, len-1]` when the list is non-empty and 0 otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateList {
    candidates: Vec<Candidate>,
    active: usize,
}

impl CandidateList {
    /// Create a new empty candidate list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a candidate list from a vector of candidates.
    pub fn from_candidates(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            active: 0,
        }
    }

    /// Replace the candidates, resetting the active index to 0.
    pub fn replace(&mut self, candidates: Vec<Candidate>) {
        self.candidates = candidates;
        self.active = 0;
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    /// The candidate under the active index.
    pub fn active(&self) -> Option<&Candidate> {
        self.candidates.get(self.active)
    }

    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    /// Move the active index one step, clamped to the list bounds.
    /// Returns true if the index changed.
    pub fn move_active(&mut self, direction: Direction) -> bool {
        if self.candidates.is_empty() {
            return false;
        }
        let last = self.candidates.len() - 1;
        let next = match direction {
            Direction::Left => self.active.saturating_sub(1),
            Direction::Right => (self.active + 1).min(last),
        };
        let moved = next != self.active;
        self.active = next;
        moved
    }

    /// Select the candidate at `index`, making it active.
    ///
    /// Out-of-range indices fail and leave the list untouched.
    pub fn select(&mut self, index: usize) -> Result<&Candidate, KeyboardError> {
        if index >= self.candidates.len() {
            return Err(KeyboardError::CandidateIndexOutOfRange {
                index,
                len: self.candidates.len(),
            });
        }
        self.active = index;
        Ok(&self.candidates[index])
    }

    pub fn clear(&mut self) {
        self.candidates.clear();
        self.active = 0;
    }
}
