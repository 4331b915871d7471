//! Composing buffer for in-progress input.
//!
//! The buffer stores the raw input units (e.g. "nihao") together with the
//! display form reported by the decoding engine and any prefix the user has
//! already fixed by choosing a partial candidate. Unit validity is the
//! engine's business; the buffer stores whatever it is given.

/// Result of [`ComposingBuffer::delete_last`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// A unit was removed.
    Deleted,
    /// The buffer was already empty; the caller should forward the delete key.
    Forward,
}

/// In-progress input owned by the state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposingBuffer {
    units: Vec<char>,
    /// Text chosen by partial selections, shown before the remaining units.
    fixed: String,
    /// Engine rendering of the remaining units ("ni'hao"); empty means raw.
    display: String,
    finished_by_engine: bool,
}

impl ComposingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one input unit. Any engine display form is stale afterwards.
    pub fn append(&mut self, unit: char) {
        self.units.push(unit);
        self.display.clear();
        self.finished_by_engine = false;
    }

    /// Remove the last unit.
    pub fn delete_last(&mut self) -> DeleteOutcome {
        if self.units.pop().is_some() {
            self.display.clear();
            self.finished_by_engine = false;
            DeleteOutcome::Deleted
        } else if !self.fixed.is_empty() {
            // Undo the fixed prefix as a whole; its units were consumed.
            self.fixed.clear();
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::Forward
        }
    }

    /// Clear everything.
    pub fn reset(&mut self) {
        self.units.clear();
        self.fixed.clear();
        self.display.clear();
        self.finished_by_engine = false;
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty() && self.fixed.is_empty()
    }

    /// Raw units not yet consumed, as the engine sees them.
    pub fn raw_text(&self) -> String {
        self.units.iter().collect()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn fixed(&self) -> &str {
        &self.fixed
    }

    /// Text shown in the composing area: fixed prefix plus the engine's
    /// display form (or the raw units when the engine gave none).
    pub fn display_text(&self) -> String {
        let mut out = self.fixed.clone();
        if self.display.is_empty() {
            out.extend(self.units.iter());
        } else {
            out.push_str(&self.display);
        }
        out
    }

    /// Text committed verbatim (Enter): fixed prefix plus raw units.
    pub fn commit_text(&self) -> String {
        let mut out = self.fixed.clone();
        out.extend(self.units.iter());
        out
    }

    /// Record what the engine reported for the current units.
    pub fn set_engine_state(&mut self, display: String, finished: bool) {
        self.display = display;
        self.finished_by_engine = finished;
    }

    pub fn is_finished_by_engine(&self) -> bool {
        self.finished_by_engine
    }

    /// Fix `text` as chosen for the first `consumed` units.
    pub fn fix_prefix(&mut self, text: &str, consumed: usize) {
        let consumed = consumed.min(self.units.len());
        self.units.drain(..consumed);
        self.fixed.push_str(text);
        self.display.clear();
        self.finished_by_engine = false;
    }

    /// Take the fixed prefix, leaving it empty.
    pub fn take_fixed(&mut self) -> String {
        std::mem::take(&mut self.fixed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_display() {
        let mut buf = ComposingBuffer::new();
        assert!(buf.is_empty());
        buf.append('n');
        buf.append('i');
        assert_eq!(buf.raw_text(), "ni");
        assert_eq!(buf.display_text(), "ni");

        buf.set_engine_state("ni".into(), true);
        assert!(buf.is_finished_by_engine());
        buf.append('h');
        assert!(!buf.is_finished_by_engine());
    }

    #[test]
    fn test_delete_last_on_empty_forwards() {
        let mut buf = ComposingBuffer::new();
        assert_eq!(buf.delete_last(), DeleteOutcome::Forward);
        buf.append('a');
        assert_eq!(buf.delete_last(), DeleteOutcome::Deleted);
        assert!(buf.is_empty());
        assert_eq!(buf.delete_last(), DeleteOutcome::Forward);
    }

    #[test]
    fn test_engine_display_form() {
        let mut buf = ComposingBuffer::new();
        for ch in "nihao".chars() {
            buf.append(ch);
        }
        buf.set_engine_state("ni'hao".into(), false);
        assert_eq!(buf.display_text(), "ni'hao");
        assert_eq!(buf.commit_text(), "nihao");
    }

    #[test]
    fn test_fix_prefix() {
        let mut buf = ComposingBuffer::new();
        for ch in "nihao".chars() {
            buf.append(ch);
        }
        buf.fix_prefix("你", 2);
        assert_eq!(buf.raw_text(), "hao");
        assert_eq!(buf.display_text(), "你hao");
        assert_eq!(buf.commit_text(), "你hao");

        // Deleting past the raw units drops the fixed prefix.
        for _ in 0..3 {
            buf.delete_last();
        }
        assert_eq!(buf.display_text(), "你");
        assert_eq!(buf.delete_last(), DeleteOutcome::Deleted);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_reset_twice() {
        let mut buf = ComposingBuffer::new();
        buf.append('x');
        buf.reset();
        let once = buf.clone();
        buf.reset();
        assert_eq!(buf, once);
    }
}
