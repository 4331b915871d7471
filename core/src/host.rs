//! Collaborator contracts consumed by the keyboard core.
//!
//! The host application implements these traits: the text field the keyboard
//! types into, the clipboard and phrase stores, and the AI client. In-memory
//! implementations are provided for tests and the command line demo.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::candidate::{Candidate, Direction};
use crate::context::EditorAction;

/// The host text field.
pub trait TextSink {
    /// Replace the current composing region with `text`.
    fn set_composing_text(&mut self, text: &str);

    /// Insert `text` at the cursor, finishing any composing region.
    fn commit_text(&mut self, text: &str);

    /// Delete `n` characters before the cursor.
    fn delete_before_cursor(&mut self, n: usize);

    fn move_cursor(&mut self, direction: Direction);

    /// Send a key the keyboard does not interpret itself.
    fn send_function_key(&mut self, code: i32);

    fn perform_editor_action(&mut self, action: EditorAction);

    /// Up to `n` characters before the cursor.
    fn text_before_cursor(&self, _n: usize) -> String {
        String::new()
    }

    /// Ask the host to hide the keyboard.
    fn request_hide(&mut self) {}

    fn show_input_method_picker(&mut self) {}
}

/// One recorded `TextSink` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    SetComposing(String),
    Commit(String),
    DeleteBefore(usize),
    MoveCursor(Direction),
    FunctionKey(i32),
    EditorAction(EditorAction),
    RequestHide,
    ShowPicker,
}

/// Text field simulation that records every call.
///
/// Keeps the field contents and a cursor so `text_before_cursor` and the
/// visible result of a key sequence can be checked.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    calls: Vec<SinkCall>,
    text: Vec<char>,
    cursor: usize,
    composing: String,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[SinkCall] {
        &self.calls
    }

    /// Take recorded calls, clearing the log.
    pub fn take_calls(&mut self) -> Vec<SinkCall> {
        std::mem::take(&mut self.calls)
    }

    /// Committed field text (composing region excluded).
    pub fn text(&self) -> String {
        self.text.iter().collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn composing(&self) -> &str {
        &self.composing
    }

    /// Only the committed strings, in order.
    pub fn commits(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SinkCall::Commit(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl TextSink for RecordingSink {
    fn set_composing_text(&mut self, text: &str) {
        self.calls.push(SinkCall::SetComposing(text.to_string()));
        self.composing = text.to_string();
    }

    fn commit_text(&mut self, text: &str) {
        self.calls.push(SinkCall::Commit(text.to_string()));
        self.composing.clear();
        for ch in text.chars() {
            self.text.insert(self.cursor, ch);
            self.cursor += 1;
        }
    }

    fn delete_before_cursor(&mut self, n: usize) {
        self.calls.push(SinkCall::DeleteBefore(n));
        let n = n.min(self.cursor);
        self.text.drain(self.cursor - n..self.cursor);
        self.cursor -= n;
    }

    fn move_cursor(&mut self, direction: Direction) {
        self.calls.push(SinkCall::MoveCursor(direction));
        match direction {
            Direction::Left => self.cursor = self.cursor.saturating_sub(1),
            Direction::Right => self.cursor = (self.cursor + 1).min(self.text.len()),
        }
    }

    fn send_function_key(&mut self, code: i32) {
        self.calls.push(SinkCall::FunctionKey(code));
    }

    fn perform_editor_action(&mut self, action: EditorAction) {
        self.calls.push(SinkCall::EditorAction(action));
    }

    fn text_before_cursor(&self, n: usize) -> String {
        let start = self.cursor.saturating_sub(n);
        self.text[start..self.cursor].iter().collect()
    }

    fn request_hide(&mut self) {
        self.calls.push(SinkCall::RequestHide);
    }

    fn show_input_method_picker(&mut self) {
        self.calls.push(SinkCall::ShowPicker);
    }
}

// ============================================================================
// Clipboard and phrase entries
// ============================================================================

/// A clipboard or phrase entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub content: String,
    pub is_pinned: bool,
}

impl Entry {
    pub fn new<T: Into<String>>(content: T) -> Self {
        Self {
            content: content.into(),
            is_pinned: false,
        }
    }

    pub fn pinned<T: Into<String>>(content: T) -> Self {
        Self {
            content: content.into(),
            is_pinned: true,
        }
    }
}

/// Source of clipboard or phrase entries, newest first.
pub trait EntrySource {
    fn all_entries(&self) -> Vec<Entry>;
}

/// Writable phrase store used by the phrase-capture overlay.
pub trait PhraseStore: EntrySource {
    fn add_phrase(&mut self, content: &str);
    fn remove_phrase(&mut self, content: &str);
}

/// Clip candidates for `entries`: pinned first, otherwise in source order.
pub fn entry_candidates(entries: Vec<Entry>) -> Vec<Candidate> {
    let (pinned, rest): (Vec<Entry>, Vec<Entry>) = entries
        .into_iter()
        .filter(|e| !e.content.is_empty())
        .partition(|e| e.is_pinned);
    pinned
        .into_iter()
        .chain(rest)
        .map(|e| Candidate::clip(e.content))
        .collect()
}

/// In-memory entry list; newest entries are inserted at the front.
#[derive(Debug, Clone, Default)]
pub struct MemoryEntries {
    entries: Vec<Entry>,
}

impl MemoryEntries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.retain(|e| e.content != entry.content);
        self.entries.insert(0, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EntrySource for MemoryEntries {
    fn all_entries(&self) -> Vec<Entry> {
        self.entries.clone()
    }
}

impl PhraseStore for MemoryEntries {
    fn add_phrase(&mut self, content: &str) {
        self.push(Entry::new(content));
    }

    fn remove_phrase(&mut self, content: &str) {
        self.entries.retain(|e| e.content != content);
    }
}

/// The system clipboard as seen by the keyboard.
pub trait Clipboard: EntrySource {
    /// Put `content` on the clipboard as its newest item.
    fn copy(&mut self, content: &str);

    /// The newest item if it was copied within `max_age` and has not been
    /// offered yet. Returns `None` afterwards until something new is copied.
    fn take_recent(&mut self, max_age: Duration) -> Option<String>;
}

/// In-memory clipboard history.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    history: MemoryEntries,
    recent: Option<(String, Instant)>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an item the host saw being copied `age` ago.
    pub fn record(&mut self, content: &str, age: Duration) {
        self.history.push(Entry::new(content));
        let now = Instant::now();
        let copied_at = now.checked_sub(age).unwrap_or(now);
        self.recent = Some((content.to_string(), copied_at));
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

impl EntrySource for MemoryClipboard {
    fn all_entries(&self) -> Vec<Entry> {
        self.history.all_entries()
    }
}

impl Clipboard for MemoryClipboard {
    fn copy(&mut self, content: &str) {
        self.record(content, Duration::ZERO);
    }

    fn take_recent(&mut self, max_age: Duration) -> Option<String> {
        let (content, copied_at) = self.recent.take()?;
        (copied_at.elapsed() <= max_age).then_some(content)
    }
}

// ============================================================================
// AI client
// ============================================================================

/// Failure reported by the AI client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NetworkError {
    pub message: String,
}

impl NetworkError {
    pub fn new<T: Into<String>>(message: T) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Question/answer client for the AI overlay.
///
/// `ask` blocks; the overlay controller calls it from a worker thread.
/// Timeouts are the client's responsibility.
pub trait AiClient: Send + Sync {
    fn ask(&self, question: &str) -> Result<String, NetworkError>;
}
