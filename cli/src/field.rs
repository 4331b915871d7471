//! Text field simulated in the terminal.

use softkey_core::{keycode, Direction, EditorAction, TextSink};

/// Host field that applies keyboard output to an in-memory line.
#[derive(Debug, Default)]
pub struct TerminalField {
    text: Vec<char>,
    cursor: usize,
    composing: String,
    hidden: bool,
}

impl TerminalField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field contents with the cursor (and composing region) marked.
    pub fn render(&self) -> String {
        let before: String = self.text[..self.cursor].iter().collect();
        let after: String = self.text[self.cursor..].iter().collect();
        if self.composing.is_empty() {
            format!("{before}|{after}")
        } else {
            format!("{before}[{}]|{after}", self.composing)
        }
    }

    /// Whether the keyboard asked to be hidden since the last call.
    pub fn take_hide_request(&mut self) -> bool {
        std::mem::take(&mut self.hidden)
    }

    fn insert(&mut self, text: &str) {
        for ch in text.chars() {
            self.text.insert(self.cursor, ch);
            self.cursor += 1;
        }
    }
}

impl TextSink for TerminalField {
    fn set_composing_text(&mut self, text: &str) {
        self.composing = text.to_string();
    }

    fn commit_text(&mut self, text: &str) {
        self.composing.clear();
        self.insert(text);
    }

    fn delete_before_cursor(&mut self, n: usize) {
        let n = n.min(self.cursor);
        self.text.drain(self.cursor - n..self.cursor);
        self.cursor -= n;
    }

    fn move_cursor(&mut self, direction: Direction) {
        match direction {
            Direction::Left => self.cursor = self.cursor.saturating_sub(1),
            Direction::Right => self.cursor = (self.cursor + 1).min(self.text.len()),
        }
    }

    fn send_function_key(&mut self, code: i32) {
        match code {
            keycode::SPACE => self.insert(" "),
            keycode::ENTER => self.insert("\n"),
            keycode::DEL => self.delete_before_cursor(1),
            other => tracing::info!(code = other, "function key sent to host"),
        }
    }

    fn perform_editor_action(&mut self, action: EditorAction) {
        println!("  ↳ editor action {action:?}");
    }

    fn text_before_cursor(&self, n: usize) -> String {
        let start = self.cursor.saturating_sub(n);
        self.text[start..self.cursor].iter().collect()
    }

    fn request_hide(&mut self) {
        self.hidden = true;
    }

    fn show_input_method_picker(&mut self) {
        println!("  ↳ input method picker");
    }
}
