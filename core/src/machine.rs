//! Input state machine.
//!
//! `InputStateMachine` routes classified key events between the composing
//! buffer, the candidate list, the decoding engine and the host text field.
//! It is the only place that decides when text is committed.
//!
//! Modes:
//! - `Idle`: nothing composing; keys commit or are forwarded to the host.
//! - `Composing`: Latin input is collected and decoded into candidates.
//! - `Predicting`: associative or clipboard candidates follow a commit.
//!
//! While an overlay prompt is open every key goes to the overlay instead.
//! Engine failures never escape: the composition is dropped, the machine
//! returns to Idle and the error is kept for [`InputStateMachine::take_last_error`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::calc;
use crate::candidate::{Candidate, CandidateList, Direction};
use crate::classifier::{KeyCategory, KeyClassifier};
use crate::composing::DeleteOutcome;
use crate::context::{InputField, KeyboardContext, KeyboardKind, Language};
use crate::engine::{Choice, DecodingEngine, EngineError};
use crate::error::KeyboardError;
use crate::host::{entry_candidates, AiClient, Clipboard, Entry, EntrySource, PhraseStore, TextSink};
use crate::key_event::{keycode, KeyEvent};
use crate::long_press::{LongPressAction, CLEAR_SAVE_LIMIT};
use crate::overlay::{OverlayEvent, OverlayKind, OverlayPromptController};
use crate::session::{ImeSession, InputMode};
use crate::symbols;
use crate::utils;
use crate::Config;

/// Whether the keyboard consumed an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResult {
    Handled,
    NotHandled,
}

/// The keyboard's input state machine.
pub struct InputStateMachine<E: DecodingEngine, S: TextSink> {
    engine: E,
    sink: S,
    config: Config,
    context: KeyboardContext,
    session: ImeSession,
    overlay: OverlayPromptController,
    phrases: Option<Box<dyn PhraseStore>>,
    clipboard: Option<Box<dyn Clipboard>>,
    revert_text: String,
    last_error: Option<KeyboardError>,
}

impl<E: DecodingEngine, S: TextSink> InputStateMachine<E, S> {
    pub fn new(engine: E, sink: S, config: Config) -> Self {
        Self {
            engine,
            sink,
            config,
            context: KeyboardContext::new(),
            session: ImeSession::new(),
            overlay: OverlayPromptController::new(),
            phrases: None,
            clipboard: None,
            revert_text: String::new(),
            last_error: None,
        }
    }

    pub fn with_context(mut self, context: KeyboardContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_ai_client(mut self, client: Arc<dyn AiClient>) -> Self {
        self.overlay.set_client(Some(client));
        self
    }

    pub fn with_phrase_store(mut self, store: Box<dyn PhraseStore>) -> Self {
        self.phrases = Some(store);
        self
    }

    pub fn with_clipboard(mut self, clipboard: Box<dyn Clipboard>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn current_mode(&self) -> InputMode {
        self.session.mode()
    }

    pub fn session(&self) -> &ImeSession {
        &self.session
    }

    pub fn candidates(&self) -> &CandidateList {
        self.session.candidates()
    }

    /// Text shown in the composing area.
    pub fn composing_text(&self) -> String {
        self.session.buffer().display_text()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn context(&self) -> &KeyboardContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut KeyboardContext {
        &mut self.context
    }

    pub fn overlay(&self) -> &OverlayPromptController {
        &self.overlay
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn phrase_store(&self) -> Option<&dyn PhraseStore> {
        self.phrases.as_deref()
    }

    pub fn clipboard(&self) -> Option<&dyn Clipboard> {
        self.clipboard.as_deref()
    }

    pub fn clipboard_mut(&mut self) -> Option<&mut (dyn Clipboard + 'static)> {
        self.clipboard.as_deref_mut()
    }

    /// The last error swallowed by the key path, if any.
    pub fn take_last_error(&mut self) -> Option<KeyboardError> {
        self.last_error.take()
    }

    // ========================================================================
    // Key path
    // ========================================================================

    /// Process one key event.
    pub fn process_key(&mut self, event: &KeyEvent) -> KeyResult {
        self.overlay.poll();
        let classifier = KeyClassifier::with_restricted_delete(self.context.restricts_delete());
        let category = classifier.classify(event);
        let before = self.session.mode();
        trace!(?category, mode = ?before, code = event.code, "key");

        let result = if self.overlay.is_active() {
            self.route_overlay(event, &category)
        } else if self.is_direct_input() && !category.is_function_key() {
            self.process_direct(category)
        } else {
            self.process_category(event, category)
        };

        let after = self.session.mode();
        if before != after {
            debug!(from = ?before, to = ?after, "mode changed");
        }
        result
    }

    /// Keys that never start a composition commit or forward immediately.
    fn is_direct_input(&self) -> bool {
        self.context.is_password()
            || self.context.keyboard.is_direct()
            || (self.context.language() == Language::English && !self.config.english_cell_search)
    }

    fn process_direct(&mut self, category: KeyCategory) -> KeyResult {
        match category {
            KeyCategory::PrintableLatin(ch) => {
                self.session.clear();
                let ch = if !ch.is_ascii_alphabetic() {
                    ch
                } else if self.context.lower_case {
                    ch.to_ascii_lowercase()
                } else {
                    ch.to_ascii_uppercase()
                };
                self.sink.commit_text(ch.encode_utf8(&mut [0; 4]));
                KeyResult::Handled
            }
            KeyCategory::PrintableOther(ch) => {
                self.session.clear();
                self.commit_paired(ch);
                KeyResult::Handled
            }
            _ => KeyResult::NotHandled,
        }
    }

    fn process_category(&mut self, event: &KeyEvent, category: KeyCategory) -> KeyResult {
        let mode = self.session.mode();
        match category {
            KeyCategory::NoOp => return KeyResult::NotHandled,
            KeyCategory::Back => {
                if !self.context.shown {
                    return KeyResult::NotHandled;
                }
                self.reset_to_idle();
                self.sink.request_hide();
            }
            KeyCategory::PrintableLatin(ch) => {
                self.session.start_composing();
                self.session.buffer_mut().append(ch);
                self.refresh();
            }
            KeyCategory::PrintableOther(ch) => {
                if mode == InputMode::Composing {
                    self.force_commit();
                }
                self.session.clear();
                self.commit_paired(ch);
            }
            KeyCategory::Delete => self.handle_delete(mode),
            KeyCategory::DPadCenterOrSpace => {
                if mode == InputMode::Composing && !self.session.is_finish() {
                    self.commit_active();
                } else {
                    self.session.clear();
                    self.sink.send_function_key(event.code);
                }
            }
            KeyCategory::Enter => {
                if mode == InputMode::Composing && !self.session.is_finish() {
                    let text = self.session.buffer().commit_text();
                    self.sink.commit_text(&text);
                    self.drop_composition();
                } else {
                    self.session.clear();
                    self.forward_enter();
                }
            }
            KeyCategory::Clear => self.reset_to_idle(),
            KeyCategory::DPadLeftRight(direction) => {
                self.handle_dpad(event, mode, direction);
            }
            KeyCategory::OtherFunctionKey(code) => {
                if mode == InputMode::Composing {
                    self.force_commit();
                }
                self.session.clear();
                self.sink.send_function_key(code);
            }
        }
        KeyResult::Handled
    }

    fn handle_delete(&mut self, mode: InputMode) {
        if mode != InputMode::Composing {
            self.session.clear();
            self.sink.delete_before_cursor(1);
            return;
        }
        match self.session.buffer_mut().delete_last() {
            DeleteOutcome::Forward => {
                self.drop_composition();
                self.sink.delete_before_cursor(1);
            }
            DeleteOutcome::Deleted => {
                if self.session.buffer().is_empty() {
                    self.sink.set_composing_text("");
                    self.drop_composition();
                } else {
                    self.refresh();
                }
            }
        }
    }

    fn handle_dpad(&mut self, event: &KeyEvent, mode: InputMode, direction: Direction) {
        if mode == InputMode::Composing && !self.session.is_finish() {
            if !event.is_soft() && !self.session.candidates().is_empty() {
                self.session.candidates_mut().move_active(direction);
            } else {
                self.commit_active();
            }
            return;
        }
        self.session.clear();
        self.sink.move_cursor(direction);
    }

    fn forward_enter(&mut self) {
        match self.context.field.enter_action() {
            Some(action) => self.sink.perform_editor_action(action),
            None => self.sink.send_function_key(keycode::ENTER),
        }
    }

    // ========================================================================
    // Composition
    // ========================================================================

    /// Re-decode the buffer and update candidates and the composing region.
    fn refresh(&mut self) {
        let buffer = self.session.buffer();
        if buffer.is_empty() {
            self.sink.set_composing_text("");
            self.drop_composition();
            return;
        }
        let raw = buffer.raw_text();
        if raw.is_empty() {
            // Only a fixed prefix is left.
            let display = buffer.display_text();
            self.session.candidates_mut().clear();
            self.sink.set_composing_text(&display);
            return;
        }
        match self.engine.candidates_for(&raw) {
            Ok(candidates) => {
                let finished = self.engine.is_finished(&raw);
                let display = self.engine.display_for(&raw);
                let candidates = self.limit(candidates);
                self.session.buffer_mut().set_engine_state(display, finished);
                self.session.candidates_mut().replace(candidates);
                let text = self.session.buffer().display_text();
                self.sink.set_composing_text(&text);
            }
            Err(err) => self.fail(err),
        }
    }

    fn limit(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        if self.config.max_candidates > 0 {
            candidates.truncate(self.config.max_candidates);
        }
        candidates
    }

    /// Drop composing state without touching the host.
    fn drop_composition(&mut self) {
        self.session.clear();
        self.engine.reset();
    }

    fn fail(&mut self, err: EngineError) {
        warn!(error = %err, "decoding engine failed, dropping composition");
        if !self.session.buffer().is_empty() {
            self.sink.set_composing_text("");
        }
        self.drop_composition();
        self.last_error = Some(KeyboardError::Engine(err));
    }

    /// Commit the active candidate (Space / DPad).
    fn commit_active(&mut self) {
        if self.commit_active_clip() {
            return;
        }
        if self.session.buffer().raw_text().is_empty() || self.session.candidates().is_empty() {
            let text = self.session.buffer().commit_text();
            self.sink.commit_text(&text);
            self.drop_composition();
            return;
        }
        let index = self.session.candidates().active_index();
        self.choose(index);
    }

    /// Commit whatever is composing before an unrelated key takes effect.
    fn force_commit(&mut self) {
        if self.session.buffer().is_empty() || self.commit_active_clip() {
            return;
        }
        let text = if self.context.language() == Language::English
            || self.session.candidates().is_empty()
            || self.session.buffer().raw_text().is_empty()
        {
            Ok(self.session.buffer().commit_text())
        } else {
            let raw = self.session.buffer().raw_text();
            let index = self.session.candidates().active_index();
            self.engine.choose(&raw, index).map(|choice| {
                let mut text = self.session.buffer().fixed().to_string();
                match choice {
                    Choice::Commit { text: chosen, .. } => text.push_str(&chosen),
                    Choice::Partial { text: chosen, consumed } => {
                        text.push_str(&chosen);
                        text.extend(raw.chars().skip(consumed));
                    }
                }
                text
            })
        };
        match text {
            Ok(text) => {
                self.sink.commit_text(&text);
                self.drop_composition();
            }
            Err(err) => self.fail(err),
        }
    }

    /// Commit the active candidate literally if it is a clip item.
    fn commit_active_clip(&mut self) -> bool {
        let text = match self.session.candidates().active() {
            Some(candidate) if candidate.is_clip() => candidate.text.clone(),
            _ => return false,
        };
        self.commit_clip(&text);
        true
    }

    /// Clip items bypass the engine, auto-space, pairing and predictions.
    fn commit_clip(&mut self, text: &str) {
        self.sink.commit_text(text);
        self.drop_composition();
    }

    /// Choose engine candidate `index` of the current composition.
    fn choose(&mut self, index: usize) {
        let raw = self.session.buffer().raw_text();
        match self.engine.choose(&raw, index) {
            Ok(Choice::Partial { text, consumed }) => {
                self.session.buffer_mut().fix_prefix(&text, consumed);
                self.refresh();
            }
            Ok(Choice::Commit { text, complete }) => {
                let mut committed = self.session.buffer_mut().take_fixed();
                committed.push_str(&text);
                self.commit_candidate(&committed, complete);
            }
            Err(err) => self.fail(err),
        }
    }

    /// Commit chosen candidate text, then decide between Predicting and Idle.
    fn commit_candidate(&mut self, text: &str, complete: bool) {
        self.sink.commit_text(text);
        if self.context.language() == Language::English
            && complete
            && self.config.auto_space
            && utils::is_english_word(text)
        {
            self.sink.commit_text(" ");
        }
        self.engine.reset();
        self.enter_predictions(text);
    }

    fn enter_predictions(&mut self, committed: &str) {
        if !self.config.chinese_prediction || self.context.language() != Language::Chinese {
            self.session.clear();
            return;
        }
        match self.engine.predictions_for(committed) {
            Ok(predictions) => {
                let predictions = self.limit(predictions);
                self.session.predict(predictions);
            }
            Err(err) => self.fail(err),
        }
    }

    fn commit_paired(&mut self, ch: char) {
        let mut buf = [0; 4];
        self.commit_paired_text(ch.encode_utf8(&mut buf));
    }

    fn commit_paired_text(&mut self, text: &str) {
        match symbols::closing_for_text(text) {
            Some(close) if self.config.symbol_pair_input => {
                let mut pair = text.to_string();
                pair.push(close);
                self.sink.commit_text(&pair);
                self.sink.move_cursor(Direction::Left);
            }
            _ => self.sink.commit_text(text),
        }
    }

    // ========================================================================
    // Candidate bar
    // ========================================================================

    /// Select candidate `index` from the candidate bar.
    pub fn select_candidate(&mut self, index: usize) -> Result<(), KeyboardError> {
        let candidate = match self.session.candidates_mut().select(index) {
            Ok(candidate) => candidate.clone(),
            Err(err) => {
                warn!(error = %err, "candidate selection rejected");
                return Err(err);
            }
        };
        debug!(index, clip = candidate.is_clip(), "candidate selected");

        if candidate.is_clip() {
            self.commit_clip(&candidate.text);
            return Ok(());
        }
        match self.session.mode() {
            InputMode::Composing => self.choose(index),
            InputMode::Predicting | InputMode::Idle => {
                self.sink.commit_text(&candidate.text);
                self.enter_predictions(&candidate.text);
            }
        }
        Ok(())
    }

    /// Fill the candidate bar with clipboard or phrase entries.
    pub fn show_entries(&mut self, source: &dyn EntrySource) {
        self.show_entry_list(source.all_entries());
    }

    /// Fill the candidate bar with the clipboard history.
    pub fn show_clipboard(&mut self) {
        let entries = self
            .clipboard
            .as_ref()
            .map(|clipboard| clipboard.all_entries())
            .unwrap_or_default();
        self.show_entry_list(entries);
    }

    fn show_entry_list(&mut self, entries: Vec<Entry>) {
        self.reset_to_idle();
        self.session.predict(entry_candidates(entries));
    }

    /// Fill the candidate bar with literal symbols.
    pub fn show_symbols(&mut self, symbols: &[String]) {
        self.reset_to_idle();
        let candidates = symbols
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| Candidate::clip(s.as_str()))
            .collect();
        self.session.predict(candidates);
    }

    /// Drop composition and candidates and return to Idle.
    pub fn reset_to_idle(&mut self) {
        if !self.session.buffer().is_empty() {
            self.sink.set_composing_text("");
        }
        self.drop_composition();
    }

    // ========================================================================
    // Long press
    // ========================================================================

    /// Dispatch one long-press gesture.
    pub fn handle_long_press(&mut self, action: LongPressAction) -> KeyResult {
        if self.overlay.is_active() {
            if action == LongPressAction::Clear {
                self.overlay.clear_text();
            }
            return KeyResult::Handled;
        }
        if action == LongPressAction::None {
            return KeyResult::NotHandled;
        }
        debug!(?action, "long press");

        if self.session.mode() == InputMode::Composing {
            self.force_commit();
        }
        self.session.clear();

        match action {
            LongPressAction::Text(text) => self.commit_paired_text(&text),
            LongPressAction::SwitchIme => self.sink.show_input_method_picker(),
            LongPressAction::EnglishCell => {
                self.config.english_cell_search = !self.config.english_cell_search;
            }
            LongPressAction::Clear => {
                let saved = self.sink.text_before_cursor(CLEAR_SAVE_LIMIT);
                if !saved.is_empty() {
                    self.sink.delete_before_cursor(saved.chars().count());
                    self.revert_text = saved;
                }
            }
            LongPressAction::Revert => {
                if !self.revert_text.is_empty() {
                    let text = std::mem::take(&mut self.revert_text);
                    self.sink.commit_text(&text);
                }
            }
            LongPressAction::Enter => self.sink.commit_text("\n"),
            LongPressAction::None => {}
        }
        KeyResult::Handled
    }

    // ========================================================================
    // Host lifecycle
    // ========================================================================

    /// A new field gained focus.
    pub fn on_start_input(&mut self, field: InputField, restarting: bool) {
        debug!(purpose = ?field.purpose, restarting, "start input");
        if !restarting || field != self.context.field {
            self.reset_to_idle();
        }
        self.context.field = field;
        self.context.shown = true;
        if !restarting {
            self.suggest_clipboard();
        }
    }

    /// Offer the newest clipboard item as a literal candidate.
    ///
    /// The item is taken from the clipboard, so it is offered at most once.
    /// Returns true when it was shown.
    pub fn suggest_clipboard(&mut self) -> bool {
        if !self.config.clipboard_suggestion || self.session.mode() != InputMode::Idle {
            return false;
        }
        let max_age = Duration::from_secs(self.config.clipboard_item_timeout_secs);
        let content = match self.clipboard.as_mut().and_then(|c| c.take_recent(max_age)) {
            Some(content) if !content.trim().is_empty() => content,
            _ => return false,
        };
        debug!("offering recent clipboard item");
        self.show_symbols(&[content]);
        true
    }

    /// The host cursor moved; `text_before_cursor` is the text before it.
    ///
    /// A trailing arithmetic expression offers its result. Otherwise, when
    /// idle after Chinese text, associative candidates are shown for the
    /// trailing context.
    pub fn on_update_selection(&mut self, text_before_cursor: &str) {
        if self.session.mode() != InputMode::Idle
            || self.overlay.is_active()
            || !self.config.chinese_prediction
            || text_before_cursor.trim().is_empty()
        {
            return;
        }
        if let Some(expr) = calc::trailing_expression(text_before_cursor) {
            let results = calc::results_for(expr);
            if !results.is_empty() {
                debug!(expr, "offering arithmetic result");
                self.show_symbols(&results);
            }
            return;
        }
        if self.context.language() != Language::Chinese
            || !utils::ends_with_cjk(text_before_cursor)
        {
            return;
        }
        let context = utils::tail_chars(text_before_cursor, self.config.prediction_context_chars);
        match self.engine.predictions_for(&context) {
            Ok(predictions) => {
                let predictions = self.limit(predictions);
                self.session.predict(predictions);
            }
            Err(err) => self.fail(err),
        }
    }

    /// The keyboard window was hidden or focus left the field.
    pub fn on_window_hidden(&mut self) {
        match self.overlay.kind() {
            Some(OverlayKind::PhraseCapture) => {
                if let OverlayEvent::PhraseSubmitted(phrase) = self.overlay.finish_phrase() {
                    self.store_phrase(&phrase);
                }
            }
            Some(OverlayKind::AiQuery) => self.overlay.cancel(),
            None => {}
        }
        self.reset_to_idle();
        self.context.shown = false;
    }

    pub fn on_window_shown(&mut self) {
        self.context.shown = true;
    }

    /// Show another keyboard, dropping any composition.
    pub fn switch_keyboard(&mut self, kind: KeyboardKind) {
        debug!(from = ?self.context.keyboard, to = ?kind, "switch keyboard");
        self.reset_to_idle();
        self.context.keyboard = kind;
    }

    // ========================================================================
    // Overlay prompts
    // ========================================================================

    /// Open an overlay prompt.
    ///
    /// Editing an existing phrase removes it from the store; submitting
    /// stores the edited text.
    pub fn open_overlay(&mut self, kind: OverlayKind, initial: &str) {
        self.reset_to_idle();
        if kind == OverlayKind::PhraseCapture && !initial.is_empty() {
            if let Some(store) = self.phrases.as_mut() {
                store.remove_phrase(initial);
            }
        }
        self.overlay.open(kind, initial);
    }

    pub fn submit_query(&mut self) -> Result<(), KeyboardError> {
        self.overlay.submit_query()
    }

    /// Drain finished AI requests. Returns true if overlay state changed.
    pub fn poll_overlay(&mut self) -> bool {
        self.overlay.poll()
    }

    /// Block up to `timeout` for an outstanding AI request.
    pub fn wait_overlay(&mut self, timeout: Duration) -> bool {
        self.overlay.wait_completion(timeout)
    }

    /// Copy the AI answer to the clipboard, close the overlay and show the
    /// clipboard history. The host field is not touched.
    pub fn accept_overlay_answer(&mut self) -> Option<String> {
        self.overlay.poll();
        let answer = self.overlay.accept_answer()?;
        match self.clipboard.as_mut() {
            Some(clipboard) => clipboard.copy(&answer),
            None => warn!("AI answer accepted but no clipboard is configured"),
        }
        self.show_clipboard();
        Some(answer)
    }

    pub fn cancel_overlay(&mut self) {
        self.overlay.cancel();
    }

    fn route_overlay(&mut self, event: &KeyEvent, category: &KeyCategory) -> KeyResult {
        match self.overlay.handle_key(event, category) {
            OverlayEvent::PhraseSubmitted(phrase) => self.store_phrase(&phrase),
            OverlayEvent::Consumed | OverlayEvent::Closed => {}
        }
        KeyResult::Handled
    }

    fn store_phrase(&mut self, phrase: &str) {
        match self.phrases.as_mut() {
            Some(store) => store.add_phrase(phrase),
            None => warn!("phrase captured but no phrase store is configured"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EditorAction, InputPurpose};
    use crate::engine::TableEngine;
    use crate::host::{Entry, MemoryClipboard, MemoryEntries, RecordingSink, SinkCall};

    type Machine = InputStateMachine<TableEngine, RecordingSink>;

    fn machine() -> Machine {
        InputStateMachine::new(TableEngine::demo(), RecordingSink::new(), Config::default())
    }

    fn english_machine() -> Machine {
        let mut m = machine();
        m.config_mut().english_cell_search = true;
        m.switch_keyboard(KeyboardKind::QwertyAbc);
        m
    }

    fn type_str(m: &mut Machine, text: &str) {
        for ch in text.chars() {
            assert_eq!(m.process_key(&KeyEvent::soft_char(ch)), KeyResult::Handled);
        }
    }

    #[test]
    fn test_typing_enters_composing() {
        let mut m = machine();
        type_str(&mut m, "ni");
        assert_eq!(m.current_mode(), InputMode::Composing);
        assert_eq!(m.composing_text(), "ni");
        assert_eq!(m.candidates().get(0).unwrap().text, "你");
        assert_eq!(m.sink().composing(), "ni");
    }

    #[test]
    fn test_space_commits_active_candidate() {
        let mut m = machine();
        type_str(&mut m, "hao");
        m.process_key(&KeyEvent::soft_code(keycode::SPACE));
        assert_eq!(m.sink().text(), "好");
        // No predictions follow 好 in the demo table.
        assert_eq!(m.current_mode(), InputMode::Idle);
    }

    #[test]
    fn test_partial_choice_keeps_composing() {
        let mut m = machine();
        type_str(&mut m, "nihao");
        // ["你好", "你", "尼", "泥", "nihao"]
        m.select_candidate(1).unwrap();
        assert_eq!(m.current_mode(), InputMode::Composing);
        assert_eq!(m.composing_text(), "你hao");
        assert_eq!(m.candidates().get(0).unwrap().text, "好");

        m.select_candidate(0).unwrap();
        assert_eq!(m.sink().commits(), vec!["你好"]);
    }

    #[test]
    fn test_delete_in_composing() {
        let mut m = machine();
        type_str(&mut m, "ni");
        m.process_key(&KeyEvent::soft_code(keycode::DEL));
        assert_eq!(m.composing_text(), "n");
        m.process_key(&KeyEvent::soft_code(keycode::DEL));
        assert_eq!(m.current_mode(), InputMode::Idle);
        assert_eq!(m.sink().composing(), "");
        assert!(!m.sink().calls().contains(&SinkCall::DeleteBefore(1)));
    }

    #[test]
    fn test_printable_other_force_commits() {
        let mut m = machine();
        type_str(&mut m, "ni");
        m.process_key(&KeyEvent::soft_char('，'));
        assert_eq!(m.sink().commits(), vec!["你", "，"]);
        assert_eq!(m.current_mode(), InputMode::Idle);
    }

    #[test]
    fn test_other_function_key_commits_then_forwards() {
        let mut m = machine();
        type_str(&mut m, "wo");
        m.process_key(&KeyEvent::code(61)); // TAB
        let calls = m.sink().calls();
        assert_eq!(calls[calls.len() - 2], SinkCall::Commit("我".into()));
        assert_eq!(calls[calls.len() - 1], SinkCall::FunctionKey(61));
        assert_eq!(m.current_mode(), InputMode::Idle);
    }

    #[test]
    fn test_engine_error_resets() {
        let mut m = machine();
        type_str(&mut m, "na");
        assert_eq!(m.current_mode(), InputMode::Composing);
        // The table engine rejects non-ASCII units.
        m.session.buffer_mut().append('é');
        m.refresh();
        assert_eq!(m.current_mode(), InputMode::Idle);
        assert!(matches!(m.take_last_error(), Some(KeyboardError::Engine(_))));
        assert_eq!(m.sink().composing(), "");
    }

    #[test]
    fn test_enter_forwards_editor_action() {
        let mut m = machine();
        m.on_start_input(
            InputField::new(InputPurpose::FreeForm).with_action(EditorAction::Send),
            false,
        );
        m.process_key(&KeyEvent::soft_code(keycode::ENTER));
        assert_eq!(m.sink().calls(), &[SinkCall::EditorAction(EditorAction::Send)]);

        let mut m = machine();
        m.process_key(&KeyEvent::soft_code(keycode::ENTER));
        assert_eq!(m.sink().calls(), &[SinkCall::FunctionKey(keycode::ENTER)]);
    }

    #[test]
    fn test_auto_space_after_english_word() {
        let mut m = english_machine();
        type_str(&mut m, "hello");
        m.select_candidate(0).unwrap();
        assert_eq!(m.sink().commits(), vec!["hello", " "]);
        assert_eq!(m.current_mode(), InputMode::Idle);
    }

    #[test]
    fn test_no_auto_space_when_disabled() {
        let mut m = english_machine();
        m.config_mut().auto_space = false;
        type_str(&mut m, "hello");
        m.select_candidate(0).unwrap();
        assert_eq!(m.sink().commits(), vec!["hello"]);
    }

    #[test]
    fn test_direct_english_letters() {
        let mut m = machine();
        m.switch_keyboard(KeyboardKind::QwertyAbc);
        m.context_mut().lower_case = false;
        type_str(&mut m, "ab1");
        assert_eq!(m.sink().text(), "AB1");
        assert_eq!(m.current_mode(), InputMode::Idle);
    }

    #[test]
    fn test_password_field_restricts_delete() {
        let mut m = machine();
        m.on_start_input(InputField::new(InputPurpose::Password), false);
        type_str(&mut m, "x");
        m.process_key(&KeyEvent::soft_code(keycode::DEL));
        assert_eq!(
            m.sink().calls(),
            &[SinkCall::Commit("x".into()), SinkCall::FunctionKey(keycode::DEL)]
        );
    }

    #[test]
    fn test_dpad_moves_active_for_physical_keys() {
        let mut m = machine();
        type_str(&mut m, "ni");
        m.process_key(&KeyEvent::code(keycode::DPAD_RIGHT));
        assert_eq!(m.candidates().active_index(), 1);
        assert_eq!(m.current_mode(), InputMode::Composing);

        // A soft arrow while composing commits the active candidate in place.
        m.process_key(&KeyEvent::soft_code(keycode::DPAD_LEFT));
        assert_eq!(m.sink().commits(), vec!["尼"]);
        assert_eq!(m.current_mode(), InputMode::Idle);
        assert!(!m
            .sink()
            .calls()
            .iter()
            .any(|call| matches!(call, SinkCall::MoveCursor(_))));

        m.process_key(&KeyEvent::soft_code(keycode::DPAD_LEFT));
        assert_eq!(m.sink().calls().last(), Some(&SinkCall::MoveCursor(Direction::Left)));
    }

    #[test]
    fn test_active_clip_commits_literally_on_space() {
        let mut m = english_machine();
        type_str(&mut m, "hel");
        m.session
            .candidates_mut()
            .replace(vec![Candidate::clip("hello"), Candidate::new("help")]);
        m.sink_mut().take_calls();

        m.process_key(&KeyEvent::soft_code(keycode::SPACE));
        assert_eq!(m.sink().calls(), &[SinkCall::Commit("hello".into())]);
        assert_eq!(m.current_mode(), InputMode::Idle);
    }

    #[test]
    fn test_active_clip_commits_literally_on_long_press() {
        let mut m = machine();
        type_str(&mut m, "ni");
        m.session.candidates_mut().replace(vec![Candidate::clip("(x")]);
        m.sink_mut().take_calls();

        m.handle_long_press(LongPressAction::Text("!".into()));
        assert_eq!(
            m.sink().calls(),
            &[SinkCall::Commit("(x".into()), SinkCall::Commit("!".into())]
        );
        assert_eq!(m.current_mode(), InputMode::Idle);
    }

    #[test]
    fn test_back_hides_keyboard() {
        let mut m = machine();
        type_str(&mut m, "ni");
        assert_eq!(m.process_key(&KeyEvent::code(keycode::BACK)), KeyResult::Handled);
        assert_eq!(m.current_mode(), InputMode::Idle);
        assert_eq!(m.sink().calls().last(), Some(&SinkCall::RequestHide));

        m.on_window_hidden();
        assert_eq!(m.process_key(&KeyEvent::code(keycode::BACK)), KeyResult::NotHandled);
    }

    #[test]
    fn test_clip_candidates_commit_literal() {
        let mut m = machine();
        let mut clips = MemoryEntries::new();
        clips.push(Entry::new("ni"));
        clips.push(Entry::pinned("(x"));
        m.show_entries(&clips);
        assert_eq!(m.current_mode(), InputMode::Predicting);
        assert_eq!(m.candidates().get(0).unwrap().text, "(x");

        m.select_candidate(1).unwrap();
        assert_eq!(m.sink().commits(), vec!["ni"]);
        assert_eq!(m.current_mode(), InputMode::Idle);
    }

    #[test]
    fn test_long_press_clear_and_revert() {
        let mut m = machine();
        m.sink_mut().commit_text("abc");
        m.handle_long_press(LongPressAction::Clear);
        assert_eq!(m.sink().text(), "");
        m.handle_long_press(LongPressAction::Revert);
        assert_eq!(m.sink().text(), "abc");
    }

    #[test]
    fn test_long_press_force_commits_first() {
        let mut m = machine();
        type_str(&mut m, "wo");
        m.handle_long_press(LongPressAction::Text("(".into()));
        assert_eq!(m.sink().text(), "我()");
        assert_eq!(m.sink().cursor(), 2);
        assert_eq!(m.current_mode(), InputMode::Idle);
    }

    #[test]
    fn test_long_press_english_cell_toggles() {
        let mut m = machine();
        let before = m.config().english_cell_search;
        m.handle_long_press(LongPressAction::EnglishCell);
        assert_eq!(m.config().english_cell_search, !before);
        assert_eq!(m.handle_long_press(LongPressAction::None), KeyResult::NotHandled);
    }

    #[test]
    fn test_clipboard_suggested_once_on_start_input() {
        let mut clipboard = MemoryClipboard::new();
        clipboard.copy("copied");
        let mut m = machine().with_clipboard(Box::new(clipboard));

        m.on_start_input(InputField::new(InputPurpose::FreeForm), false);
        assert_eq!(m.current_mode(), InputMode::Predicting);
        let candidate = m.candidates().get(0).unwrap();
        assert!(candidate.is_clip());
        assert_eq!(candidate.text, "copied");

        m.reset_to_idle();
        m.on_start_input(InputField::new(InputPurpose::FreeForm), false);
        assert_eq!(m.current_mode(), InputMode::Idle);
        assert!(!m.suggest_clipboard());
    }

    #[test]
    fn test_clipboard_suggestion_skips_restart_and_stale_items() {
        let mut clipboard = MemoryClipboard::new();
        clipboard.copy("copied");
        let mut m = machine().with_clipboard(Box::new(clipboard));
        m.on_start_input(InputField::new(InputPurpose::FreeForm), true);
        assert_eq!(m.current_mode(), InputMode::Idle);

        let timeout = m.config().clipboard_item_timeout_secs;
        let mut clipboard = MemoryClipboard::new();
        clipboard.record("old", Duration::from_secs(timeout + 1));
        let mut m = machine().with_clipboard(Box::new(clipboard));
        m.on_start_input(InputField::new(InputPurpose::FreeForm), false);
        assert_eq!(m.current_mode(), InputMode::Idle);

        let mut clipboard = MemoryClipboard::new();
        clipboard.copy("copied");
        let mut m = machine().with_clipboard(Box::new(clipboard));
        m.config_mut().clipboard_suggestion = false;
        m.on_start_input(InputField::new(InputPurpose::FreeForm), false);
        assert_eq!(m.current_mode(), InputMode::Idle);
    }

    #[test]
    fn test_update_selection_predicts_after_cjk() {
        let mut m = machine();
        m.on_update_selection("我爱你");
        assert_eq!(m.current_mode(), InputMode::Predicting);
        assert_eq!(m.candidates().get(0).unwrap().text, "好");

        let mut m = machine();
        m.on_update_selection("abc");
        assert_eq!(m.current_mode(), InputMode::Idle);
    }

    #[test]
    fn test_update_selection_offers_arithmetic_result() {
        let mut m = machine();
        m.on_update_selection("一共 12*3=");
        assert_eq!(m.current_mode(), InputMode::Predicting);
        assert_eq!(m.candidates().len(), 1);
        assert!(m.candidates().get(0).unwrap().is_clip());

        m.select_candidate(0).unwrap();
        assert_eq!(m.sink().commits(), vec!["36"]);
        assert_eq!(m.current_mode(), InputMode::Idle);

        // Works on the English keyboard too, and before the '=' is typed.
        let mut m = english_machine();
        m.on_update_selection("(1+2)/4");
        let texts: Vec<&str> = m.candidates().candidates().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["=0.75", "0.75"]);

        // A malformed expression shows nothing and no predictions.
        let mut m = machine();
        m.on_update_selection("你 3-");
        assert_eq!(m.current_mode(), InputMode::Idle);

        let mut m = machine();
        m.config_mut().chinese_prediction = false;
        m.on_update_selection("1+1=");
        assert_eq!(m.current_mode(), InputMode::Idle);
    }

    #[test]
    fn test_overlay_routes_keys() {
        let mut m = machine().with_phrase_store(Box::new(MemoryEntries::new()));
        m.open_overlay(OverlayKind::PhraseCapture, "");
        type_str(&mut m, "hi");
        assert_eq!(m.current_mode(), InputMode::Idle);
        assert!(m.sink().calls().is_empty());

        m.process_key(&KeyEvent::soft_code(keycode::ENTER));
        let store = m.phrase_store().unwrap();
        assert_eq!(store.all_entries(), vec![Entry::new("hi")]);
        assert!(!m.overlay().is_active());
    }

    #[test]
    fn test_window_hidden_submits_phrase() {
        let mut store = MemoryEntries::new();
        store.add_phrase("old");
        let mut m = machine().with_phrase_store(Box::new(store));
        m.open_overlay(OverlayKind::PhraseCapture, "old");
        assert!(m.phrase_store().unwrap().all_entries().is_empty());

        m.process_key(&KeyEvent::soft_char('!'));
        m.on_window_hidden();
        assert_eq!(
            m.phrase_store().unwrap().all_entries(),
            vec![Entry::new("old!")]
        );
    }
}
