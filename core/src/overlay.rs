//! Overlay prompts: phrase capture and AI query.
//!
//! While an overlay is active every key is routed to it instead of the host
//! field. The AI query runs on a named worker thread and reports back through
//! an mpsc channel; the event thread drains the channel with [`poll`] before
//! reading overlay state. Each request carries the generation it was issued
//! under, and cancelling bumps the generation so late answers are dropped.
//!
//! [`poll`]: OverlayPromptController::poll

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::classifier::KeyCategory;
use crate::error::KeyboardError;
use crate::host::{AiClient, NetworkError};
use crate::key_event::{keycode, KeyEvent};
use crate::utils;

/// Kind of overlay prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    /// Typing a new quick phrase.
    PhraseCapture,
    /// Typing a question for the AI client.
    AiQuery,
}

/// Overlay lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayState {
    #[default]
    Inactive,
    Active(OverlayKind),
}

/// What a key did to the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayEvent {
    /// The key was absorbed by the overlay.
    Consumed,
    /// Phrase capture finished with a non-blank, normalised phrase.
    PhraseSubmitted(String),
    /// The overlay closed without producing anything.
    Closed,
}

struct Completion {
    generation: u64,
    result: Result<String, NetworkError>,
}

/// Controller for the single overlay prompt.
pub struct OverlayPromptController {
    state: OverlayState,
    text: String,
    client: Option<Arc<dyn AiClient>>,
    generation: u64,
    busy: bool,
    answer: Option<String>,
    last_error: Option<String>,
    tx: mpsc::Sender<Completion>,
    rx: mpsc::Receiver<Completion>,
}

impl std::fmt::Debug for OverlayPromptController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayPromptController")
            .field("state", &self.state)
            .field("text", &self.text)
            .field("generation", &self.generation)
            .field("busy", &self.busy)
            .field("has_client", &self.client.is_some())
            .finish()
    }
}

impl OverlayPromptController {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            state: OverlayState::Inactive,
            text: String::new(),
            client: None,
            generation: 0,
            busy: false,
            answer: None,
            last_error: None,
            tx,
            rx,
        }
    }

    pub fn with_client(client: Arc<dyn AiClient>) -> Self {
        let mut controller = Self::new();
        controller.client = Some(client);
        controller
    }

    pub fn set_client(&mut self, client: Option<Arc<dyn AiClient>>) {
        self.client = client;
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != OverlayState::Inactive
    }

    pub fn kind(&self) -> Option<OverlayKind> {
        match self.state {
            OverlayState::Active(kind) => Some(kind),
            OverlayState::Inactive => None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// True while an AI request is outstanding.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    /// Message of the last failed AI request.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Open an overlay with `initial` text, replacing any open one.
    pub fn open(&mut self, kind: OverlayKind, initial: &str) {
        if self.is_active() {
            self.cancel();
        }
        debug!(?kind, "overlay opened");
        self.state = OverlayState::Active(kind);
        self.text = initial.to_string();
        self.answer = None;
        self.last_error = None;
    }

    /// Route one key to the active overlay.
    pub fn handle_key(&mut self, event: &KeyEvent, category: &KeyCategory) -> OverlayEvent {
        let Some(kind) = self.kind() else {
            return OverlayEvent::Closed;
        };
        match category {
            KeyCategory::PrintableLatin(ch) | KeyCategory::PrintableOther(ch) => {
                self.text.push(*ch);
                OverlayEvent::Consumed
            }
            KeyCategory::DPadCenterOrSpace if event.code == keycode::SPACE => {
                self.text.push(' ');
                OverlayEvent::Consumed
            }
            KeyCategory::Delete => {
                self.text.pop();
                OverlayEvent::Consumed
            }
            KeyCategory::Clear => {
                self.text.clear();
                OverlayEvent::Consumed
            }
            KeyCategory::Back => {
                self.cancel();
                OverlayEvent::Closed
            }
            KeyCategory::Enter => match kind {
                OverlayKind::PhraseCapture => self.finish_phrase(),
                OverlayKind::AiQuery => OverlayEvent::Consumed,
            },
            _ => OverlayEvent::Consumed,
        }
    }

    /// Close a phrase capture, yielding the phrase if it is not blank.
    pub fn finish_phrase(&mut self) -> OverlayEvent {
        if self.kind() != Some(OverlayKind::PhraseCapture) {
            return OverlayEvent::Closed;
        }
        let phrase = utils::normalize(&self.text);
        self.close();
        if phrase.is_empty() {
            OverlayEvent::Closed
        } else {
            debug!(len = phrase.chars().count(), "phrase captured");
            OverlayEvent::PhraseSubmitted(phrase)
        }
    }

    pub fn clear_text(&mut self) {
        self.text.clear();
    }

    /// Send the current text to the AI client on a worker thread.
    ///
    /// Only one request may be outstanding; a second submit is rejected
    /// without contacting the client.
    pub fn submit_query(&mut self) -> Result<(), KeyboardError> {
        let kind = self.kind().ok_or(KeyboardError::NoActiveOverlay)?;
        if kind != OverlayKind::AiQuery {
            return Err(KeyboardError::WrongOverlayKind(kind));
        }
        if self.busy {
            return Err(KeyboardError::RequestInFlight);
        }
        let client = self.client.clone().ok_or(KeyboardError::NoAiClient)?;
        let question = self.text.trim().to_string();
        if question.is_empty() {
            return Err(KeyboardError::EmptyPrompt);
        }

        let generation = self.generation;
        let tx = self.tx.clone();
        thread::Builder::new()
            .name("softkey-ai".into())
            .spawn(move || {
                let result = client.ask(&question);
                // Receiver gone means the controller was dropped.
                let _ = tx.send(Completion { generation, result });
            })
            .map_err(|e| NetworkError::new(format!("failed to spawn AI worker: {e}")))?;

        self.busy = true;
        self.answer = None;
        self.last_error = None;
        debug!(generation, "AI query submitted");
        Ok(())
    }

    /// Drain finished requests. Returns true if overlay state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(completion) = self.rx.try_recv() {
            changed |= self.apply(completion);
        }
        changed
    }

    /// Block up to `timeout` for the outstanding request to finish.
    pub fn wait_completion(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.busy {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(completion) => {
                    self.apply(completion);
                }
                Err(_) => return false,
            }
        }
        true
    }

    fn apply(&mut self, completion: Completion) -> bool {
        if completion.generation != self.generation {
            debug!(
                generation = completion.generation,
                current = self.generation,
                "dropping stale AI answer"
            );
            return false;
        }
        self.busy = false;
        match completion.result {
            Ok(answer) => {
                debug!(len = answer.chars().count(), "AI answer received");
                self.answer = Some(answer);
            }
            Err(e) => {
                warn!(error = %e, "AI query failed");
                self.last_error = Some(e.message);
                self.state = OverlayState::Inactive;
                self.text.clear();
            }
        }
        true
    }

    /// Take the received answer and close the overlay.
    pub fn accept_answer(&mut self) -> Option<String> {
        let answer = self.answer.take()?;
        self.close();
        Some(answer)
    }

    /// Cancel the overlay and any outstanding request.
    pub fn cancel(&mut self) {
        if self.busy {
            debug!(generation = self.generation, "AI query cancelled");
        }
        self.generation += 1;
        self.busy = false;
        self.close();
    }

    fn close(&mut self) {
        self.state = OverlayState::Inactive;
        self.text.clear();
        self.answer = None;
    }
}

impl Default for OverlayPromptController {
    fn default() -> Self {
        Self::new()
    }
}
