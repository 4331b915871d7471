// core/tests/overlay_flow.rs
//
// Overlay prompts driven through the state machine.
//
// Tests cover:
// - One outstanding AI request; a second submit makes no network call
// - Accepting an answer copies it to the clipboard, never into the field
// - Cancel and focus loss drop late answers
// - Phrase capture stores normalised phrases

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use softkey_core::{
    keycode, AiClient, Config, EntrySource, InputMode, InputStateMachine, KeyEvent,
    KeyboardError, MemoryClipboard, MemoryEntries, NetworkError, OverlayKind, RecordingSink,
    TableEngine,
};

/// Answers once released, counting calls.
struct GatedClient {
    calls: AtomicUsize,
    gate: Mutex<mpsc::Receiver<String>>,
}

impl GatedClient {
    fn new() -> (Arc<Self>, mpsc::Sender<String>) {
        let (tx, rx) = mpsc::channel();
        let client = Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: Mutex::new(rx),
        });
        (client, tx)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AiClient for GatedClient {
    fn ask(&self, _question: &str) -> Result<String, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self
            .gate
            .lock()
            .map_err(|_| NetworkError::new("gate poisoned"))?;
        gate.recv().map_err(|_| NetworkError::new("gate closed"))
    }
}

type Machine = InputStateMachine<TableEngine, RecordingSink>;

fn machine_with(client: Arc<GatedClient>) -> Machine {
    InputStateMachine::new(TableEngine::demo(), RecordingSink::new(), Config::default())
        .with_ai_client(client)
        .with_phrase_store(Box::new(MemoryEntries::new()))
        .with_clipboard(Box::new(MemoryClipboard::new()))
}

fn type_str(m: &mut Machine, text: &str) {
    for ch in text.chars() {
        m.process_key(&KeyEvent::soft_char(ch));
    }
}

fn wait_for_calls(client: &GatedClient, n: usize) {
    for _ in 0..500 {
        if client.calls() >= n {
            return;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    panic!("client never called");
}

#[test]
fn test_second_submit_rejected_until_first_resolves() {
    let (client, release) = GatedClient::new();
    let mut m = machine_with(client.clone());
    m.open_overlay(OverlayKind::AiQuery, "");
    type_str(&mut m, "weather");

    m.submit_query().unwrap();
    assert!(m.overlay().is_busy());
    wait_for_calls(&client, 1);

    assert_eq!(m.submit_query(), Err(KeyboardError::RequestInFlight));
    assert_eq!(client.calls(), 1);

    release.send("sunny".to_string()).unwrap();
    assert!(m.wait_overlay(Duration::from_secs(5)));
    assert!(!m.overlay().is_busy());

    // Resolved: a new request is allowed again.
    m.submit_query().unwrap();
    wait_for_calls(&client, 2);
    assert_eq!(client.calls(), 2);
    release.send("rainy".to_string()).unwrap();
    assert!(m.wait_overlay(Duration::from_secs(5)));
}

#[test]
fn test_accept_copies_answer_to_clipboard() {
    let (client, release) = GatedClient::new();
    let mut m = machine_with(client);
    m.open_overlay(OverlayKind::AiQuery, "hi");
    m.submit_query().unwrap();
    release.send("你好".to_string()).unwrap();
    assert!(m.wait_overlay(Duration::from_secs(5)));

    assert_eq!(m.accept_overlay_answer(), Some("你好".to_string()));
    assert!(m.sink().calls().is_empty());
    assert!(!m.overlay().is_active());

    let clipboard = m.clipboard().unwrap();
    assert_eq!(clipboard.all_entries()[0].content, "你好");

    // The clipboard history is shown; picking the answer inserts it.
    assert_eq!(m.current_mode(), InputMode::Predicting);
    assert_eq!(m.candidates().get(0).unwrap().text, "你好");
    m.select_candidate(0).unwrap();
    assert_eq!(m.sink().commits(), vec!["你好"]);
    assert_eq!(m.current_mode(), InputMode::Idle);
}

#[test]
fn test_keys_go_to_overlay_not_host() {
    let (client, _release) = GatedClient::new();
    let mut m = machine_with(client);
    m.open_overlay(OverlayKind::AiQuery, "");
    type_str(&mut m, "ab");
    m.process_key(&KeyEvent::soft_code(keycode::DEL));
    m.process_key(&KeyEvent::soft_code(keycode::ENTER));
    assert_eq!(m.overlay().text(), "a");
    assert!(m.sink().calls().is_empty());

    m.process_key(&KeyEvent::soft_code(keycode::BACK));
    assert!(!m.overlay().is_active());
    assert!(m.sink().calls().is_empty());
}

#[test]
fn test_focus_loss_cancels_query() {
    let (client, release) = GatedClient::new();
    let mut m = machine_with(client.clone());
    m.open_overlay(OverlayKind::AiQuery, "q");
    m.submit_query().unwrap();
    wait_for_calls(&client, 1);

    m.on_window_hidden();
    assert!(!m.overlay().is_active());
    assert!(!m.overlay().is_busy());

    release.send("late".to_string()).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    m.poll_overlay();
    assert_eq!(m.overlay().answer(), None);
    assert_eq!(m.accept_overlay_answer(), None);
    assert!(m.sink().commits().is_empty());
}

#[test]
fn test_long_press_clear_in_overlay_clears_prompt() {
    let (client, _release) = GatedClient::new();
    let mut m = machine_with(client);
    m.open_overlay(OverlayKind::PhraseCapture, "draft");
    m.handle_long_press(softkey_core::LongPressAction::Clear);
    assert_eq!(m.overlay().text(), "");
    assert!(m.sink().calls().is_empty());
}

#[test]
fn test_phrase_capture_normalises() {
    let (client, _release) = GatedClient::new();
    let mut m = machine_with(client);
    m.open_overlay(OverlayKind::PhraseCapture, "");
    m.process_key(&KeyEvent::soft_char('e'));
    m.process_key(&KeyEvent::soft_char('\u{301}'));
    m.process_key(&KeyEvent::soft_code(keycode::SPACE));
    m.process_key(&KeyEvent::soft_code(keycode::ENTER));

    let store = m.phrase_store().unwrap();
    let contents: Vec<String> = store.all_entries().into_iter().map(|e| e.content).collect();
    assert_eq!(contents, vec!["é".to_string()]);
}
