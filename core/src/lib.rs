//! softkey-core
//!
//! Input-event core of a soft keyboard: turns key and touch events into text
//! committed to a host field, tracks the composing string, ranks candidates
//! and runs the Idle / Composing / Predicting state machine.
//!
//! Public API:
//! - `InputStateMachine` - routes key events and decides every commit
//! - `KeyClassifier` - maps raw `KeyEvent`s to `KeyCategory`s
//! - `ComposingBuffer` / `CandidateList` - session state
//! - `DecodingEngine` - pluggable decoder, with the `TableEngine` reference
//! - `TextSink`, `EntrySource`, `PhraseStore`, `AiClient` - host contracts
//! - `OverlayPromptController` - phrase capture and AI query prompts
//! - `Config` - keyboard preferences
use serde::{Deserialize, Serialize};

pub mod key_event;
pub use key_event::{keycode, KeyEvent, KeyFlags, KeySource};

pub mod classifier;
pub use classifier::{classify, KeyCategory, KeyClassifier};

pub mod candidate;
pub use candidate::{Candidate, CandidateList, CandidateTag, Direction, CLIP_GLYPH};

pub mod composing;
pub use composing::{ComposingBuffer, DeleteOutcome};

pub mod error;
pub use error::KeyboardError;

pub mod engine;
pub use engine::{Choice, DecodingEngine, EngineError, TableEngine};

pub mod context;
pub use context::{EditorAction, InputField, InputPurpose, KeyboardContext, KeyboardKind, Language};

pub mod host;
pub use host::{
    AiClient, Clipboard, Entry, EntrySource, MemoryClipboard, MemoryEntries, NetworkError,
    PhraseStore, RecordingSink, SinkCall, TextSink,
};

pub mod session;
pub use session::{ImeSession, InputMode};

pub mod symbols;

pub mod calc;

pub mod long_press;
pub use long_press::LongPressAction;

pub mod overlay;
pub use overlay::{OverlayEvent, OverlayKind, OverlayPromptController, OverlayState};

pub mod machine;
pub use machine::{InputStateMachine, KeyResult};

/// Keyboard preferences read by the state machine.
///
/// Missing keys in a TOML file fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Insert the closing partner after an opening symbol
    pub symbol_pair_input: bool,
    /// Add a space after an English word chosen from the candidates
    pub auto_space: bool,
    /// Compose English through the engine instead of committing letters
    pub english_cell_search: bool,
    /// Show associative candidates after Chinese commits
    pub chinese_prediction: bool,
    /// Offer a fresh clipboard item when a field gains focus
    pub clipboard_suggestion: bool,
    /// Clipboard items older than this are not offered
    pub clipboard_item_timeout_secs: u64,
    /// Maximum candidates shown; 0 means unlimited
    pub max_candidates: usize,
    /// Characters before the cursor used as prediction context
    pub prediction_context_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbol_pair_input: true,
            auto_space: true,
            english_cell_search: false,
            chinese_prediction: true,
            clipboard_suggestion: true,
            clipboard_item_timeout_secs: 60,
            max_candidates: 50,
            prediction_context_chars: 4,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults when
    /// the file is missing or invalid.
    pub fn load_or_default<P: AsRef<std::path::Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load_toml(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "using default config");
                Self::default()
            }
        }
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Utility helpers.
pub mod utils {
    /// Normalize input strings (NFC) and trim whitespace.
    pub fn normalize(s: &str) -> String {
        use unicode_normalization::UnicodeNormalization;
        s.nfc().collect::<String>().trim().to_string()
    }

    /// A non-empty run of ASCII letters.
    pub fn is_english_word(s: &str) -> bool {
        !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic())
    }

    /// CJK unified ideograph (including extension A and compatibility).
    pub fn is_cjk(c: char) -> bool {
        matches!(
            c,
            '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}'
        )
    }

    pub fn ends_with_cjk(s: &str) -> bool {
        s.chars().last().is_some_and(is_cjk)
    }

    /// The last `n` characters of `s`.
    pub fn tail_chars(s: &str, n: usize) -> String {
        let count = s.chars().count();
        s.chars().skip(count.saturating_sub(n)).collect()
    }
}
