//! Keyboard context passed explicitly to the state machine.
//!
//! `KeyboardContext` holds what the host told us about the focused field and
//! which keyboard is showing. There is no global manager: the machine owns one
//! context and callers update it through the machine.

/// Layout masks accepted by [`KeyboardKind::from_layout`].
pub mod layout {
    pub const T9: u32 = 0x1000;
    pub const QWERTY_PINYIN: u32 = 0x2000;
    pub const QWERTY_ABC: u32 = 0x3000;
    pub const HANDWRITING: u32 = 0x4000;
    pub const NUMBER: u32 = 0x5000;
    pub const LX17: u32 = 0x6000;
    pub const CLIPBOARD: u32 = 0x7000;
}

/// Keyboard variants the host can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyboardKind {
    #[default]
    T9,
    Qwerty,
    Lx17,
    QwertyAbc,
    Number,
    Symbol,
    Handwriting,
    Candidates,
    Settings,
    Clipboard,
}

impl KeyboardKind {
    /// Map a layout mask to a keyboard. Unknown masks fall back to T9.
    pub fn from_layout(mask: u32) -> Self {
        match mask {
            layout::QWERTY_PINYIN => Self::Qwerty,
            layout::QWERTY_ABC => Self::QwertyAbc,
            layout::HANDWRITING => Self::Handwriting,
            layout::NUMBER => Self::Number,
            layout::LX17 => Self::Lx17,
            layout::CLIPBOARD => Self::Clipboard,
            _ => Self::T9,
        }
    }

    /// Language typed on this keyboard.
    pub fn language(self) -> Language {
        match self {
            Self::QwertyAbc => Language::English,
            Self::Number | Self::Symbol => Language::Symbols,
            _ => Language::Chinese,
        }
    }

    /// Keyboards whose keys never start a composition.
    pub fn is_direct(self) -> bool {
        matches!(self, Self::Number | Self::Symbol)
    }
}

/// Sub-mode language of the active keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Chinese,
    English,
    Symbols,
}

/// Input purpose hint for context-aware input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputPurpose {
    #[default]
    FreeForm,
    Email,
    Url,
    /// Password (no composition, no suggestions)
    Password,
    Number,
    Phone,
}

impl InputPurpose {
    /// Fields where Delete is passed through as a plain function key.
    pub fn restricts_delete(self) -> bool {
        matches!(self, Self::Password | Self::Number | Self::Phone)
    }
}

/// Editor action attached to the field's Enter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorAction {
    #[default]
    Unspecified,
    None,
    Go,
    Search,
    Send,
    Next,
    Done,
    Previous,
}

/// What the host reported about the focused text field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InputField {
    pub purpose: InputPurpose,
    pub action: EditorAction,
    /// The field has no input class (raw key events only).
    pub null_input_type: bool,
    /// The field asked for Enter to insert a newline instead of an action.
    pub no_enter_action: bool,
}

impl InputField {
    pub fn new(purpose: InputPurpose) -> Self {
        Self {
            purpose,
            ..Self::default()
        }
    }

    pub fn with_action(mut self, action: EditorAction) -> Self {
        self.action = action;
        self
    }

    /// The editor action Enter should perform, if any.
    pub fn enter_action(&self) -> Option<EditorAction> {
        if self.null_input_type || self.no_enter_action {
            return None;
        }
        match self.action {
            EditorAction::Unspecified | EditorAction::None => None,
            action => Some(action),
        }
    }
}

/// Field and keyboard state shared by the key path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardContext {
    pub field: InputField,
    pub keyboard: KeyboardKind,
    /// Whether the keyboard window is currently showing.
    pub shown: bool,
    /// English letters are committed lower-case.
    pub lower_case: bool,
}

impl Default for KeyboardContext {
    fn default() -> Self {
        Self {
            field: InputField::default(),
            keyboard: KeyboardKind::default(),
            shown: true,
            lower_case: true,
        }
    }
}

impl KeyboardContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn language(&self) -> Language {
        self.keyboard.language()
    }

    pub fn is_password(&self) -> bool {
        self.field.purpose == InputPurpose::Password
    }

    /// Delete is restricted in password fields and on the number keyboard.
    pub fn restricts_delete(&self) -> bool {
        self.field.purpose.restricts_delete() || self.keyboard == KeyboardKind::Number
    }
}
