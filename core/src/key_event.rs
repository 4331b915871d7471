//! Raw key events as delivered by the host.
//!
//! A `KeyEvent` is created once per physical or virtual key press and consumed
//! synchronously by the state machine. Key codes use the Android numbering so
//! events coming from a platform bridge can be passed through unchanged.

use crate::error::KeyboardError;

/// Key codes understood by the classifier.
pub mod keycode {
    pub const UNKNOWN: i32 = 0;
    pub const BACK: i32 = 4;
    pub const NUM_0: i32 = 7;
    pub const NUM_9: i32 = 16;
    pub const DPAD_LEFT: i32 = 21;
    pub const DPAD_RIGHT: i32 = 22;
    pub const DPAD_CENTER: i32 = 23;
    pub const CLEAR: i32 = 28;
    pub const A: i32 = 29;
    pub const Z: i32 = 54;
    pub const SPACE: i32 = 62;
    pub const ENTER: i32 = 66;
    pub const DEL: i32 = 67;
    pub const SEMICOLON: i32 = 74;
    pub const APOSTROPHE: i32 = 75;
}

/// Bit set of event flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct KeyFlags(u32);

impl KeyFlags {
    pub const NONE: KeyFlags = KeyFlags(0);
    /// The event was synthesised by the soft keyboard rather than a device.
    pub const SOFT_KEYBOARD: KeyFlags = KeyFlags(0x2);
    pub const KEEP_TOUCH_MODE: KeyFlags = KeyFlags(0x4);

    pub const fn from_bits(bits: u32) -> Self {
        KeyFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: KeyFlags) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub const fn union(self, other: KeyFlags) -> KeyFlags {
        KeyFlags(self.0 | other.0)
    }
}

impl std::ops::BitOr for KeyFlags {
    type Output = KeyFlags;

    fn bitor(self, rhs: KeyFlags) -> KeyFlags {
        self.union(rhs)
    }
}

/// Where the event originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeySource {
    /// Hardware keyboard or a key event injected by the host.
    #[default]
    Keyboard,
    /// A touch on one of the soft keyboard's keys.
    Touch,
}

/// A single key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: i32,
    pub unicode_char: Option<char>,
    pub flags: KeyFlags,
    pub source: KeySource,
}

impl KeyEvent {
    pub fn new(code: i32, unicode_char: Option<char>, flags: KeyFlags, source: KeySource) -> Self {
        Self {
            code,
            unicode_char,
            flags,
            source,
        }
    }

    /// A key identified only by its code (function keys).
    pub fn code(code: i32) -> Self {
        Self::new(code, None, KeyFlags::NONE, KeySource::Keyboard)
    }

    /// A key press on the soft keyboard producing `ch`.
    ///
    /// Letters and digits carry their Android key code, everything else is
    /// delivered with code 0 the way label keys are.
    pub fn soft_char(ch: char) -> Self {
        let code = match ch {
            'a'..='z' => keycode::A + (ch as i32 - 'a' as i32),
            'A'..='Z' => keycode::A + (ch as i32 - 'A' as i32),
            '0'..='9' => keycode::NUM_0 + (ch as i32 - '0' as i32),
            '\'' => keycode::APOSTROPHE,
            ';' => keycode::SEMICOLON,
            _ => keycode::UNKNOWN,
        };
        Self::new(code, Some(ch), KeyFlags::SOFT_KEYBOARD, KeySource::Touch)
    }

    /// A function key pressed on the soft keyboard.
    pub fn soft_code(code: i32) -> Self {
        Self::new(code, None, KeyFlags::SOFT_KEYBOARD, KeySource::Touch)
    }

    /// Build an event from the raw values a platform bridge hands over.
    ///
    /// `unicode` is the raw code point, 0 meaning "no character".
    pub fn try_from_raw(
        code: i32,
        unicode: u32,
        flags: u32,
        source: KeySource,
    ) -> Result<Self, KeyboardError> {
        if code < 0 {
            return Err(KeyboardError::MalformedKeyEvent { code, unicode });
        }
        let unicode_char = match unicode {
            0 => None,
            cp => Some(char::from_u32(cp).ok_or(KeyboardError::MalformedKeyEvent { code, unicode })?),
        };
        Ok(Self::new(code, unicode_char, KeyFlags::from_bits(flags), source))
    }

    /// Like [`KeyEvent::try_from_raw`] but never fails: garbage becomes an
    /// event the classifier maps to `NoOp`.
    pub fn from_raw(code: i32, unicode: u32, flags: u32, source: KeySource) -> Self {
        Self::try_from_raw(code, unicode, flags, source).unwrap_or_else(|err| {
            tracing::debug!(%err, "dropping malformed key event");
            Self::new(keycode::UNKNOWN, None, KeyFlags::from_bits(flags), source)
        })
    }

    pub fn is_soft(&self) -> bool {
        self.flags.contains(KeyFlags::SOFT_KEYBOARD)
    }
}
