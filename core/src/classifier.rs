//! Mapping raw key events to the categories the state machine routes on.

use crate::candidate::Direction;
use crate::key_event::{keycode, KeyEvent};

/// What a key press means to the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCategory {
    Back,
    DPadCenterOrSpace,
    Clear,
    Enter,
    DPadLeftRight(Direction),
    Delete,
    /// Letters, digits, apostrophe and semicolon: the keys that can compose.
    PrintableLatin(char),
    /// Any other key with a non-zero code.
    OtherFunctionKey(i32),
    /// A character with no key code (symbol and emoji keys).
    PrintableOther(char),
    NoOp,
}

impl KeyCategory {
    pub fn is_function_key(&self) -> bool {
        !matches!(
            self,
            KeyCategory::PrintableLatin(_) | KeyCategory::PrintableOther(_) | KeyCategory::NoOp
        )
    }
}

/// Classifies key events for the current input field.
///
/// Delete inside a password field or on the number keyboard edits the host
/// directly, so it is reported as an ordinary function key there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyClassifier {
    restricted_delete: bool,
}

impl KeyClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_restricted_delete(restricted_delete: bool) -> Self {
        Self { restricted_delete }
    }

    pub fn classify(&self, event: &KeyEvent) -> KeyCategory {
        let code = event.code;
        match code {
            keycode::BACK => return KeyCategory::Back,
            keycode::DPAD_CENTER | keycode::SPACE => return KeyCategory::DPadCenterOrSpace,
            keycode::CLEAR => return KeyCategory::Clear,
            keycode::ENTER => return KeyCategory::Enter,
            keycode::DPAD_LEFT => return KeyCategory::DPadLeftRight(Direction::Left),
            keycode::DPAD_RIGHT => return KeyCategory::DPadLeftRight(Direction::Right),
            keycode::DEL if !self.restricted_delete => return KeyCategory::Delete,
            _ => {}
        }

        if let Some(ch) = event.unicode_char {
            if ch.is_ascii_alphanumeric() {
                return KeyCategory::PrintableLatin(ch);
            }
        }
        match code {
            keycode::APOSTROPHE => return KeyCategory::PrintableLatin('\''),
            keycode::SEMICOLON => return KeyCategory::PrintableLatin(';'),
            _ => {}
        }

        if code > 0 {
            return KeyCategory::OtherFunctionKey(code);
        }
        match event.unicode_char {
            Some(ch) if ch != '\0' => KeyCategory::PrintableOther(ch),
            _ => KeyCategory::NoOp,
        }
    }
}

/// Classify with an unrestricted field.
pub fn classify(event: &KeyEvent) -> KeyCategory {
    KeyClassifier::new().classify(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_event::{KeyFlags, KeySource};

    #[test]
    fn test_function_keys() {
        assert_eq!(classify(&KeyEvent::code(keycode::BACK)), KeyCategory::Back);
        assert_eq!(classify(&KeyEvent::code(keycode::SPACE)), KeyCategory::DPadCenterOrSpace);
        assert_eq!(classify(&KeyEvent::code(keycode::DPAD_CENTER)), KeyCategory::DPadCenterOrSpace);
        assert_eq!(classify(&KeyEvent::code(keycode::CLEAR)), KeyCategory::Clear);
        assert_eq!(classify(&KeyEvent::code(keycode::ENTER)), KeyCategory::Enter);
        assert_eq!(
            classify(&KeyEvent::code(keycode::DPAD_LEFT)),
            KeyCategory::DPadLeftRight(Direction::Left)
        );
        assert_eq!(classify(&KeyEvent::code(keycode::DEL)), KeyCategory::Delete);
    }

    #[test]
    fn test_space_with_char_is_still_space() {
        let ev = KeyEvent::new(keycode::SPACE, Some(' '), KeyFlags::NONE, KeySource::Keyboard);
        assert_eq!(classify(&ev), KeyCategory::DPadCenterOrSpace);
    }

    #[test]
    fn test_printable_latin() {
        assert_eq!(classify(&KeyEvent::soft_char('n')), KeyCategory::PrintableLatin('n'));
        assert_eq!(classify(&KeyEvent::soft_char('Q')), KeyCategory::PrintableLatin('Q'));
        assert_eq!(classify(&KeyEvent::soft_char('7')), KeyCategory::PrintableLatin('7'));
        assert_eq!(classify(&KeyEvent::soft_char('\'')), KeyCategory::PrintableLatin('\''));
        assert_eq!(classify(&KeyEvent::code(keycode::SEMICOLON)), KeyCategory::PrintableLatin(';'));
    }

    #[test]
    fn test_other_function_key_and_printable_other() {
        // Tab
        assert_eq!(classify(&KeyEvent::code(61)), KeyCategory::OtherFunctionKey(61));
        assert_eq!(classify(&KeyEvent::soft_char('(')), KeyCategory::PrintableOther('('));
        assert_eq!(classify(&KeyEvent::soft_char('😀')), KeyCategory::PrintableOther('😀'));
    }

    #[test]
    fn test_unknown_is_noop() {
        assert_eq!(classify(&KeyEvent::code(0)), KeyCategory::NoOp);
        assert_eq!(classify(&KeyEvent::code(-1)), KeyCategory::NoOp);
    }

    #[test]
    fn test_restricted_delete() {
        let classifier = KeyClassifier::with_restricted_delete(true);
        assert_eq!(
            classifier.classify(&KeyEvent::code(keycode::DEL)),
            KeyCategory::OtherFunctionKey(keycode::DEL)
        );
        // Higher-priority keys are unaffected.
        assert_eq!(classifier.classify(&KeyEvent::code(keycode::ENTER)), KeyCategory::Enter);
    }
}
