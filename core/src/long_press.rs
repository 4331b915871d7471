//! Long-press actions.
//!
//! A long press resolves to one `LongPressAction`, dispatched once per
//! gesture by [`InputStateMachine::handle_long_press`](crate::machine::InputStateMachine::handle_long_press).

/// Maximum characters saved by a long-press Clear.
pub const CLEAR_SAVE_LIMIT: usize = 1000;

/// What a long-pressed key does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LongPressAction {
    /// Commit the key's secondary text.
    Text(String),
    /// Show the system input method picker.
    SwitchIme,
    /// Toggle English cell search.
    EnglishCell,
    /// Delete everything before the cursor, saving it for Revert.
    Clear,
    /// Re-commit text removed by the last Clear.
    Revert,
    /// Insert a newline.
    Enter,
    None,
}

impl LongPressAction {
    /// Parse a key's long-press label ("switch_ime", "clear", ...); any other
    /// non-empty label is committed as text.
    pub fn from_label(label: &str) -> Self {
        match label {
            "" => Self::None,
            "switch_ime" => Self::SwitchIme,
            "english_cell" => Self::EnglishCell,
            "clear" => Self::Clear,
            "revert" => Self::Revert,
            "enter" => Self::Enter,
            text => Self::Text(text.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label() {
        assert_eq!(LongPressAction::from_label(""), LongPressAction::None);
        assert_eq!(LongPressAction::from_label("clear"), LongPressAction::Clear);
        assert_eq!(LongPressAction::from_label("switch_ime"), LongPressAction::SwitchIme);
        assert_eq!(
            LongPressAction::from_label("@"),
            LongPressAction::Text("@".to_string())
        );
    }
}
