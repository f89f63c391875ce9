use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What a key press asks the chat loop to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    Submit,
    InsertChar(char),
    Backspace,
    ClearInput,
    NextTab,
    NewConversation,
    PreviousConversation,
    NextConversation,
    CycleModel,
    TemperatureDown,
    TemperatureUp,
    CancelTurn,
    Quit,
}

pub fn map_key(key: KeyEvent) -> Option<UiAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let action = match key.code {
        KeyCode::Char('c') if ctrl => UiAction::Quit,
        KeyCode::Char('n') if ctrl => UiAction::NewConversation,
        KeyCode::Char('u') if ctrl => UiAction::ClearInput,
        KeyCode::Char(_) if ctrl => return None,
        KeyCode::Char(c) => UiAction::InsertChar(c),
        KeyCode::Enter => UiAction::Submit,
        KeyCode::Backspace => UiAction::Backspace,
        KeyCode::Tab => UiAction::NextTab,
        KeyCode::PageUp => UiAction::PreviousConversation,
        KeyCode::PageDown => UiAction::NextConversation,
        KeyCode::F(2) => UiAction::CycleModel,
        KeyCode::F(3) => UiAction::TemperatureDown,
        KeyCode::F(4) => UiAction::TemperatureUp,
        KeyCode::Esc => UiAction::CancelTurn,
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn control_chords_map_to_commands() {
        assert_eq!(
            map_key(press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(UiAction::Quit)
        );
        assert_eq!(
            map_key(press(KeyCode::Char('n'), KeyModifiers::CONTROL)),
            Some(UiAction::NewConversation)
        );
        assert_eq!(map_key(press(KeyCode::Char('x'), KeyModifiers::CONTROL)), None);
    }

    #[test]
    fn plain_and_shifted_characters_are_typed() {
        assert_eq!(
            map_key(press(KeyCode::Char('n'), KeyModifiers::NONE)),
            Some(UiAction::InsertChar('n'))
        );
        assert_eq!(
            map_key(press(KeyCode::Char('N'), KeyModifiers::SHIFT)),
            Some(UiAction::InsertChar('N'))
        );
    }

    #[test]
    fn function_keys_adjust_settings() {
        assert_eq!(
            map_key(press(KeyCode::F(2), KeyModifiers::NONE)),
            Some(UiAction::CycleModel)
        );
        assert_eq!(
            map_key(press(KeyCode::F(4), KeyModifiers::NONE)),
            Some(UiAction::TemperatureUp)
        );
        assert_eq!(map_key(press(KeyCode::F(9), KeyModifiers::NONE)), None);
    }

    #[test]
    fn key_releases_are_ignored() {
        let mut release = press(KeyCode::Enter, KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(map_key(release), None);
    }
}
