use crossterm::event::{KeyEvent, MouseEvent, MouseEventKind};

use crate::keymap::{KeyBinding, Keymap};

/// Input action that can be performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    TogglePlayback,
    SpeedUp,
    SpeedDown,
    ResetPosition,
    FontLarger,
    FontSmaller,
    // Manual scrolling; always counts as a user scroll
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    None,
}

/// Handle a key event and return the corresponding action
pub fn handle_key_event(key: KeyEvent, keymap: &Keymap) -> Action {
    keymap
        .get(&KeyBinding::from_event(&key))
        .copied()
        .unwrap_or(Action::None)
}

/// Mouse wheel scrolls the script by hand
pub fn handle_mouse_event(mouse: MouseEvent) -> Action {
    match mouse.kind {
        MouseEventKind::ScrollDown => Action::ScrollDown,
        MouseEventKind::ScrollUp => Action::ScrollUp,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    #[test]
    fn test_unbound_key_is_none() {
        let keymap = Keymap::default();
        let key = KeyEvent::new(KeyCode::Char('z'), KeyModifiers::NONE);
        assert_eq!(handle_key_event(key, &keymap), Action::None);
    }

    #[test]
    fn test_default_keys() {
        let keymap = Keymap::default();
        let press = |code| handle_key_event(KeyEvent::new(code, KeyModifiers::NONE), &keymap);
        assert_eq!(press(KeyCode::Char(' ')), Action::TogglePlayback);
        assert_eq!(press(KeyCode::Down), Action::SpeedDown);
        assert_eq!(press(KeyCode::Char('j')), Action::ScrollDown);
        assert_eq!(press(KeyCode::Char('-')), Action::FontSmaller);
        assert_eq!(press(KeyCode::PageDown), Action::PageDown);
    }

    #[test]
    fn test_mouse_wheel() {
        let wheel = MouseEvent {
            kind: MouseEventKind::ScrollDown,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        };
        assert_eq!(handle_mouse_event(wheel), Action::ScrollDown);
    }
}
