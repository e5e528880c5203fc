//! Key and mouse bindings.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

/// Action from a key press or click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Drop the held block, or start over once the run has ended.
    Primary,
    Restart,
    Pause,
    Quit,
    None,
}

/// Map key event to game action.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p' | 'P') => Action::Pause,
        KeyCode::Char('r' | 'R') => Action::Restart,
        KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Down | KeyCode::Char('j') => Action::Primary,
        _ => Action::None,
    }
}

/// Left click anywhere acts like the primary key.
pub fn mouse_to_action(mouse: MouseEvent) -> Action {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => Action::Primary,
        _ => Action::None,
    }
}
