//! Keybinding dispatcher for shipcheck.
//!
//! Translates raw crossterm `KeyEvent`s into `AppState` mutations. Anything that
//! needs the session controller or a background task is returned as a
//! `KeyAction` for the event loop to carry out. The dispatcher branches first
//! on `state.mode` so each mode has an isolated handler.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{AppState, Focus, Mode};

/// What the event loop should do after a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    Quit,
    /// Start an analysis from the current form.
    Start,
    /// Submit the answers of the current round.
    Submit,
    /// Return the session to idle.
    Reset,
    /// Verify the token and list repositories.
    Connect,
    /// Load recent assessments and open the history overlay.
    ShowHistory,
}

/// Dispatches a key event to the handler matching the current mode.
pub fn handle_key(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match state.mode {
        Mode::HelpOverlay => handle_help(key, state),
        Mode::HistoryOverlay => handle_history(key, state),
        Mode::Editing => handle_editing(key, state),
        Mode::Normal => handle_normal(key, state),
    }
}

// ---------------------------------------------------------------------------
// Normal mode
// ---------------------------------------------------------------------------

fn handle_normal(key: KeyEvent, state: &mut AppState) -> KeyAction {
    let in_list = state.focus == Focus::RepositoryList;

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return KeyAction::Quit;
        }
        KeyCode::Tab => state.focus_next(),
        KeyCode::BackTab => state.focus_prev(),

        KeyCode::Char('j') | KeyCode::Down if in_list => state.browser.move_cursor(1),
        KeyCode::Char('k') | KeyCode::Up if in_list => state.browser.move_cursor(-1),
        KeyCode::Char('j') | KeyCode::Down => state.focus_next(),
        KeyCode::Char('k') | KeyCode::Up => state.focus_prev(),

        KeyCode::Enter if in_list => {
            state.browser.select_at_cursor();
        }
        KeyCode::Char('i') | KeyCode::Enter if state.focus.is_editable() => {
            state.mode = Mode::Editing;
        }

        // Repository source
        KeyCode::Char('p') => state.toggle_private(),
        KeyCode::Char('c') if state.private => return KeyAction::Connect,
        KeyCode::Char('D') if state.private => {
            state.browser.disconnect();
            state.search.clear();
        }

        // Environment form
        KeyCode::Char('n') => state.add_custom_row(),
        KeyCode::Char('x') => {
            state.remove_focused_custom_row();
        }
        KeyCode::Char('X') => state.clear_environment(),

        // Session
        KeyCode::Char('s') => return KeyAction::Start,
        KeyCode::Char('a') => return KeyAction::Submit,
        KeyCode::Char('r') => return KeyAction::Reset,

        // Overlays
        KeyCode::Char('?') => {
            state.help_scroll = 0;
            state.mode = Mode::HelpOverlay;
        }
        KeyCode::Char('h') => return KeyAction::ShowHistory,

        KeyCode::Char('q') => return KeyAction::Quit,

        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Editing mode
// ---------------------------------------------------------------------------

/// Routes text keys to the focused field.
///
/// Esc leaves edit mode. Enter leaves it too, except in multi-line fields where
/// it inserts a newline; leaving the token field with Enter also connects. Tab
/// leaves edit mode and moves focus on.
fn handle_editing(key: KeyEvent, state: &mut AppState) -> KeyAction {
    let focus = state.focus;
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if !focus.is_editable() {
        state.mode = Mode::Normal;
        return KeyAction::Continue;
    }

    match key.code {
        KeyCode::Esc => {
            state.mode = Mode::Normal;
            return KeyAction::Continue;
        }
        KeyCode::Tab | KeyCode::BackTab => {
            state.mode = Mode::Normal;
            if key.code == KeyCode::Tab {
                state.focus_next();
            } else {
                state.focus_prev();
            }
            return KeyAction::Continue;
        }
        KeyCode::Enter if !focus.is_multiline() => {
            state.mode = Mode::Normal;
            if focus == Focus::Token {
                return KeyAction::Connect;
            }
            return KeyAction::Continue;
        }
        _ => {}
    }

    if let Some(field) = state.focused_field_mut() {
        match key.code {
            KeyCode::Enter => field.insert('\n'),
            KeyCode::Char('u') if ctrl => field.clear(),
            KeyCode::Char(c) if !ctrl => field.insert(c),
            KeyCode::Backspace => field.backspace(),
            KeyCode::Delete => field.delete(),
            KeyCode::Left => field.left(),
            KeyCode::Right => field.right(),
            KeyCode::Home => field.home(),
            KeyCode::End => field.end(),
            _ => {}
        }
    }

    if focus == Focus::Search {
        state.apply_search();
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Overlays
// ---------------------------------------------------------------------------

fn handle_help(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            state.help_scroll = state.help_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            state.help_scroll = state.help_scroll.saturating_sub(1);
        }
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => state.mode = Mode::Normal,
        _ => {}
    }
    KeyAction::Continue
}

fn handle_history(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            let last = state.history.len().saturating_sub(1);
            state.history_cursor = (state.history_cursor + 1).min(last);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            state.history_cursor = state.history_cursor.saturating_sub(1);
        }
        KeyCode::Char('h') | KeyCode::Esc | KeyCode::Char('q') => state.mode = Mode::Normal,
        _ => {}
    }
    KeyAction::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(state: &mut AppState, text: &str) {
        for c in text.chars() {
            handle_key(press(KeyCode::Char(c)), state);
        }
    }

    #[test]
    fn editing_captures_command_letters() {
        let mut state = AppState::new(None);
        assert_eq!(handle_key(press(KeyCode::Enter), &mut state), KeyAction::Continue);
        assert_eq!(state.mode, Mode::Editing);

        type_text(&mut state, "https://github.com/acme/qs");
        assert_eq!(state.repository_url.value(), "https://github.com/acme/qs");

        handle_key(press(KeyCode::Esc), &mut state);
        assert_eq!(state.mode, Mode::Normal);
        assert_eq!(handle_key(press(KeyCode::Char('s')), &mut state), KeyAction::Start);
    }

    #[test]
    fn enter_in_token_field_connects() {
        let mut state = AppState::new(None);
        handle_key(press(KeyCode::Char('p')), &mut state);
        assert_eq!(state.focus, Focus::Token);

        handle_key(press(KeyCode::Char('i')), &mut state);
        type_text(&mut state, "ghp_x");
        assert_eq!(handle_key(press(KeyCode::Enter), &mut state), KeyAction::Connect);
        assert_eq!(state.mode, Mode::Normal);
    }

    #[test]
    fn blob_takes_newlines() {
        let mut state = AppState::new(None);
        state.focus = Focus::EnvBlob;
        handle_key(press(KeyCode::Char('i')), &mut state);
        type_text(&mut state, "A=1");
        handle_key(press(KeyCode::Enter), &mut state);
        type_text(&mut state, "B=2");
        assert_eq!(state.env_blob.value(), "A=1\nB=2");
        assert_eq!(state.mode, Mode::Editing);
    }

    #[test]
    fn connect_only_in_private_mode() {
        let mut state = AppState::new(None);
        assert_eq!(handle_key(press(KeyCode::Char('c')), &mut state), KeyAction::Continue);
        handle_key(press(KeyCode::Char('p')), &mut state);
        assert_eq!(handle_key(press(KeyCode::Char('c')), &mut state), KeyAction::Connect);
    }

    #[test]
    fn help_overlay_swallows_keys() {
        let mut state = AppState::new(None);
        handle_key(press(KeyCode::Char('?')), &mut state);
        assert_eq!(state.mode, Mode::HelpOverlay);
        assert_eq!(handle_key(press(KeyCode::Char('s')), &mut state), KeyAction::Continue);
        handle_key(press(KeyCode::Esc), &mut state);
        assert_eq!(state.mode, Mode::Normal);
    }
}
