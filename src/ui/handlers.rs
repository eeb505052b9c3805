use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{Action, AppState, InputMode};

pub fn handle_key_event(app_state: &mut AppState, key: KeyEvent) {
    if app_state.pending_action.is_some() {
        return;
    }

    match app_state.input_mode {
        InputMode::Normal => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                handle_ctrl_key(app_state, key.code);
            } else {
                handle_normal_mode(app_state, key.code);
            }
        }
        InputMode::EditingPath => handle_editing_mode(app_state, key),
        InputMode::Command => handle_command_mode(app_state, key.code),
        InputMode::Browse => handle_browse_mode(app_state, key.code),
        InputMode::Help => handle_help_mode(app_state, key.code),
    }
}

fn handle_ctrl_key(app_state: &mut AppState, key_code: KeyCode) {
    match key_code {
        KeyCode::Char('c') => app_state.exit(),
        KeyCode::Char('l') => app_state.clear_all(),
        _ => {}
    }
}

fn handle_command_mode(app_state: &mut AppState, key_code: KeyCode) {
    match key_code {
        KeyCode::Enter => app_state.execute_command(),
        KeyCode::Esc => app_state.cancel_input(),
        KeyCode::Backspace => app_state.delete_char_from_input(),
        KeyCode::Char(c) => app_state.add_char_to_input(c),
        _ => {}
    }
}

fn handle_normal_mode(app_state: &mut AppState, key_code: KeyCode) {
    let page = app_state.log_visible_lines.max(1) as isize;

    match key_code {
        KeyCode::Char('b') => app_state.start_browsing(),
        KeyCode::Char('e') | KeyCode::Enter => app_state.start_path_editing(),
        KeyCode::Char('c') => app_state.queue_action(Action::Convert),
        KeyCode::Char('p') => app_state.queue_action(Action::GeneratePivot),
        KeyCode::Char('t') => app_state.queue_action(Action::CheckEndTest),
        KeyCode::Char('w') => app_state.queue_action(Action::GenerateWafermap),
        KeyCode::Left | KeyCode::Char('h') => app_state.controller.cycle_filter(false),
        KeyCode::Right | KeyCode::Char('l') => app_state.controller.cycle_filter(true),
        KeyCode::Char('j') | KeyCode::Down => app_state.scroll_log(1),
        KeyCode::Char('k') | KeyCode::Up => app_state.scroll_log(-1),
        KeyCode::PageDown => app_state.scroll_log(page),
        KeyCode::PageUp => app_state.scroll_log(-page),
        KeyCode::Char('G') | KeyCode::End => app_state.follow_log = true,
        KeyCode::Char('x') => app_state.clear_all(),
        KeyCode::Char('q') => app_state.exit(),
        KeyCode::Char(':') => app_state.start_command_mode(),
        KeyCode::Char('?') => app_state.show_help(),
        _ => {}
    }
}

fn handle_editing_mode(app_state: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app_state.confirm_path_edit(),
        KeyCode::Esc => app_state.cancel_input(),
        _ => {
            app_state.text_area.input(key);
        }
    }
}

fn handle_browse_mode(app_state: &mut AppState, key_code: KeyCode) {
    match key_code {
        KeyCode::Enter => app_state.browse_enter(),
        KeyCode::Esc | KeyCode::Char('q') => app_state.input_mode = InputMode::Normal,
        KeyCode::Backspace | KeyCode::Char('h') => app_state.browser.parent(),
        KeyCode::Char('j') | KeyCode::Down => app_state.browser.move_selection(1),
        KeyCode::Char('k') | KeyCode::Up => app_state.browser.move_selection(-1),
        KeyCode::Home => app_state.browser.selected = 0,
        KeyCode::End => {
            app_state.browser.move_selection(isize::MAX);
        }
        _ => {}
    }
}

fn handle_help_mode(app_state: &mut AppState, key_code: KeyCode) {
    let line_count = app_state.help_text.lines().count();

    let visible_lines = app_state.help_visible_lines;

    let max_scroll = line_count.saturating_sub(visible_lines);

    match key_code {
        KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q') => {
            app_state.input_mode = InputMode::Normal;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app_state.help_scroll = (app_state.help_scroll + 1).min(max_scroll);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app_state.help_scroll = app_state.help_scroll.saturating_sub(1);
        }
        KeyCode::Home => {
            app_state.help_scroll = 0;
        }
        KeyCode::End => {
            app_state.help_scroll = max_scroll;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn press(app: &mut AppState, code: KeyCode) {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn keys_are_ignored_while_an_action_is_pending() {
        let mut app = AppState::new(Settings::default(), None);
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.pending_action, Some(Action::Convert));

        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit);

        app.run_pending_action();
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn command_mode_round_trip() {
        let mut app = AppState::new(Settings::default(), None);
        press(&mut app, KeyCode::Char(':'));
        for c in "help".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.input_mode, InputMode::Help));

        press(&mut app, KeyCode::Esc);
        assert!(matches!(app.input_mode, InputMode::Normal));
    }
}
