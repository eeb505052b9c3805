use std::path::PathBuf;
use tui_textarea::TextArea;

use crate::app::FileBrowser;
use crate::config::Settings;
use crate::session::Controller;

pub enum InputMode {
    Normal,
    EditingPath,
    Command,
    Browse,
    Help,
}

/// A trigger waiting for the next frame. Only one can be queued; while it
/// waits the shell shows a working indicator and ignores keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Convert,
    GeneratePivot,
    CheckEndTest,
    GenerateWafermap,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::Convert => "Converting to Excel",
            Action::GeneratePivot => "Generating pivot table",
            Action::CheckEndTest => "Checking end test number",
            Action::GenerateWafermap => "Generating wafermap",
        }
    }
}

pub struct AppState<'a> {
    pub controller: Controller,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub text_area: TextArea<'a>,
    pub should_quit: bool,
    pub pending_action: Option<Action>,
    pub browser: FileBrowser,
    pub log_scroll: usize,
    pub log_visible_lines: usize,
    pub follow_log: bool,
    pub help_text: String,
    pub help_scroll: usize,
    pub help_visible_lines: usize,
}

impl AppState<'_> {
    pub fn new(settings: Settings, file_path: Option<PathBuf>) -> Self {
        let start_dir = file_path
            .as_ref()
            .and_then(|p| p.parent())
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        let mut controller = Controller::new(settings);
        if let Some(path) = file_path {
            controller.select_file(path);
        }

        Self {
            controller,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            text_area: TextArea::default(),
            should_quit: false,
            pending_action: None,
            browser: FileBrowser::new(start_dir),
            log_scroll: 0,
            log_visible_lines: 10,
            follow_log: true,
            help_text: String::new(),
            help_scroll: 0,
            help_visible_lines: 20,
        }
    }

    /// The path shown in the file field.
    pub fn path_text(&self) -> String {
        self.controller
            .selected_file()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }

    pub fn queue_action(&mut self, action: Action) {
        if self.pending_action.is_none() {
            self.pending_action = Some(action);
        }
    }

    /// Runs the queued action, if any. Returns whether one ran.
    pub fn run_pending_action(&mut self) -> bool {
        let Some(action) = self.pending_action.take() else {
            return false;
        };

        match action {
            Action::Convert => self.controller.convert(),
            Action::GeneratePivot => self.controller.generate_pivot(),
            Action::CheckEndTest => self.controller.check_end_test(),
            Action::GenerateWafermap => self.controller.generate_wafermap(),
        };
        self.follow_log = true;
        true
    }

    pub fn start_path_editing(&mut self) {
        let mut text_area = TextArea::new(vec![self.path_text()]);
        text_area.move_cursor(tui_textarea::CursorMove::End);
        self.text_area = text_area;
        self.input_mode = InputMode::EditingPath;
    }

    pub fn confirm_path_edit(&mut self) {
        let path = self.text_area.lines().join("").trim().to_string();
        self.controller.select_file(PathBuf::from(path));
        self.text_area = TextArea::default();
        self.input_mode = InputMode::Normal;
    }

    pub fn start_browsing(&mut self) {
        self.browser.refresh();
        self.input_mode = InputMode::Browse;
    }

    /// Descends into the highlighted directory or selects the highlighted file.
    pub fn browse_enter(&mut self) {
        if let Some(file) = self.browser.enter() {
            self.controller.select_file(file);
            self.input_mode = InputMode::Normal;
        }
    }

    pub fn clear_all(&mut self) {
        self.controller.clear_all();
        self.log_scroll = 0;
        self.follow_log = true;
    }

    pub fn scroll_log(&mut self, delta: isize) {
        let max_scroll = self
            .controller
            .status()
            .len()
            .saturating_sub(self.log_visible_lines);
        let current = if self.follow_log {
            max_scroll
        } else {
            self.log_scroll
        };

        self.log_scroll = current.saturating_add_signed(delta).min(max_scroll);
        self.follow_log = self.log_scroll == max_scroll;
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer = String::new();
        self.text_area = TextArea::default();
    }

    pub fn add_char_to_input(&mut self, c: char) {
        self.input_buffer.push(c);
    }

    pub fn delete_char_from_input(&mut self) {
        self.input_buffer.pop();
    }

    pub fn start_command_mode(&mut self) {
        self.input_mode = InputMode::Command;
        self.input_buffer = String::new();
    }
}
