use std::path::PathBuf;

use crate::app::{Action, AppState, InputMode};

impl AppState<'_> {
    pub fn execute_command(&mut self) {
        let command = self.input_buffer.trim().to_string();
        self.input_mode = InputMode::Normal;
        self.input_buffer = String::new();

        if command.is_empty() {
            return;
        }

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim())),
            None => (command.as_str(), None),
        };

        match (name, arg) {
            ("q" | "quit" | "exit", _) => self.exit(),
            ("help", _) => self.show_help(),
            ("clear", _) => self.clear_all(),
            ("open" | "o", Some(path)) => self.controller.select_file(PathBuf::from(path)),
            ("open" | "o", None) => self.start_browsing(),
            ("convert", _) => self.queue_action(Action::Convert),
            ("pivot", value) => {
                if let Some(value) = value {
                    self.controller.select_filter(value);
                }
                self.queue_action(Action::GeneratePivot);
            }
            ("check", _) => self.queue_action(Action::CheckEndTest),
            ("wafermap" | "wm", _) => self.queue_action(Action::GenerateWafermap),
            _ => self
                .controller
                .status_mut()
                .warning(format!("Unknown command: {command}")),
        }
    }
}
