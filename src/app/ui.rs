use crate::app::AppState;
use crate::app::InputMode;

impl AppState<'_> {
    pub fn show_help(&mut self) {
        self.help_scroll = 0;

        self.help_text = "FILE SELECTION:\n\
             b           - Browse for a CSV file\n\
             e, Enter    - Edit the file path\n\
             c           - Convert the selected CSV to Excel\n\
             :open [path] - Select a CSV file by path\n\
             :convert    - Convert the selected CSV to Excel\n\n\
             PIVOT FILTER:\n\
             Left/Right  - Cycle through the C1_MARK values\n\
             p           - Generate the pivot and fallout tables\n\
             t           - Check the highest-fallout End Test No.\n\
             w           - Generate the wafermap for the slot\n\
             :pivot [value] - Generate the pivot, optionally for a C1_MARK value\n\
             :check      - Check End Test No.\n\
             :wafermap   - Generate the wafermap\n\n\
             STATUS LOG:\n\
             j/k, Up/Down - Scroll the log\n\
             PgUp/PgDn   - Scroll the log by a page\n\
             G           - Follow the newest line\n\n\
             BROWSER:\n\
             j/k, Up/Down - Move the selection\n\
             Enter       - Open directory or select file\n\
             Backspace   - Go to parent directory\n\
             Esc         - Close the browser\n\n\
             SESSION:\n\
             x, :clear   - Clear all\n\
             q, :q       - Exit\n\
             ?, :help    - Show this help"
            .to_string();

        self.input_mode = InputMode::Help;
    }

    pub fn exit(&mut self) {
        self.should_quit = true;
    }
}
