use chrono::{DateTime, Local};
use serde::Serialize;

/// Severity of a status line; decides its color in the shell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl StatusLevel {
    /// Foreground color as RGB, `None` for the terminal default.
    pub fn rgb(self) -> Option<(u8, u8, u8)> {
        match self {
            StatusLevel::Info => None,
            StatusLevel::Success => Some((46, 160, 67)),
            StatusLevel::Warning => Some((0xFF, 0xBF, 0x00)),
            StatusLevel::Error => Some((0xD3, 0x2F, 0x2F)),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StatusLine {
    pub timestamp: DateTime<Local>,
    pub text: String,
    pub level: StatusLevel,
}

/// Append-only log of user-facing messages.
#[derive(Clone, Debug, Default)]
pub struct StatusLog {
    lines: Vec<StatusLine>,
}

impl StatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: StatusLevel, text: impl Into<String>) {
        let text = text.into();
        match level {
            StatusLevel::Error => tracing::error!("{text}"),
            StatusLevel::Warning => tracing::warn!("{text}"),
            StatusLevel::Info | StatusLevel::Success => tracing::info!("{text}"),
        }
        self.lines.push(StatusLine {
            timestamp: Local::now(),
            text,
            level,
        });
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(StatusLevel::Info, text);
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.push(StatusLevel::Success, text);
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(StatusLevel::Warning, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(StatusLevel::Error, text);
    }

    /// Appends preformatted table lines without mirroring them to the log.
    pub fn table(&mut self, lines: Vec<String>) {
        let timestamp = Local::now();
        self.lines.extend(lines.into_iter().map(|text| StatusLine {
            timestamp,
            text,
            level: StatusLevel::Info,
        }));
    }

    pub fn lines(&self) -> &[StatusLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.lines.iter().any(|l| l.level == StatusLevel::Error)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_keep_order_and_level() {
        let mut log = StatusLog::new();
        log.info("Selected file: lot.csv");
        log.error("Error: boom");
        log.table(vec!["a".into(), "b".into()]);

        let levels: Vec<StatusLevel> = log.lines().iter().map(|l| l.level).collect();
        assert_eq!(
            levels,
            vec![
                StatusLevel::Info,
                StatusLevel::Error,
                StatusLevel::Info,
                StatusLevel::Info
            ]
        );
        assert!(log.has_errors());

        log.clear();
        assert!(log.is_empty());
        assert!(!log.has_errors());
    }

    #[test]
    fn warning_and_error_colors() {
        assert_eq!(StatusLevel::Error.rgb(), Some((211, 47, 47)));
        assert_eq!(StatusLevel::Warning.rgb(), Some((255, 191, 0)));
        assert_eq!(StatusLevel::Info.rgb(), None);
    }
}
