use glob::{MatchOptions, Pattern, glob_with};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BrowseEntry {
    Parent,
    Dir(PathBuf),
    Csv(PathBuf),
}

impl BrowseEntry {
    pub fn label(&self) -> String {
        let name = |p: &Path| {
            p.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| p.display().to_string())
        };
        match self {
            BrowseEntry::Parent => "../".to_string(),
            BrowseEntry::Dir(p) => format!("{}/", name(p)),
            BrowseEntry::Csv(p) => name(p),
        }
    }
}

/// Directory listing restricted to subdirectories and CSV files.
#[derive(Clone, Debug)]
pub struct FileBrowser {
    pub dir: PathBuf,
    pub entries: Vec<BrowseEntry>,
    pub selected: usize,
    pub error: Option<String>,
}

impl FileBrowser {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            entries: Vec::new(),
            selected: 0,
            error: None,
        }
    }

    pub fn refresh(&mut self) {
        self.selected = 0;
        self.error = None;
        self.entries = vec![BrowseEntry::Parent];

        match list_dir(&self.dir) {
            Ok((dirs, files)) => {
                self.entries.extend(dirs.into_iter().map(BrowseEntry::Dir));
                self.entries.extend(files.into_iter().map(BrowseEntry::Csv));
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.entries.is_empty() {
            return;
        }
        let last = self.entries.len() - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(last);
    }

    pub fn parent(&mut self) {
        if let Some(parent) = self.dir.parent() {
            self.dir = parent.to_path_buf();
        }
        self.refresh();
    }

    /// Acts on the highlighted entry. Returns the file when a CSV was chosen.
    pub fn enter(&mut self) -> Option<PathBuf> {
        match self.entries.get(self.selected).cloned()? {
            BrowseEntry::Parent => {
                self.parent();
                None
            }
            BrowseEntry::Dir(dir) => {
                self.dir = dir;
                self.refresh();
                None
            }
            BrowseEntry::Csv(file) => Some(file),
        }
    }
}

fn list_dir(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), glob::PatternError> {
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };
    let pattern = format!(
        "{}{}*",
        Pattern::escape(&dir.to_string_lossy()),
        std::path::MAIN_SEPARATOR
    );

    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for path in glob_with(&pattern, options)?.flatten() {
        if path.is_dir() {
            dirs.push(path);
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        {
            files.push(path);
        }
    }
    dirs.sort();
    files.sort();
    Ok((dirs, files))
}
