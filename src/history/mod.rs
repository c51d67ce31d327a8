use log::warn;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Bounded log of previously submitted commands with up/down recall. The
/// cursor sits one past the newest entry after every add, so the first
/// `previous()` returns the just-executed command; movement clamps at both
/// ends and never wraps.
#[derive(Debug)]
pub struct CommandHistory {
    entries: Vec<String>,
    cursor: usize,
    limit: usize,
    file: Option<PathBuf>,
}

impl CommandHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            limit: limit.max(1),
            file: None,
        }
    }

    /// Loads newline-separated history from `path` (most recent last) and
    /// appends future entries to it, best-effort.
    pub fn with_file(limit: usize, path: impl Into<PathBuf>) -> Self {
        let mut history = Self::new(limit);
        let path = path.into();
        if let Ok(contents) = std::fs::read_to_string(&path) {
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if history.entries.last().map(String::as_str) != Some(line) {
                    history.entries.push(line.to_string());
                }
            }
            let excess = history.entries.len().saturating_sub(history.limit);
            history.entries.drain(..excess);
        }
        history.cursor = history.entries.len();
        history.file = Some(path);
        history
    }

    /// Resolves the default backing file under the app data dir.
    pub fn default_file() -> Option<PathBuf> {
        let base = app_data_dir()?;
        Some(base.join("coveshell").join("history.txt"))
    }

    pub fn add(&mut self, command: &str) {
        let command = command.trim();
        if command.is_empty() {
            return;
        }
        if self.entries.last().map(String::as_str) != Some(command) {
            self.entries.push(command.to_string());
            if self.entries.len() > self.limit {
                let excess = self.entries.len() - self.limit;
                self.entries.drain(..excess);
            }
            if let Some(path) = self.file.clone() {
                if let Err(err) = append_line(&path, command) {
                    warn!("could not append to {}: {err}", path.display());
                }
            }
        }
        self.cursor = self.entries.len();
    }

    pub fn previous(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        if self.cursor > 0 {
            self.cursor -= 1;
        }
        self.entries.get(self.cursor).map(String::as_str)
    }

    /// Steps toward the newest entry; `None` means the cursor moved past the
    /// end (an empty prompt).
    pub fn next(&mut self) -> Option<&str> {
        if self.cursor < self.entries.len() {
            self.cursor += 1;
        }
        self.entries.get(self.cursor).map(String::as_str)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

fn append_line(path: &Path, command: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{command}")?;
    Ok(())
}

fn app_data_dir() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return Some(PathBuf::from(xdg));
    }
    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home).join(".local").join("share"));
    }
    None
}
