mod commands;

pub use commands::COMMON_COMMANDS;

use std::path::{Path, PathBuf};

use crate::history::CommandHistory;

pub const VISIBLE_ROWS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    Command,
    History,
    Directory,
    File,
}

/// One suggestion. `text` is the completed segment: a full command line for
/// first-token completion, a directory name with trailing `/` or a file name
/// for argument completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub text: String,
    pub source: CandidateSource,
}

/// The two completion affordances are mutually exclusive by construction:
/// ghost text only exists in `Ghost`, a selection only in `Popup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionState {
    Hidden,
    Ghost(String),
    Popup { selected: usize, window_start: usize },
}

/// Prefix completion over three sources: the static common-command table,
/// command history, and the current directory's entries. Candidates are
/// recomputed synchronously on every `update`; the directory listing is fully
/// replaced each time, never patched.
#[derive(Debug)]
pub struct AutocompleteEngine {
    input: String,
    candidates: Vec<Candidate>,
    state: CompletionState,
    dir_cache: DirectoryCache,
    visible_rows: usize,
}

#[derive(Debug, Default)]
struct DirectoryCache {
    dir: Option<PathBuf>,
    dirs: Vec<String>,
    files: Vec<String>,
}

impl DirectoryCache {
    fn refresh(&mut self, cwd: &Path) {
        self.dir = Some(cwd.to_path_buf());
        self.dirs.clear();
        self.files.clear();
        let Ok(entries) = std::fs::read_dir(cwd) else {
            return;
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                self.dirs.push(name);
            } else {
                self.files.push(name);
            }
        }
        self.dirs.sort();
        self.files.sort();
    }
}

impl AutocompleteEngine {
    pub fn new() -> Self {
        Self::with_visible_rows(VISIBLE_ROWS)
    }

    pub fn with_visible_rows(visible_rows: usize) -> Self {
        Self {
            input: String::new(),
            candidates: Vec::new(),
            state: CompletionState::Hidden,
            dir_cache: DirectoryCache::default(),
            visible_rows: visible_rows.max(1),
        }
    }

    /// Recomputes candidates for the given input against the current
    /// directory and history. An open popup stays open (selection clamped) as
    /// long as candidates remain; otherwise the state falls back to ghost
    /// text or hidden.
    pub fn update(&mut self, input: &str, cwd: &Path, history: &CommandHistory) {
        self.input = input.to_string();
        self.dir_cache.refresh(cwd);
        self.candidates = self.compute_candidates(history);

        let was_popup = matches!(self.state, CompletionState::Popup { .. });
        if was_popup && !self.candidates.is_empty() {
            if let CompletionState::Popup { selected, .. } = self.state {
                self.open_popup(selected.min(self.candidates.len() - 1));
            }
        } else {
            self.state = match self.ghost_suffix() {
                Some(suffix) => CompletionState::Ghost(suffix),
                None => CompletionState::Hidden,
            };
        }
    }

    pub fn state(&self) -> &CompletionState {
        &self.state
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn ghost_text(&self) -> &str {
        match &self.state {
            CompletionState::Ghost(suffix) => suffix,
            _ => "",
        }
    }

    pub fn is_popup_open(&self) -> bool {
        matches!(self.state, CompletionState::Popup { .. })
    }

    /// The candidate rows currently visible in the popup window.
    pub fn visible_window(&self) -> &[Candidate] {
        match self.state {
            CompletionState::Popup { window_start, .. } => {
                let end = (window_start + self.visible_rows).min(self.candidates.len());
                &self.candidates[window_start..end]
            }
            _ => &[],
        }
    }

    pub fn navigate_down(&mut self) {
        if self.candidates.is_empty() {
            return;
        }
        let next = match self.state {
            CompletionState::Popup { selected, .. } => (selected + 1) % self.candidates.len(),
            _ => 0,
        };
        self.open_popup(next);
    }

    pub fn navigate_up(&mut self) {
        if self.candidates.is_empty() {
            return;
        }
        let next = match self.state {
            CompletionState::Popup { selected, .. } => {
                if selected == 0 {
                    self.candidates.len() - 1
                } else {
                    selected - 1
                }
            }
            _ => self.candidates.len() - 1,
        };
        self.open_popup(next);
    }

    pub fn select_index(&mut self, index: usize) {
        if self.candidates.is_empty() {
            return;
        }
        self.open_popup(index.min(self.candidates.len() - 1));
    }

    /// Completes the current input. Ghost text is appended in place; a popup
    /// selection replaces the last token (or the whole line for first-token
    /// candidates). Returns `None` when nothing is suggested.
    pub fn accept(&mut self) -> Option<String> {
        let state = std::mem::replace(&mut self.state, CompletionState::Hidden);
        let completed = match state {
            CompletionState::Hidden => return None,
            CompletionState::Ghost(suffix) => {
                let line = format!("{}{}", self.input, suffix);
                self.candidates.clear();
                return Some(line);
            }
            CompletionState::Popup { selected, .. } => self.candidates.get(selected)?.text.clone(),
        };
        let line = self.rebuild_line(&completed);
        self.candidates.clear();
        Some(line)
    }

    pub fn clear(&mut self) {
        self.candidates.clear();
        self.state = CompletionState::Hidden;
    }

    fn open_popup(&mut self, selected: usize) {
        let previous_start = match self.state {
            CompletionState::Popup { window_start, .. } => window_start,
            _ => 0,
        };
        let window_start =
            scroll_window(previous_start, selected, self.candidates.len(), self.visible_rows);
        self.state = CompletionState::Popup {
            selected,
            window_start,
        };
    }

    fn compute_candidates(&self, history: &CommandHistory) -> Vec<Candidate> {
        let tokens: Vec<&str> = self.input.split_whitespace().collect();
        if tokens.is_empty() {
            return Vec::new();
        }
        let ends_ws = self.input.chars().last().is_some_and(char::is_whitespace);

        if tokens.len() == 1 && !ends_ws {
            self.command_candidates(tokens[0], history)
        } else {
            let last = if ends_ws { "" } else { tokens[tokens.len() - 1] };
            self.path_candidates(tokens[0], last)
        }
    }

    fn command_candidates(&self, token: &str, history: &CommandHistory) -> Vec<Candidate> {
        let prefix = token.to_lowercase();
        let mut out = Vec::new();
        for cmd in COMMON_COMMANDS {
            if cmd.to_lowercase().starts_with(&prefix) {
                out.push(Candidate {
                    text: (*cmd).to_string(),
                    source: CandidateSource::Command,
                });
            }
        }
        for cmd in history.entries() {
            if cmd.to_lowercase().starts_with(&prefix) {
                out.push(Candidate {
                    text: cmd.clone(),
                    source: CandidateSource::History,
                });
            }
        }
        out.sort_by(|a, b| a.text.cmp(&b.text));
        out.dedup_by(|a, b| a.text == b.text);
        out
    }

    fn path_candidates(&self, first: &str, last: &str) -> Vec<Candidate> {
        let prefix = last.to_lowercase();
        let dirs_only = first.eq_ignore_ascii_case("cd");
        let mut out = Vec::new();
        for name in &self.dir_cache.dirs {
            if name.to_lowercase().starts_with(&prefix) {
                out.push(Candidate {
                    text: format!("{name}/"),
                    source: CandidateSource::Directory,
                });
            }
        }
        if !dirs_only {
            for name in &self.dir_cache.files {
                if name.to_lowercase().starts_with(&prefix) {
                    out.push(Candidate {
                        text: name.clone(),
                        source: CandidateSource::File,
                    });
                }
            }
        }
        out
    }

    // Ghost text is the top candidate's remainder past the typed segment.
    fn ghost_suffix(&self) -> Option<String> {
        let top = self.candidates.first()?;
        let typed = self.typed_segment();
        if top.text.len() <= typed.len() {
            return None;
        }
        if !top.text.to_lowercase().starts_with(&typed.to_lowercase()) {
            return None;
        }
        top.text.get(typed.len()..).map(str::to_string)
    }

    fn typed_segment(&self) -> &str {
        let tokens: Vec<&str> = self.input.split_whitespace().collect();
        let ends_ws = self.input.chars().last().is_some_and(char::is_whitespace);
        match tokens.len() {
            0 => "",
            1 if !ends_ws => &self.input,
            _ if ends_ws => "",
            n => tokens[n - 1],
        }
    }

    fn rebuild_line(&self, completed: &str) -> String {
        let mut tokens: Vec<&str> = self.input.split_whitespace().collect();
        let ends_ws = self.input.chars().last().is_some_and(char::is_whitespace);
        if tokens.len() <= 1 && !ends_ws {
            return completed.to_string();
        }
        if ends_ws {
            tokens.push(completed);
        } else if let Some(last) = tokens.last_mut() {
            *last = completed;
        }
        tokens.join(" ")
    }
}

impl Default for AutocompleteEngine {
    fn default() -> Self {
        Self::new()
    }
}

// Scrolls by the minimal amount needed to keep `selected` visible, never past
// the last page.
fn scroll_window(mut start: usize, selected: usize, len: usize, rows: usize) -> usize {
    let max_start = len.saturating_sub(rows);
    if start > max_start {
        start = max_start;
    }
    if selected < start {
        start = selected;
    } else if selected >= start + rows {
        start = selected + 1 - rows;
    }
    start.min(max_start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    fn history_of(commands: &[&str]) -> CommandHistory {
        let mut history = CommandHistory::default();
        for cmd in commands {
            history.add(cmd);
        }
        history
    }

    fn texts(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn history_and_table_matches_are_deduplicated() {
        let dir = scratch();
        let mut engine = AutocompleteEngine::new();
        // "git status" is in both the table and the history; it must appear once.
        let history = history_of(&["git status"]);
        engine.update("git", dir.path(), &history);

        let names = texts(engine.candidates());
        assert_eq!(names.iter().filter(|n| **n == "git status").count(), 1);
    }

    #[test]
    fn ghost_text_is_the_top_candidate_suffix() {
        let dir = scratch();
        let mut engine = AutocompleteEngine::new();
        let history = history_of(&["deploy production"]);
        engine.update("dep", dir.path(), &history);

        assert_eq!(texts(engine.candidates()), vec!["deploy production"]);
        assert_eq!(
            engine.state(),
            &CompletionState::Ghost("loy production".to_string())
        );
    }

    #[test]
    fn an_exact_match_stays_in_the_candidate_list() {
        let dir = scratch();
        let mut engine = AutocompleteEngine::new();
        engine.update("ls", dir.path(), &CommandHistory::default());

        let names = texts(engine.candidates());
        assert!(names.contains(&"ls"));
        assert!(names.contains(&"ls -la"));
        // Nothing extends the input, so there is no ghost text.
        assert_eq!(engine.state(), &CompletionState::Hidden);
        engine.navigate_down();
        assert_eq!(engine.accept(), Some("ls".to_string()));
    }

    #[test]
    fn single_token_candidates_are_lexicographically_sorted() {
        let dir = scratch();
        let mut engine = AutocompleteEngine::new();
        let history = history_of(&["git show HEAD"]);
        engine.update("git", dir.path(), &history);

        let names = texts(engine.candidates());
        assert!(names.contains(&"git status"));
        assert!(names.contains(&"git show HEAD"));
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn candidates_respect_the_lowercase_prefix_invariant() {
        let dir = scratch();
        fs::create_dir(dir.path().join("Documents")).unwrap();
        fs::write(dir.path().join("doc.txt"), "x").unwrap();
        let mut engine = AutocompleteEngine::new();
        let history = history_of(&["ls -la", "less file"]);

        for input in ["l", "ls D", "ls do"] {
            engine.update(input, dir.path(), &history);
            let token = input.split_whitespace().last().unwrap().to_lowercase();
            for candidate in engine.candidates() {
                assert!(
                    candidate.text.to_lowercase().starts_with(&token),
                    "{} does not extend {token}",
                    candidate.text
                );
            }
        }
    }

    #[test]
    fn cd_completion_offers_directories_only() {
        let dir = scratch();
        fs::create_dir(dir.path().join("Documents")).unwrap();
        fs::write(dir.path().join("Doctors.txt"), "x").unwrap();
        let mut engine = AutocompleteEngine::new();
        engine.update("cd Doc", dir.path(), &CommandHistory::default());

        assert_eq!(texts(engine.candidates()), vec!["Documents/"]);
        assert_eq!(
            engine.state(),
            &CompletionState::Ghost("uments/".to_string())
        );
    }

    #[test]
    fn argument_completion_lists_directories_before_files() {
        let dir = scratch();
        fs::create_dir(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("app.rs"), "x").unwrap();
        let mut engine = AutocompleteEngine::new();
        engine.update("ls a", dir.path(), &CommandHistory::default());

        assert_eq!(texts(engine.candidates()), vec!["assets/", "app.rs"]);
    }

    #[test]
    fn trailing_whitespace_completes_a_fresh_argument() {
        let dir = scratch();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let mut engine = AutocompleteEngine::new();
        engine.update("cat ", dir.path(), &CommandHistory::default());

        assert_eq!(texts(engine.candidates()), vec!["notes.txt"]);
        engine.navigate_down();
        assert_eq!(engine.accept(), Some("cat notes.txt".to_string()));
    }

    #[test]
    fn ghost_and_popup_are_never_simultaneous() {
        let dir = scratch();
        fs::create_dir(dir.path().join("Documents")).unwrap();
        let mut engine = AutocompleteEngine::new();
        engine.update("cd Doc", dir.path(), &CommandHistory::default());
        assert!(!engine.ghost_text().is_empty());
        assert!(!engine.is_popup_open());

        engine.navigate_down();
        assert!(engine.is_popup_open());
        assert!(engine.ghost_text().is_empty());
    }

    #[test]
    fn popup_navigation_wraps_around() {
        let dir = scratch();
        for name in ["a1", "a2", "a3"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let mut engine = AutocompleteEngine::new();
        engine.update("ls a", dir.path(), &CommandHistory::default());

        engine.navigate_up();
        assert_eq!(engine.state(), &CompletionState::Popup { selected: 2, window_start: 0 });
        engine.navigate_down();
        assert_eq!(engine.state(), &CompletionState::Popup { selected: 0, window_start: 0 });
    }

    #[test]
    fn window_scrolls_minimally_and_stops_at_the_last_page() {
        let dir = scratch();
        for i in 0..6 {
            fs::write(dir.path().join(format!("a{i}")), "x").unwrap();
        }
        let mut engine = AutocompleteEngine::new();
        engine.update("ls a", dir.path(), &CommandHistory::default());
        assert_eq!(engine.candidates().len(), 6);

        engine.navigate_down();
        for _ in 0..4 {
            engine.navigate_down();
        }
        // Selection 4 needs the window shifted by one.
        assert_eq!(engine.state(), &CompletionState::Popup { selected: 4, window_start: 1 });
        engine.navigate_down();
        assert_eq!(engine.state(), &CompletionState::Popup { selected: 5, window_start: 2 });
        assert_eq!(engine.visible_window().len(), 4);

        // Wrapping back to the top scrolls the window home.
        engine.navigate_down();
        assert_eq!(engine.state(), &CompletionState::Popup { selected: 0, window_start: 0 });
    }

    #[test]
    fn select_index_clamps_into_range() {
        let dir = scratch();
        fs::write(dir.path().join("a1"), "x").unwrap();
        fs::write(dir.path().join("a2"), "x").unwrap();
        let mut engine = AutocompleteEngine::new();
        engine.update("ls a", dir.path(), &CommandHistory::default());

        engine.select_index(99);
        assert_eq!(engine.state(), &CompletionState::Popup { selected: 1, window_start: 0 });
    }

    #[test]
    fn accept_replaces_the_last_token_and_keeps_the_dir_slash() {
        let dir = scratch();
        fs::create_dir(dir.path().join("Documents")).unwrap();
        let mut engine = AutocompleteEngine::new();
        engine.update("cd Doc", dir.path(), &CommandHistory::default());
        engine.navigate_down();
        assert_eq!(engine.accept(), Some("cd Documents/".to_string()));
        assert_eq!(engine.state(), &CompletionState::Hidden);
    }

    #[test]
    fn accept_from_ghost_extends_the_input_in_place() {
        let dir = scratch();
        let mut engine = AutocompleteEngine::new();
        engine.update("dep", dir.path(), &history_of(&["deploy production"]));
        assert_eq!(engine.accept(), Some("deploy production".to_string()));
    }

    #[test]
    fn single_token_popup_accept_replaces_the_whole_input() {
        let dir = scratch();
        let mut engine = AutocompleteEngine::new();
        engine.update("dep", dir.path(), &history_of(&["deploy production"]));
        engine.navigate_down();
        assert_eq!(engine.accept(), Some("deploy production".to_string()));
    }

    #[test]
    fn no_ghost_when_nothing_extends_the_input() {
        let dir = scratch();
        let mut engine = AutocompleteEngine::new();
        engine.update("zzzz", dir.path(), &CommandHistory::default());
        assert_eq!(engine.state(), &CompletionState::Hidden);
        assert!(engine.accept().is_none());
    }

    #[test]
    fn directory_cache_is_replaced_on_cwd_change() {
        let first = scratch();
        let second = scratch();
        fs::write(first.path().join("alpha"), "x").unwrap();
        fs::write(second.path().join("beta"), "x").unwrap();

        let mut engine = AutocompleteEngine::new();
        let history = CommandHistory::default();
        engine.update("ls a", first.path(), &history);
        assert_eq!(texts(engine.candidates()), vec!["alpha"]);

        engine.update("ls a", second.path(), &history);
        assert!(engine.candidates().is_empty());
        engine.update("ls b", second.path(), &history);
        assert_eq!(texts(engine.candidates()), vec!["beta"]);
    }
}
