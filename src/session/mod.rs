pub mod events;
pub mod record;

use futures::channel::mpsc::UnboundedReceiver;
use log::debug;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use crate::exec::environment::{EnvironmentLoader, default_shell};
use crate::exec::{CommandExecutor, InterruptHandle};
use crate::history::{CommandHistory, DEFAULT_HISTORY_LIMIT};
use events::{EventBus, SessionEvent};
use record::OutputRecord;

const HELP_TEXT: &str = "\
Built-in commands:
  help              show this message
  clear             clear the output log
  cd [path]         change the working directory
  open|view|cat <file>   open a file in the viewer
  edit|vim|nano <file>   open a file in the editor
Anything else is executed through the shell.";

pub struct SessionConfig {
    pub shell: String,
    pub starting_dir: Option<PathBuf>,
    pub history_limit: usize,
    pub history_file: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            starting_dir: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            history_file: None,
        }
    }
}

/// One terminal session: the ordered record log, the tracked working
/// directory, a cached login-shell environment and built-in dispatch.
/// Submission is a synchronous dispatch/execute/record cycle; one command at
/// a time. Sessions share nothing with each other.
pub struct Session {
    records: Vec<OutputRecord>,
    cwd: PathBuf,
    env: EnvironmentLoader,
    executor: CommandExecutor,
    history: CommandHistory,
    events: EventBus,
    interrupt: InterruptHandle,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let cwd = config
            .starting_dir
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("/"));
        let history = match config.history_file {
            Some(path) => CommandHistory::with_file(config.history_limit, path),
            None => CommandHistory::new(config.history_limit),
        };
        Self {
            records: Vec::new(),
            cwd,
            env: EnvironmentLoader::new(config.shell.clone()),
            executor: CommandExecutor::new(config.shell),
            history,
            events: EventBus::new(),
            interrupt: InterruptHandle::new(),
        }
    }

    pub fn records(&self) -> &[OutputRecord] {
        &self.records
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn prompt_label(&self) -> String {
        format_path(&self.cwd)
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut CommandHistory {
        &mut self.history
    }

    pub fn subscribe(&mut self) -> UnboundedReceiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Handle for interrupting the in-flight command from another thread.
    pub fn interrupter(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    pub fn environment(&self) -> &std::collections::HashMap<String, String> {
        self.env.load()
    }

    /// Submits one command line. Built-ins are matched case-insensitively on
    /// the first token; everything else goes through the shell. All failures
    /// end up as records in the log; the session stays usable.
    pub fn submit(&mut self, line: &str) {
        let command = line.trim().to_string();
        if command.is_empty() {
            return;
        }
        self.history.add(&command);
        let index = self.append(OutputRecord::command(command.as_str(), self.prompt_label()));

        let mut parts = command.splitn(2, char::is_whitespace);
        let first = parts.next().unwrap_or("").to_ascii_lowercase();
        let rest = parts.next().map(str::trim).unwrap_or("");

        match first.as_str() {
            "help" => {
                self.append(OutputRecord::stdout(HELP_TEXT));
            }
            "clear" => {
                self.records.clear();
                self.events.emit(SessionEvent::Cleared);
            }
            "cd" => self.builtin_cd(rest, index),
            "open" | "view" | "cat" => self.builtin_open(&first, rest),
            "edit" | "vim" | "nano" => self.builtin_edit(&first, rest),
            _ => self.run_external(&command, index),
        }
    }

    fn builtin_cd(&mut self, arg: &str, command_index: usize) {
        let target = if arg.is_empty() { "~" } else { arg };
        match resolve_entry_path(&self.cwd, target).filter(|path| path.is_dir()) {
            Some(path) => {
                debug!("cd {} -> {}", target, path.display());
                self.records[command_index].finish(None, Some(path.clone()));
                self.emit_finished(command_index);
                self.cwd = path.clone();
                self.append(OutputRecord::success(path.display().to_string()));
                self.events.emit(SessionEvent::CwdChanged(path));
            }
            None => {
                self.append(OutputRecord::stderr(format!(
                    "cd: no such file or directory: {target}"
                )));
            }
        }
    }

    fn builtin_open(&mut self, verb: &str, arg: &str) {
        let Some(path) = self.resolve_existing(verb, arg) else {
            return;
        };
        if path.is_dir() || !is_text_file(&path) {
            self.events.emit(SessionEvent::OpenWithSystem(path));
        } else {
            self.events.emit(SessionEvent::OpenViewer(path));
        }
    }

    fn builtin_edit(&mut self, verb: &str, arg: &str) {
        if let Some(path) = self.resolve_existing(verb, arg) {
            self.events.emit(SessionEvent::OpenEditor(path));
        }
    }

    fn resolve_existing(&mut self, verb: &str, arg: &str) -> Option<PathBuf> {
        if arg.is_empty() {
            self.append(OutputRecord::stderr(format!("{verb}: missing file operand")));
            return None;
        }
        match resolve_entry_path(&self.cwd, arg) {
            Some(path) => Some(path),
            None => {
                self.append(OutputRecord::stderr(format!(
                    "{verb}: no such file or directory: {arg}"
                )));
                None
            }
        }
    }

    fn run_external(&mut self, command: &str, command_index: usize) {
        let result = self
            .executor
            .execute(command, &self.cwd, self.env.load(), &self.interrupt);
        match result {
            Ok(result) => {
                let moved = result.new_cwd.filter(|path| *path != self.cwd);
                let completion_dir = moved.clone().unwrap_or_else(|| self.cwd.clone());
                self.records[command_index]
                    .finish(Some(result.duration), Some(completion_dir));
                self.emit_finished(command_index);

                if !result.output_lines.is_empty() {
                    self.append(OutputRecord::stdout(result.output_lines.join("\n")));
                }
                if !result.stderr.is_empty() {
                    self.append(OutputRecord::stderr(result.stderr));
                }
                if result.interrupted {
                    self.append(OutputRecord::interrupted("command interrupted"));
                }
                if let Some(path) = moved {
                    self.cwd = path.clone();
                    self.events.emit(SessionEvent::CwdChanged(path));
                }
            }
            Err(err) => {
                self.append(OutputRecord::stderr(format!("{err:#}")));
            }
        }
    }

    fn append(&mut self, record: OutputRecord) -> usize {
        self.records.push(record.clone());
        self.events.emit(SessionEvent::RecordAppended(record));
        self.records.len() - 1
    }

    fn emit_finished(&mut self, index: usize) {
        let record = self.records[index].clone();
        self.events.emit(SessionEvent::RecordFinished(record));
    }
}

/// Abbreviates the home directory to `~` for prompt labels.
pub fn format_path(path: &Path) -> String {
    if let Ok(home) = std::env::var("HOME") {
        if let Ok(stripped) = path.strip_prefix(&home) {
            let stripped = stripped.to_string_lossy();
            if stripped.is_empty() {
                return "~".to_string();
            }
            return format!("~/{stripped}");
        }
    }
    path.to_string_lossy().into_owned()
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("~"));
        if rest.is_empty() {
            return home;
        }
        return home.join(rest.trim_start_matches('/'));
    }
    PathBuf::from(path)
}

// Walks the path component by component against real directory entries, so a
// differently-cased name never resolves even on a case-insensitive
// filesystem.
fn resolve_entry_path(cwd: &Path, input: &str) -> Option<PathBuf> {
    let expanded = expand_tilde(input);
    let mut resolved = if expanded.is_absolute() {
        PathBuf::from("/")
    } else {
        cwd.to_path_buf()
    };
    for component in expanded.components() {
        match component {
            Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => {
                let exact = std::fs::read_dir(&resolved)
                    .ok()?
                    .flatten()
                    .any(|entry| entry.file_name() == name);
                if !exact {
                    return None;
                }
                resolved.push(name);
            }
        }
    }
    Some(resolved)
}

// Reads at most the leading 8 KiB; a `cat` on a multi-gigabyte binary must
// not pull the whole file into memory just to classify it.
fn is_text_file(path: &Path) -> bool {
    let Ok(file) = std::fs::File::open(path) else {
        return false;
    };
    let mut head = Vec::with_capacity(8192);
    if file.take(8192).read_to_end(&mut head).is_err() {
        return false;
    }
    !head.contains(&0)
}
