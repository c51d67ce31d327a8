pub mod environment;

use anyhow::{Context, Result};
use log::debug;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, channel};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

/// Kill switch for the command currently running through an executor. The
/// handle is clonable so a host can interrupt from another thread while the
/// session blocks in `execute`.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    inner: Arc<InterruptInner>,
}

#[derive(Debug, Default)]
struct InterruptInner {
    child: Mutex<Option<Child>>,
    interrupted: AtomicBool,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kills the in-flight subprocess, if any. Returns whether a kill was
    /// actually delivered. Only the shell itself is signalled; grandchildren
    /// of an `&&` chain may linger until they exit on their own (the stream
    /// collection below bounds how long their open pipes are waited on).
    pub fn interrupt(&self) -> bool {
        self.inner.interrupted.store(true, Ordering::SeqCst);
        let mut slot = self.lock_child();
        match slot.as_mut() {
            Some(child) => child.kill().is_ok(),
            None => false,
        }
    }

    fn reset(&self) {
        self.inner.interrupted.store(false, Ordering::SeqCst);
    }

    // An interrupt can land between spawn and arm. The flag survives the
    // hand-off, so a kill that found no child yet is delivered here.
    fn arm(&self, child: Child) {
        let mut slot = self.lock_child();
        *slot = Some(child);
        if self.was_interrupted() {
            if let Some(child) = slot.as_mut() {
                let _ = child.kill();
            }
        }
    }

    fn was_interrupted(&self) -> bool {
        self.inner.interrupted.load(Ordering::SeqCst)
    }

    // The child stays in the slot while we poll so interrupt() can reach it.
    fn wait(&self) -> Result<ExitStatus> {
        loop {
            {
                let mut slot = self.lock_child();
                let child = slot.as_mut().context("no subprocess armed")?;
                if let Some(status) = child.try_wait()? {
                    slot.take();
                    return Ok(status);
                }
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    fn lock_child(&self) -> MutexGuard<'_, Option<Child>> {
        match self.inner.child.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Outcome of one shell invocation. `output_lines` excludes the sentinel
/// `pwd` line; `new_cwd` is present only when the whole chain succeeded.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub output_lines: Vec<String>,
    pub stderr: String,
    pub new_cwd: Option<PathBuf>,
    pub duration: Duration,
    pub interrupted: bool,
}

/// Spawns one shell subprocess per submitted command line. The command is
/// wrapped as `cd '<cwd>' && <line> && pwd` so the resulting working
/// directory can be recovered from the last stdout line; `&&` guarantees the
/// sentinel never runs after a failure.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    shell: String,
}

impl CommandExecutor {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    pub fn execute(
        &self,
        command_line: &str,
        cwd: &Path,
        env: &HashMap<String, String>,
        interrupt: &InterruptHandle,
    ) -> Result<ExecutionResult> {
        // cwd always originates from a prior `pwd`, so single quotes are safe.
        let script = format!("cd '{}' && {} && pwd", cwd.display(), command_line);
        debug!("executing via {}: {script}", self.shell);

        interrupt.reset();
        let started = Instant::now();
        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(&script)
            .env_clear()
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.shell))?;

        let stdout_rx = spawn_reader(child.stdout.take());
        let stderr_rx = spawn_reader(child.stderr.take());
        interrupt.arm(child);

        let status = interrupt.wait()?;
        let interrupted = interrupt.was_interrupted();
        let raw_stdout = collect_stream(stdout_rx, interrupted);
        let raw_stderr = collect_stream(stderr_rx, interrupted);
        let duration = started.elapsed();

        let stdout_text = normalize_output(&raw_stdout);
        let mut lines: Vec<String> = if stdout_text.is_empty() {
            Vec::new()
        } else {
            stdout_text.split('\n').map(str::to_string).collect()
        };
        while lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }

        let mut new_cwd = None;
        if status.success() && !interrupted {
            if let Some(sentinel) = lines.pop() {
                new_cwd = Some(PathBuf::from(sentinel));
            }
            while lines.last().is_some_and(|line| line.is_empty()) {
                lines.pop();
            }
        }

        Ok(ExecutionResult {
            output_lines: lines,
            stderr: normalize_output(&raw_stderr)
                .trim_end_matches('\n')
                .to_string(),
            new_cwd,
            duration,
            interrupted,
        })
    }
}

fn spawn_reader<R: Read + Send + 'static>(stream: Option<R>) -> Receiver<String> {
    let (tx, rx) = channel();
    thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_end(&mut bytes);
        }
        let _ = tx.send(String::from_utf8_lossy(&bytes).into_owned());
    });
    rx
}

// An interrupted pipeline can leave grandchildren holding the pipe open, so
// reads are only awaited briefly in that case; lost tail output from a killed
// command is acceptable.
fn collect_stream(rx: Receiver<String>, interrupted: bool) -> String {
    if interrupted {
        rx.recv_timeout(Duration::from_millis(250)).unwrap_or_default()
    } else {
        rx.recv().unwrap_or_default()
    }
}

fn normalize_output(input: &str) -> String {
    strip_ansi(input).replace("\r\n", "\n").replace('\r', "\n")
}

fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            if let Some(next) = chars.peek() {
                match *next {
                    '[' => {
                        // CSI: consume until a letter in @-~
                        chars.next();
                        for c in chars.by_ref() {
                            if ('@'..='~').contains(&c) {
                                break;
                            }
                        }
                    }
                    ']' => {
                        // OSC: consume until BEL or ST
                        chars.next();
                        let mut prev = '\0';
                        for c in chars.by_ref() {
                            if c == '\x07' || (prev == '\x1b' && c == '\\') {
                                break;
                            }
                            prev = c;
                        }
                    }
                    _ => {
                        continue;
                    }
                }
            }
        } else {
            out.push(ch);
        }
    }
    out
}
