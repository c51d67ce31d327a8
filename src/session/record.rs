use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    Command,
    StandardOutput,
    StandardError,
    Success,
    Interrupted,
}

/// One entry in the session's append-only output log. Command records are
/// finalized exactly once after their subprocess exits; every other kind is
/// immutable from creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputRecord {
    pub id: Uuid,
    pub text: String,
    pub kind: RecordKind,
    pub prompt_label: String,
    pub timestamp: DateTime<Utc>,
    pub duration: Option<Duration>,
    pub working_dir: Option<PathBuf>,
}

impl OutputRecord {
    fn new(text: impl Into<String>, kind: RecordKind, prompt_label: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            kind,
            prompt_label,
            timestamp: Utc::now(),
            duration: None,
            working_dir: None,
        }
    }

    pub fn command(text: impl Into<String>, prompt_label: impl Into<String>) -> Self {
        Self::new(text, RecordKind::Command, prompt_label.into())
    }

    pub fn stdout(text: impl Into<String>) -> Self {
        Self::new(text, RecordKind::StandardOutput, String::new())
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self::new(text, RecordKind::StandardError, String::new())
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(text, RecordKind::Success, String::new())
    }

    pub fn interrupted(text: impl Into<String>) -> Self {
        Self::new(text, RecordKind::Interrupted, String::new())
    }

    /// Attaches post-execution metadata. Valid only for Command records and
    /// only once.
    pub fn finish(&mut self, duration: Option<Duration>, working_dir: Option<PathBuf>) {
        debug_assert_eq!(self.kind, RecordKind::Command);
        debug_assert!(self.duration.is_none() && self.working_dir.is_none());
        self.duration = duration;
        self.working_dir = working_dir;
    }
}
