use anyhow::{Context, Result};
use log::{debug, warn};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::process::Command;

/// Directories appended to PATH after whatever the login shell reported, so
/// common tool locations resolve even under a sparse profile.
pub const FALLBACK_PATH_DIRS: &[&str] = &[
    "/usr/local/bin",
    "/usr/bin",
    "/bin",
    "/usr/sbin",
    "/sbin",
    "/opt/homebrew/bin",
    "/opt/homebrew/sbin",
    "/opt/local/bin",
];

pub fn default_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/bash".to_string())
}

/// Captures the environment a login shell would resolve (profile files
/// sourced, PATH expanded) by running `shell -l -c env` once. The result is
/// cached for the loader's lifetime; a new session builds a new loader.
#[derive(Debug)]
pub struct EnvironmentLoader {
    shell: String,
    cache: OnceCell<HashMap<String, String>>,
}

impl EnvironmentLoader {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            cache: OnceCell::new(),
        }
    }

    pub fn with_default_shell() -> Self {
        Self::new(default_shell())
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    pub fn load(&self) -> &HashMap<String, String> {
        self.cache.get_or_init(|| match capture(&self.shell) {
            Ok(map) => {
                debug!("captured {} variables from {}", map.len(), self.shell);
                map
            }
            Err(err) => {
                warn!("login shell environment capture failed ({err:#}); using inherited environment");
                with_fallback_path(std::env::vars().collect())
            }
        })
    }
}

fn capture(shell: &str) -> Result<HashMap<String, String>> {
    let output = Command::new(shell)
        .args(["-l", "-c", "env"])
        .output()
        .with_context(|| format!("failed to spawn {shell}"))?;
    anyhow::ensure!(output.status.success(), "{shell} exited with {}", output.status);

    let mut map = HashMap::new();
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        if let Some((key, value)) = line.split_once('=') {
            if !key.is_empty() {
                map.insert(key.to_string(), value.to_string());
            }
        }
    }
    anyhow::ensure!(!map.is_empty(), "no environment variables parsed");
    Ok(with_fallback_path(map))
}

fn with_fallback_path(mut map: HashMap<String, String>) -> HashMap<String, String> {
    let current = map.get("PATH").cloned().unwrap_or_default();
    let mut parts: Vec<&str> = current.split(':').filter(|p| !p.is_empty()).collect();
    for dir in FALLBACK_PATH_DIRS.iter().copied() {
        if !parts.contains(&dir) {
            parts.push(dir);
        }
    }
    map.insert("PATH".to_string(), parts.join(":"));
    map
}
