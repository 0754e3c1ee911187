/*
 * Errand - Sandboxed Single-Shot Gemini Agent
 * File Path: src/sandbox.rs
 * Responsibility: Working-directory containment for all tool file and process access
 */
use crate::config::SandboxConfig;
use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// What a tool wants to do with a path. Supplies the verb in rejection
/// messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Execute,
}

impl Access {
    pub fn verb(self) -> &'static str {
        match self {
            Access::Read => "read",
            Access::Execute => "execute",
        }
    }
}

/// A candidate path that resolved outside the sandbox root. Carries the
/// model-supplied path verbatim so the message names what was asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEscape {
    pub access: Access,
    pub path: String,
}

impl fmt::Display for PathEscape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot {} \"{}\" as it is outside the permitted working directory",
            self.access.verb(),
            self.path
        )
    }
}

/// The working-directory root plus the limits that apply inside it.
/// Built once from configuration; immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
    pub max_file_chars: usize,
    pub script_timeout: Duration,
    pub python_bin: String,
}

impl Sandbox {
    pub fn new(config: &SandboxConfig) -> Result<Self> {
        let root = fs::canonicalize(&config.root).with_context(|| {
            format!(
                "Working directory {:?} does not exist or is not accessible",
                config.root
            )
        })?;
        Ok(Self {
            root,
            max_file_chars: config.max_file_chars,
            script_timeout: Duration::from_secs(config.script_timeout_secs),
            python_bin: config.python_bin.clone(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a model-supplied path against the root. Rejects anything
    /// that lands outside it and never touches the file on rejection.
    pub fn resolve(&self, relative: &str, access: Access) -> Result<PathBuf, PathEscape> {
        let escape = || PathEscape {
            access,
            path: relative.to_string(),
        };

        let target = lexical_normalize(&self.root.join(relative));
        if !target.starts_with(&self.root) {
            return Err(escape());
        }

        // The lexical verdict is not enough once the target exists on
        // disk: a symlink inside the root can point anywhere.
        if target.exists() {
            match fs::canonicalize(&target) {
                Ok(real) if real.starts_with(&self.root) => Ok(real),
                _ => Err(escape()),
            }
        } else {
            Ok(target)
        }
    }
}

/// Collapse `.` and `..` components without touching the filesystem.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}
