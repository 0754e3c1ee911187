/*
 * Errand - Sandboxed Single-Shot Gemini Agent
 * File Path: src/config.rs
 * Responsibility: YAML configuration structure, defaults, and layered loading
 */
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub sandbox: SandboxConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SandboxConfig {
    pub root: PathBuf,
    pub max_file_chars: usize,
    pub script_timeout_secs: u64,
    pub python_bin: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            max_file_chars: 10_000,
            script_timeout_secs: 30,
            python_bin: "python3".to_string(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file at {:?}", path.as_ref()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load the explicit config file if given, otherwise the first of
    /// `./errand.yml` and `{config_dir}/errand/errand.yml` that exists.
    /// No file at all is fine; defaults apply.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let local = PathBuf::from("errand.yml");
        if local.is_file() {
            return Self::load(&local);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user = config_dir.join("errand").join("errand.yml");
            if user.is_file() {
                return Self::load(&user);
            }
        }

        Ok(Self::default())
    }

    /// The environment wins over the config file.
    pub fn resolve_api_key(&self) -> Result<String> {
        resolve_api_key_from(
            std::env::var("GEMINI_API_KEY").ok(),
            self.gemini.api_key.as_deref(),
        )
    }
}

fn resolve_api_key_from(env_key: Option<String>, file_key: Option<&str>) -> Result<String> {
    if let Some(key) = env_key.filter(|key| !key.is_empty()) {
        return Ok(key);
    }
    if let Some(key) = file_key.filter(|key| !key.is_empty()) {
        return Ok(key.to_string());
    }
    bail!("GEMINI_API_KEY not found in environment. Export it or set gemini.api_key in errand.yml")
}
