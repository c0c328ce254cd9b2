//! Configuration management for patchgen
//!
//! Stores settings in ~/.config/patchgen/config.json. CLI flags override the
//! file; `OLLAMA_HOST` overrides the configured host.

use crate::llm::{DEFAULT_HOST, DEFAULT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Ollama model used for patch generation.
    pub model: String,
    /// Base URL of the Ollama server.
    pub ollama_host: String,
    /// Whole-request deadline in seconds.
    pub timeout_secs: u64,
    /// Directory for raw generation transcripts.
    pub transcript_dir: PathBuf,
    /// Directory for extracted .pd patches.
    pub patch_dir: PathBuf,
    /// CSV with a `prompt` column, used by the random-prompt menu option.
    pub prompts_csv: PathBuf,
    /// CSV with an `objects` column of valid Pd object names.
    pub objects_csv: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            model: "patch-gen-4b".to_string(),
            ollama_host: DEFAULT_HOST.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            transcript_dir: PathBuf::from("decoded-outputs"),
            patch_dir: PathBuf::from("Generated-Patches"),
            prompts_csv: PathBuf::from("patch-gen-dataset-v0.8.7_prompts.csv"),
            objects_csv: PathBuf::from("pd-objects.csv"),
        }
    }
}

impl Config {
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("patchgen"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from disk, or return defaults.
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            if let Ok(content) = fs::read_to_string(&path) {
                match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(err) => {
                        preserve_corrupt_config(&path, &content);
                        eprintln!(
                            "  Warning: Config file was corrupted ({}). A backup was saved and defaults were loaded.",
                            err
                        );
                    }
                }
            }
        }
        Self::default()
    }

    /// Save config to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        let dir = Self::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        fs::create_dir_all(&dir)?;
        let path = dir.join("config.json");
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Resolve the Ollama host: CLI flag, then `OLLAMA_HOST`, then config.
    pub fn resolve_host(&self, cli_host: Option<&str>) -> String {
        if let Some(host) = cli_host {
            return host.to_string();
        }
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            let host = host.trim();
            if !host.is_empty() {
                return host.to_string();
            }
        }
        self.ollama_host.clone()
    }

    /// Get the config file location for display.
    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/patchgen/config.json".to_string())
    }
}

fn preserve_corrupt_config(path: &std::path::Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}
