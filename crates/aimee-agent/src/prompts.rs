//! Prompt loading from external markdown files.
//!
//! AImee's persona lives in `aimee_system_prompt.md` under the prompt
//! directory. Edit that file, not code, to change how the agent behaves.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Filename of the agent's main system prompt.
pub const SYSTEM_PROMPT_FILE: &str = "aimee_system_prompt.md";

/// Errors that can occur when loading a prompt file.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt file not found: {0}")]
    NotFound(PathBuf),

    #[error("prompt file is empty: {0}")]
    Empty(PathBuf),

    #[error("failed to read prompt file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Loads agent prompts from a base directory.
#[derive(Debug, Clone)]
pub struct PromptLoader {
    base_dir: PathBuf,
}

impl PromptLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// The agent's main system prompt, trimmed of surrounding whitespace.
    pub fn system_prompt(&self) -> Result<String, PromptError> {
        self.load(SYSTEM_PROMPT_FILE)
    }

    /// Startup check that every required prompt file is present and
    /// non-empty.
    pub fn validate(&self) -> bool {
        match self.system_prompt() {
            Ok(_) => {
                tracing::info!("all prompt files validated");
                true
            }
            Err(e) => {
                tracing::error!("prompt validation failed: {}", e);
                false
            }
        }
    }

    fn load(&self, filename: &str) -> Result<String, PromptError> {
        let path = self.base_dir.join(filename);
        if !path.exists() {
            return Err(PromptError::NotFound(path));
        }

        let content = std::fs::read_to_string(&path).map_err(|source| PromptError::Read {
            path: path.clone(),
            source,
        })?;

        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(PromptError::Empty(path));
        }

        tracing::info!(file = filename, "loaded prompt");
        Ok(content)
    }
}
