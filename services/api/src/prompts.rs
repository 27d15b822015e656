//! services/api/src/prompts.rs
//!
//! Loads the improve prompt template from `PROMPTS_PATH/improve.json`.
//! Without that file the built-in German template is used.

use berichtsheft_core::{ImprovePrompt, PromptExample};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name looked up inside the prompts directory.
pub const IMPROVE_PROMPT_FILE: &str = "improve.json";

#[derive(Debug, thiserror::Error)]
pub enum PromptLoadError {
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    Parse(PathBuf, serde_json::Error),
    #[error("{0} has an empty system instruction")]
    EmptySystem(PathBuf),
}

#[derive(Deserialize)]
struct PromptFile {
    name: String,
    system: String,
    #[serde(default)]
    examples: Vec<PromptFileExample>,
}

#[derive(Deserialize)]
struct PromptFileExample {
    input: String,
    output: String,
}

impl PromptFile {
    fn into_prompt(self) -> ImprovePrompt {
        ImprovePrompt {
            name: self.name,
            system: self.system,
            examples: self
                .examples
                .into_iter()
                .map(|e| PromptExample::new(e.input, e.output))
                .collect(),
        }
    }
}

/// Returns the template from `dir`, or the default one if the file does not exist.
pub fn load_improve_prompt(dir: &Path) -> Result<ImprovePrompt, PromptLoadError> {
    let path = dir.join(IMPROVE_PROMPT_FILE);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ImprovePrompt::default()),
        Err(e) => return Err(PromptLoadError::Read(path, e)),
    };

    let file: PromptFile =
        serde_json::from_str(&raw).map_err(|e| PromptLoadError::Parse(path.clone(), e))?;
    if file.system.trim().is_empty() {
        return Err(PromptLoadError::EmptySystem(path));
    }
    Ok(file.into_prompt())
}
