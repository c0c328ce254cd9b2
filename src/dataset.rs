//! Prompt corpus for the "random prompt" menu option.

use crate::error::ResourceError;
use rand::seq::SliceRandom;
use std::path::Path;

/// An ordered, read-only list of task descriptions loaded from CSV.
#[derive(Debug, Clone, Default)]
pub struct PromptDataset {
    prompts: Vec<String>,
}

impl PromptDataset {
    /// Load prompts from a CSV file with a `prompt` header column.
    pub fn load(path: &Path) -> Result<Self, ResourceError> {
        let mut reader =
            csv::Reader::from_path(path).map_err(|e| ResourceError::csv(path, e))?;

        let headers = reader
            .headers()
            .map_err(|e| ResourceError::csv(path, e))?
            .clone();
        let column = headers
            .iter()
            .position(|h| h.trim() == "prompt")
            .ok_or_else(|| ResourceError::MissingColumn {
                path: path.to_path_buf(),
                column: "prompt",
            })?;

        let mut prompts = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ResourceError::csv(path, e))?;
            if let Some(field) = record.get(column) {
                let prompt = field.trim();
                if !prompt.is_empty() {
                    prompts.push(prompt.to_string());
                }
            }
        }

        Ok(PromptDataset { prompts })
    }

    /// Pick one prompt uniformly at random, or `None` if the corpus is empty.
    pub fn pick_random(&self) -> Option<&str> {
        self.prompts
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}
