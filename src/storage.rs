//! Persistence of transcripts and extracted patches.
//!
//! Every generation request gets a random hex identifier; the raw transcript
//! goes to `decoded_output_<id>.txt` and, when a patch was extracted, the
//! patch itself to `generated_patch_<id>.pd` under a sibling directory.

use crate::error::ResourceError;
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};

/// 8 hex chars = 32 bits of entropy; collisions across a session are not a
/// practical concern.
const ID_LENGTH: usize = 8;

const HEX_DIGITS: &[u8] = b"0123456789abcdef";

#[derive(Debug, Clone)]
pub struct OutputStore {
    transcript_dir: PathBuf,
    patch_dir: PathBuf,
}

impl OutputStore {
    /// Ensure both output directories exist.
    pub fn create(transcript_dir: &Path, patch_dir: &Path) -> Result<Self, ResourceError> {
        fs::create_dir_all(transcript_dir)
            .map_err(|e| ResourceError::io(transcript_dir, e))?;
        fs::create_dir_all(patch_dir).map_err(|e| ResourceError::io(patch_dir, e))?;
        Ok(OutputStore {
            transcript_dir: transcript_dir.to_path_buf(),
            patch_dir: patch_dir.to_path_buf(),
        })
    }

    /// Random lowercase hex identifier pairing a transcript with its patch.
    pub fn new_id() -> String {
        let mut rng = rand::thread_rng();
        (0..ID_LENGTH)
            .map(|_| HEX_DIGITS[rng.gen_range(0..HEX_DIGITS.len())] as char)
            .collect()
    }

    /// Write the full transcript, prefixed with its originating prompt.
    pub fn write_transcript(
        &self,
        id: &str,
        prompt: &str,
        text: &str,
    ) -> Result<PathBuf, ResourceError> {
        let path = self.transcript_dir.join(format!("decoded_output_{id}.txt"));
        fs::write(&path, format!("Prompt: {prompt}\n\n{text}"))
            .map_err(|e| ResourceError::io(&path, e))?;
        Ok(path)
    }

    /// Write an extracted patch; called only when extraction produced one.
    pub fn write_patch(&self, id: &str, patch: &str) -> Result<PathBuf, ResourceError> {
        let path = self.patch_dir.join(format!("generated_patch_{id}.pd"));
        fs::write(&path, patch).map_err(|e| ResourceError::io(&path, e))?;
        Ok(path)
    }
}
