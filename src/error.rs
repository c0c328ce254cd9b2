//! Error taxonomy for the generation pipeline.
//!
//! `ResourceError` covers unreadable or malformed inputs and failed writes;
//! it is fatal at startup and per-file during a run. `GenerationError` covers
//! the Ollama stream and always carries whatever text had been accumulated so
//! the caller can persist it. A missing fenced block or an unknown object set
//! are ordinary values, not errors.

use std::path::PathBuf;

/// A tabular source or output location could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read CSV {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("column '{column}' not found in {}", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },
}

impl ResourceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ResourceError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        ResourceError::Csv {
            path: path.into(),
            source,
        }
    }
}

/// What went wrong while consuming the generation stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    /// The server could not be reached at all.
    Connect,
    /// The server answered with a non-success status.
    Status(u16),
    /// The stream broke or produced something unreadable mid-flight.
    Stream,
    /// The request deadline expired before the stream finished.
    Timeout,
}

/// A generation request failed.
///
/// `partial` holds every increment that arrived before the failure. Callers
/// persist it best-effort so no generation work is silently lost.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct GenerationError {
    pub kind: GenerationErrorKind,
    pub message: String,
    pub partial: String,
}

impl GenerationError {
    pub(crate) fn new(
        kind: GenerationErrorKind,
        message: impl Into<String>,
        partial: String,
    ) -> Self {
        GenerationError {
            kind,
            message: message.into(),
            partial,
        }
    }
}

/// Either failure mode of a single pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}
