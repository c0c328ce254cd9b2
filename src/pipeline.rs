//! The generate → extract → validate pipeline.
//!
//! One `Pipeline` value carries everything a request needs (registry, output
//! store, client, model), so there is no hidden process-wide state. Requests
//! run one at a time; a failed request reports and leaves the session alive.

use crate::error::PipelineError;
use crate::extract;
use crate::llm::OllamaClient;
use crate::prompt;
use crate::registry::SymbolRegistry;
use crate::storage::OutputStore;
use crate::validate;
use std::collections::BTreeSet;
use std::path::PathBuf;

pub struct Pipeline {
    registry: SymbolRegistry,
    store: OutputStore,
    client: OllamaClient,
    model: String,
}

/// What one request produced.
#[derive(Debug)]
pub struct RunReport {
    pub id: String,
    pub transcript_path: PathBuf,
    /// Present only when the response contained a complete fenced block.
    pub artifact: Option<ArtifactReport>,
}

#[derive(Debug)]
pub struct ArtifactReport {
    pub path: PathBuf,
    /// Declared objects missing from the registry; empty means the patch is
    /// structurally valid.
    pub unknown: BTreeSet<String>,
}

impl ArtifactReport {
    pub fn is_valid(&self) -> bool {
        self.unknown.is_empty()
    }
}

impl Pipeline {
    pub fn new(
        registry: SymbolRegistry,
        store: OutputStore,
        client: OllamaClient,
        model: impl Into<String>,
    ) -> Self {
        Pipeline {
            registry,
            store,
            client,
            model: model.into(),
        }
    }

    pub fn registry(&self) -> &SymbolRegistry {
        &self.registry
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one request end to end.
    ///
    /// The transcript is on disk before this returns, including on
    /// generation failure, where whatever partial text arrived is persisted
    /// best-effort before the error propagates.
    pub async fn run<F>(&self, task: &str, observer: F) -> Result<RunReport, PipelineError>
    where
        F: FnMut(&str),
    {
        let formatted = prompt::format_alpaca(prompt::PATCH_INSTRUCTION, task);
        let id = OutputStore::new_id();

        let text = match self
            .client
            .generate_streaming(&self.model, &formatted, observer)
            .await
        {
            Ok(text) => text,
            Err(err) => {
                if !err.partial.is_empty() {
                    if let Err(write_err) = self.store.write_transcript(&id, task, &err.partial) {
                        eprintln!(
                            "  Warning: failed to persist partial transcript: {}",
                            write_err
                        );
                    }
                }
                return Err(err.into());
            }
        };

        let transcript_path = self.store.write_transcript(&id, task, &text)?;

        let artifact = match extract::extract_patch(&text) {
            Some(patch) => {
                let path = self.store.write_patch(&id, &patch)?;
                let unknown = validate::validate(&patch, &self.registry);
                Some(ArtifactReport { path, unknown })
            }
            None => None,
        };

        Ok(RunReport {
            id,
            transcript_path,
            artifact,
        })
    }

    /// Validate an already-extracted patch against this pipeline's registry.
    pub fn validate_patch(&self, patch: &str) -> BTreeSet<String> {
        validate::validate(patch, &self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::DEFAULT_HOST;
    use tempfile::TempDir;

    fn pipeline(tmp: &TempDir) -> Pipeline {
        let registry: SymbolRegistry =
            ["osc~", "dac~"].into_iter().map(String::from).collect();
        let store = OutputStore::create(
            &tmp.path().join("decoded-outputs"),
            &tmp.path().join("patches"),
        )
        .unwrap();
        let client = OllamaClient::new(DEFAULT_HOST, 1).unwrap();
        Pipeline::new(registry, store, client, "patch-gen-4b")
    }

    #[test]
    fn test_validate_patch_uses_registry() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline(&tmp);
        let unknown = pipeline.validate_patch("#X obj 0 0 osc~ 440;\n#X obj 0 30 foo~;");
        assert_eq!(unknown.into_iter().collect::<Vec<_>>(), vec!["foo~"]);
    }

    fn pipeline_at(tmp: &TempDir, host: String) -> Pipeline {
        let registry: SymbolRegistry = ["osc~", "dac~", "print"]
            .into_iter()
            .map(String::from)
            .collect();
        let store = OutputStore::create(
            &tmp.path().join("decoded-outputs"),
            &tmp.path().join("patches"),
        )
        .unwrap();
        let client = OllamaClient::new(host, 30).unwrap();
        Pipeline::new(registry, store, client, "patch-gen-4b")
    }

    #[tokio::test]
    async fn test_run_extracts_validates_and_persists() {
        use crate::llm::client::stub;

        let lines = [
            r##"{"response":"Here is the patch:\n```\n","done":false}"##,
            r##"{"response":"#N canvas 0 0 450 300 12;\n#X obj 50 50 osc~ 440;\n","done":false}"##,
            r##"{"response":"#X obj 50 120 foo~;\n```\n","done":true}"##,
        ];
        let tmp = TempDir::new().unwrap();
        let host = stub::serve_once(lines.join("\n") + "\n").await;
        let pipeline = pipeline_at(&tmp, host);

        let report = pipeline.run("a 440 Hz sine", |_| {}).await.unwrap();

        let transcript = std::fs::read_to_string(&report.transcript_path).unwrap();
        assert!(transcript.starts_with("Prompt: a 440 Hz sine\n\n"));

        let artifact = report.artifact.expect("fenced block should be extracted");
        assert!(!artifact.is_valid());
        assert_eq!(
            artifact.unknown.iter().cloned().collect::<Vec<_>>(),
            vec!["foo~"]
        );
        let patch = std::fs::read_to_string(&artifact.path).unwrap();
        assert!(patch.starts_with("#N canvas"));
        assert!(!patch.contains("```"));
    }

    #[tokio::test]
    async fn test_run_without_fences_writes_no_patch() {
        use crate::llm::client::stub;

        let body = r#"{"response":"I could not produce a patch for that.","done":true}"#;
        let tmp = TempDir::new().unwrap();
        let host = stub::serve_once(format!("{body}\n")).await;
        let pipeline = pipeline_at(&tmp, host);

        let report = pipeline.run("something odd", |_| {}).await.unwrap();
        assert!(report.artifact.is_none());

        let patches: Vec<_> = std::fs::read_dir(tmp.path().join("patches"))
            .unwrap()
            .collect();
        assert!(patches.is_empty());
        assert!(report.transcript_path.exists());
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_generation_error() {
        let tmp = TempDir::new().unwrap();
        let registry = SymbolRegistry::default();
        let store = OutputStore::create(
            &tmp.path().join("decoded-outputs"),
            &tmp.path().join("patches"),
        )
        .unwrap();
        // Port 9 (discard) is about as unreachable as it gets locally.
        let client = OllamaClient::new("http://127.0.0.1:9", 1).unwrap();
        let pipeline = Pipeline::new(registry, store, client, "patch-gen-4b");

        let result = pipeline.run("a sine", |_| {}).await;
        assert!(matches!(result, Err(PipelineError::Generation(_))));
        // Nothing arrived, so nothing was persisted.
        let entries: Vec<_> = std::fs::read_dir(tmp.path().join("decoded-outputs"))
            .unwrap()
            .collect();
        assert!(entries.is_empty());
    }
}
