//! Streaming client for a local Ollama server.
//!
//! `/api/generate` answers with newline-delimited JSON; each line carries a
//! `response` text fragment and a `done` flag. End of stream is the body
//! running dry, not a sentinel. The consumer appends fragments in arrival
//! order and hands each one to an observer before reading the next, so a
//! human operator sees progress on long generations.

use crate::error::{GenerationError, GenerationErrorKind};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const DEFAULT_HOST: &str = "http://127.0.0.1:11434";

/// Whole-request deadline; local models can take minutes on long patches.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    /// Ollama reports model-side failures as an inline field, still status 200.
    #[serde(default)]
    error: Option<String>,
}

pub struct OllamaClient {
    host: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(host: impl Into<String>, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;
        Ok(OllamaClient {
            host: host.into(),
            client,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Stream one generation to completion, returning the accumulated text.
    ///
    /// The observer is called once per increment, in arrival order, before
    /// the next chunk is read. On any failure the returned error carries the
    /// text accumulated so far.
    pub async fn generate_streaming<F>(
        &self,
        model: &str,
        prompt: &str,
        mut observer: F,
    ) -> Result<String, GenerationError>
    where
        F: FnMut(&str),
    {
        let url = format!("{}/api/generate", self.host.trim_end_matches('/'));
        let request = GenerateRequest {
            model,
            prompt,
            stream: true,
        };
        let started = Instant::now();

        let send = self.client.post(&url).json(&request).send();
        let response = match tokio::time::timeout(self.timeout, send).await {
            Err(_) => return Err(deadline_expired(self.timeout, String::new())),
            Ok(Err(e)) => {
                return Err(GenerationError::new(
                    GenerationErrorKind::Connect,
                    format!("could not reach Ollama at {}: {}", self.host, e),
                    String::new(),
                ));
            }
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::new(
                GenerationErrorKind::Status(status.as_u16()),
                format!("Ollama returned {}: {}", status, body.trim()),
                String::new(),
            ));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut accumulated = String::new();
        let mut done = false;

        'read: loop {
            let Some(remaining) = self.timeout.checked_sub(started.elapsed()) else {
                return Err(deadline_expired(self.timeout, accumulated));
            };
            let next = match tokio::time::timeout(remaining, stream.next()).await {
                Ok(next) => next,
                Err(_) => return Err(deadline_expired(self.timeout, accumulated)),
            };
            let Some(chunk) = next else {
                break;
            };

            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(err) => {
                    return Err(GenerationError::new(
                        GenerationErrorKind::Stream,
                        format!("stream read failed: {err}"),
                        accumulated,
                    ));
                }
            };
            buffer.push_str(&String::from_utf8_lossy(&bytes));

            while let Some(pos) = buffer.find('\n') {
                let line = buffer[..pos].trim().to_string();
                buffer.drain(..=pos);
                if line.is_empty() {
                    continue;
                }
                if apply_line(&line, &mut accumulated, &mut observer)? {
                    done = true;
                    break 'read;
                }
            }
        }

        // A final chunk without a trailing newline still counts.
        if !done {
            let line = buffer.trim().to_string();
            if !line.is_empty() {
                apply_line(&line, &mut accumulated, &mut observer)?;
            }
        }

        Ok(accumulated)
    }
}

fn deadline_expired(timeout: Duration, partial: String) -> GenerationError {
    GenerationError::new(
        GenerationErrorKind::Timeout,
        format!("generation exceeded {}s deadline", timeout.as_secs()),
        partial,
    )
}

/// Parse one NDJSON line, append its fragment, and forward it. Returns true
/// when the server marked the generation finished.
fn apply_line<F>(
    line: &str,
    accumulated: &mut String,
    observer: &mut F,
) -> Result<bool, GenerationError>
where
    F: FnMut(&str),
{
    let chunk: GenerateChunk = serde_json::from_str(line).map_err(|e| {
        GenerationError::new(
            GenerationErrorKind::Stream,
            format!("malformed stream line: {e}"),
            accumulated.clone(),
        )
    })?;

    if let Some(message) = chunk.error {
        return Err(GenerationError::new(
            GenerationErrorKind::Stream,
            format!("generation aborted by server: {message}"),
            accumulated.clone(),
        ));
    }

    if !chunk.response.is_empty() {
        accumulated.push_str(&chunk.response);
        observer(&chunk.response);
    }

    Ok(chunk.done)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn collect(lines: &[&str]) -> Result<(String, Vec<String>), GenerationError> {
        let mut accumulated = String::new();
        let mut seen = Vec::new();
        for line in lines {
            let done = apply_line(line, &mut accumulated, &mut |part: &str| {
                seen.push(part.to_string())
            })?;
            if done {
                break;
            }
        }
        Ok((accumulated, seen))
    }

    #[test]
    fn test_increments_accumulate_in_order() {
        let (text, seen) = collect(&[
            r##"{"response":"#X obj ","done":false}"##,
            r#"{"response":"10 10 ","done":false}"#,
            r#"{"response":"osc~ 440;","done":true}"#,
        ])
        .unwrap();
        assert_eq!(text, "#X obj 10 10 osc~ 440;");
        assert_eq!(seen, vec!["#X obj ", "10 10 ", "osc~ 440;"]);
    }

    #[test]
    fn test_done_stops_consumption() {
        let (text, _) = collect(&[
            r#"{"response":"first","done":true}"#,
            r#"{"response":"ignored","done":false}"#,
        ])
        .unwrap();
        assert_eq!(text, "first");
    }

    #[test]
    fn test_server_error_keeps_partial() {
        let err = collect(&[
            r#"{"response":"partial ","done":false}"#,
            r#"{"error":"model not found"}"#,
        ])
        .unwrap_err();
        assert_eq!(err.kind, GenerationErrorKind::Stream);
        assert_eq!(err.partial, "partial ");
    }

    #[test]
    fn test_malformed_line_keeps_partial() {
        let err = collect(&[
            r#"{"response":"kept","done":false}"#,
            "not json at all",
        ])
        .unwrap_err();
        assert_eq!(err.kind, GenerationErrorKind::Stream);
        assert_eq!(err.partial, "kept");
    }

    #[test]
    fn test_empty_fragment_is_not_forwarded() {
        let (text, seen) = collect(&[r#"{"response":"","done":true}"#]).unwrap();
        assert!(text.is_empty());
        assert!(seen.is_empty());
    }

    #[tokio::test]
    async fn test_generate_streaming_against_stub_server() {
        let lines = [
            r##"{"response":"Sure:\n```\n","done":false}"##,
            r##"{"response":"#N canvas 0 0 450 300 12;\n","done":false}"##,
            r##"{"response":"#X obj 50 50 osc~ 440;\n","done":false}"##,
            r##"{"response":"```\n","done":true}"##,
        ];
        let host = super::stub::serve_once(lines.join("\n") + "\n").await;

        let client = OllamaClient::new(host, 30).unwrap();
        let mut seen = Vec::new();
        let text = client
            .generate_streaming("patch-gen-4b", "a 440 Hz sine", |part| {
                seen.push(part.to_string())
            })
            .await
            .unwrap();

        assert_eq!(text, seen.concat());
        assert!(text.contains("#X obj 50 50 osc~ 440;"));
        assert_eq!(seen.len(), 4);
    }

    #[tokio::test]
    async fn test_stalled_stream_times_out() {
        use tokio::io::AsyncWriteExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            // Headers only, then silence.
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-type: application/x-ndjson\r\n\r\n")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let client = OllamaClient::new(format!("http://{}", addr), 1).unwrap();
        let err = client
            .generate_streaming("patch-gen-4b", "a sine", |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.kind, GenerationErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_connect_failure_has_no_partial() {
        let client = OllamaClient::new("http://127.0.0.1:9", 5).unwrap();
        let err = client
            .generate_streaming("patch-gen-4b", "anything", |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.kind, GenerationErrorKind::Connect);
        assert!(err.partial.is_empty());
    }
}
