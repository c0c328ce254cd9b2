//! Ollama integration.

pub mod client;

pub use client::{OllamaClient, DEFAULT_HOST, DEFAULT_TIMEOUT_SECS};
