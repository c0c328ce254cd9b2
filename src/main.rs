//! patchgen: generate Pure Data patches with a local Ollama model.
//!
//! Interactive menu by default; `--prompt` runs a single request and exits.

use anyhow::{Context, Result};
use clap::Parser;
use patchgen::config::Config;
use patchgen::dataset::PromptDataset;
use patchgen::error::PipelineError;
use patchgen::llm::OllamaClient;
use patchgen::pipeline::{Pipeline, RunReport};
use patchgen::registry::SymbolRegistry;
use patchgen::storage::OutputStore;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "patchgen",
    about = "Generate and validate Pure Data patches with a local Ollama model",
    version
)]
struct Args {
    /// Generate one patch from this prompt and exit (skips the menu)
    #[arg(short, long)]
    prompt: Option<String>,

    /// Ollama model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Ollama host, e.g. http://127.0.0.1:11434
    #[arg(long)]
    host: Option<String>,

    /// CSV file with a `prompt` column (random prompt source)
    #[arg(long)]
    prompts: Option<PathBuf>,

    /// CSV file with an `objects` column (valid Pd object names)
    #[arg(long)]
    objects: Option<PathBuf>,

    /// Directory for extracted .pd patches
    #[arg(long)]
    patch_dir: Option<PathBuf>,

    /// Directory for raw generation transcripts
    #[arg(long)]
    transcript_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load();

    let model = args.model.unwrap_or_else(|| config.model.clone());
    let host = config.resolve_host(args.host.as_deref());
    let objects_csv = args.objects.unwrap_or_else(|| config.objects_csv.clone());
    let transcript_dir = args
        .transcript_dir
        .unwrap_or_else(|| config.transcript_dir.clone());
    let patch_dir = args.patch_dir.unwrap_or_else(|| config.patch_dir.clone());

    let registry = SymbolRegistry::load(&objects_csv)
        .with_context(|| format!("loading object whitelist from {}", objects_csv.display()))?;
    if registry.is_empty() {
        eprintln!(
            "  Warning: object whitelist {} is empty; every patch will validate as unknown.",
            objects_csv.display()
        );
    }
    let store = OutputStore::create(&transcript_dir, &patch_dir)
        .context("creating output directories")?;
    let client = OllamaClient::new(host, config.timeout_secs)?;
    let pipeline = Pipeline::new(registry, store, client, model);

    if let Some(task) = args.prompt {
        println!("Response:\n");
        let report = run_request(&pipeline, &task).await;
        return match report {
            Some(_) => Ok(()),
            None => Err(anyhow::anyhow!("generation failed")),
        };
    }

    let prompts_csv = args.prompts.unwrap_or_else(|| config.prompts_csv.clone());
    let prompts = PromptDataset::load(&prompts_csv)
        .with_context(|| format!("loading prompt corpus from {}", prompts_csv.display()))?;

    menu(&pipeline, &prompts).await
}

async fn menu(pipeline: &Pipeline, prompts: &PromptDataset) -> Result<()> {
    println!();
    println!("  ┌─────────────────────────────────────────────────────────┐");
    println!("  │  PATCHGEN · Pure Data patch generator                   │");
    println!("  └─────────────────────────────────────────────────────────┘");
    println!("  Model: {}  ·  Known objects: {}", pipeline.model(), pipeline.registry().len());

    loop {
        println!();
        println!("  1. Generate a patch");
        println!("  2. Generate a patch with a random prompt");
        println!("  3. Exit");
        println!();

        let choice = read_line("Enter your choice [1/2/3] (1): ")?;
        match choice.as_str() {
            "" | "1" => {
                let task = read_line("Enter a prompt to generate a Pure Data patch: ")?;
                if task.is_empty() {
                    eprintln!("  Nothing to generate from an empty prompt.");
                    continue;
                }
                println!("\nResponse:\n");
                run_request(pipeline, &task).await;
            }
            "2" => match prompts.pick_random() {
                Some(task) => {
                    let task = task.to_string();
                    println!("  Random prompt selected: {}", task);
                    println!("\nResponse:\n");
                    run_request(pipeline, &task).await;
                }
                None => eprintln!("  The prompt corpus is empty; nothing to pick from."),
            },
            "3" | "q" => {
                println!("  Exiting. Goodbye!");
                break;
            }
            other => eprintln!("  Unknown choice '{}'.", other),
        }
    }

    Ok(())
}

/// Run one request, streaming tokens to stdout as they arrive. Reports the
/// outcome and returns it; a failed generation never ends the session.
async fn run_request(pipeline: &Pipeline, task: &str) -> Option<RunReport> {
    let result = pipeline
        .run(task, |token| {
            print!("{token}");
            let _ = io::stdout().flush();
        })
        .await;
    println!();

    match result {
        Ok(report) => {
            print_report(&report);
            Some(report)
        }
        Err(PipelineError::Generation(err)) => {
            eprintln!("  Generation failed: {}", err);
            if !err.partial.is_empty() {
                eprintln!("  Partial output was kept in the transcript directory.");
            }
            None
        }
        Err(PipelineError::Resource(err)) => {
            eprintln!("  Could not persist outputs: {}", err);
            None
        }
    }
}

fn print_report(report: &RunReport) {
    println!(
        "\n  Decoded output saved as '{}'",
        report.transcript_path.display()
    );
    match &report.artifact {
        None => println!("  No patch found in the response."),
        Some(artifact) => {
            println!("  Patch saved as '{}'", artifact.path.display());
            if artifact.is_valid() {
                println!("  All referenced objects are valid.");
            } else {
                let unknown: Vec<&str> =
                    artifact.unknown.iter().map(String::as_str).collect();
                println!(
                    "  Unknown objects: {} (retry recommended)",
                    unknown.join(", ")
                );
            }
        }
    }
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
