//! Command-line front end for the tokenmeter counting service
//!
//! Thin wrapper over the client crate: counts tokens for inline text or
//! a local file by calling a running tokenmeter API server.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use clap::{Parser, Subcommand};
use tokenmeter_client::{AVAILABLE_MODELS, CountApi, CountSummary, FileSubmission, HttpCountApi};
use tokenmeter_common::initialize_environment;
use tokenmeter_gateway::FileKind;
use tracing::debug;

/// tokenmeter - count tokens for text and files via the gateway API
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the tokenmeter API server
    #[arg(long, default_value = "http://localhost:3000")]
    api_url: String,

    /// Model to count against
    #[arg(short, long, default_value = AVAILABLE_MODELS[0])]
    model: String,

    /// Emit the raw JSON response instead of a summary line
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count tokens in a piece of text (reads stdin when omitted)
    Text {
        /// The text to count
        text: Option<String>,
    },
    /// Count tokens in a file (text, PDF, or image)
    File {
        /// Path to the file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    initialize_environment();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tokenmeter=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if !AVAILABLE_MODELS.contains(&args.model.as_str()) {
        anyhow::bail!(
            "Unknown model '{}'. Available: {}",
            args.model,
            AVAILABLE_MODELS.join(", ")
        );
    }

    let api = Arc::new(HttpCountApi::new(&args.api_url));
    debug!(api_url = %args.api_url, model = %args.model, "Dispatching count request");

    let summary = match args.command {
        Command::Text { text } => {
            let text = match text {
                Some(text) => text,
                None => {
                    let mut buffer = String::new();
                    std::io::Read::read_to_string(&mut std::io::stdin(), &mut buffer)
                        .map_err(|e| anyhow::anyhow!("Failed to read stdin: {e}"))?;
                    buffer
                }
            };
            api.count_text(&text, &args.model).await?
        }
        Command::File { path } => {
            let bytes = std::fs::read(&path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
            let file_name = path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
            let declared_kind = FileKind::classify(None, Some(&file_name));
            api.count_file(FileSubmission {
                bytes: Bytes::from(bytes),
                file_name,
                media_type: None,
                declared_kind,
                model: args.model.clone(),
            })
            .await?
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&render_json(&summary))?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn render_json(summary: &CountSummary) -> serde_json::Value {
    serde_json::json!({
        "input_tokens": summary.input_tokens,
        "chars": summary.chars,
        "fileChars": summary.file_chars,
        "model": summary.model,
        "gpt4oTokens": summary.gpt4o_tokens,
        "geminiTokens": summary.gemini_tokens,
        "fileName": summary.file_name,
    })
}

fn print_summary(summary: &CountSummary) {
    match summary.input_tokens {
        Some(tokens) => println!("{tokens} tokens ({})", summary.model),
        None => println!("0 tokens (empty input)"),
    }
    println!("  chars: {}", summary.chars);
    if let Some(name) = &summary.file_name {
        println!("  file: {name} ({} bytes)", summary.file_chars);
    }
    if let Some(estimate) = summary.gpt4o_tokens {
        println!("  gpt-4o estimate: {estimate}");
    }
    if let Some(estimate) = summary.gemini_tokens {
        println!("  gemini estimate: {estimate}");
    }
}
