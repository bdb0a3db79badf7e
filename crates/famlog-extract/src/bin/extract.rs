//! famlog-extract: run one extraction from the command line.
//!
//! Resolves a local media file, runs it through the configured backend chain
//! and prints the result as JSON.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use famlog_extract::{
    EnvCredentials, ExtractionConfig, ExtractionOrchestrator, ExtractionTask, FsMediaSource,
    TaskKind,
};

#[derive(Parser)]
#[command(name = "famlog-extract")]
#[command(author, version, about = "Extract structured data from voice memos and receipts")]
struct Cli {
    /// Task kind: speech (voice memo) or vision (receipt photo)
    kind: TaskKind,

    /// Media file to extract from
    path: PathBuf,

    /// Context hint passed to the backend (default: todo / receipt)
    #[arg(long)]
    hint: Option<String>,

    /// Directory relative media paths are resolved against
    #[arg(long, env = "MEDIA_ROOT")]
    root: Option<PathBuf>,

    /// Per-attempt timeout in seconds (overrides EXTRACT_ATTEMPT_TIMEOUT)
    #[arg(long)]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors
    //   RUST_LOG    - standard env filter (default: "famlog_extract=info")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "famlog_extract=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    // Stdout carries the result, so console logs go to stderr
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("famlog-extract.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    let mut config = ExtractionConfig::from_env();
    if let Some(secs) = cli.timeout {
        config.attempt_timeout_secs = secs;
    }
    config.validate().context("invalid extraction configuration")?;

    let media = match cli.root {
        Some(ref root) => FsMediaSource::with_root(root),
        None => FsMediaSource::new(),
    };
    let orchestrator =
        ExtractionOrchestrator::from_config(&config, &EnvCredentials, Arc::new(media)).await;

    for status in orchestrator.backend_status() {
        info!(
            kind = %status.kind,
            position = status.position,
            backend = %status.descriptor.id,
            available = status.available,
            "Backend configured"
        );
    }

    let media_ref = cli
        .path
        .to_str()
        .context("media path is not valid UTF-8")?
        .to_string();
    let task = match cli.hint {
        Some(hint) => ExtractionTask::new(cli.kind, media_ref, hint),
        None => ExtractionTask::with_default_hint(cli.kind, media_ref),
    };

    let result = orchestrator.extract(&task).await;
    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("failed to serialize result")?
    );

    Ok(if result.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
