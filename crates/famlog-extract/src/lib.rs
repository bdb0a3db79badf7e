//! # famlog-extract
//!
//! AI extraction pipeline for famlog.
//!
//! This crate provides:
//! - Media sources resolving references to bytes and a MIME type
//! - Gemini speech adapter (voice memo → transcript / structured fields)
//! - Claude vision adapter (receipt photo → vendor, amount, date, payment
//!   type, card brand, category, currency)
//! - Tesseract OCR fallback for receipts when the vision backend fails
//! - Tolerant JSON recovery and field normalization for model output
//! - An orchestrator running ordered backend chains with fallback
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use famlog_extract::{
//!     EnvCredentials, ExtractionConfig, ExtractionOrchestrator, ExtractionTask,
//!     FsMediaSource, TaskKind,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let orchestrator = ExtractionOrchestrator::from_config(
//!         &ExtractionConfig::from_env(),
//!         &EnvCredentials,
//!         Arc::new(FsMediaSource::new()),
//!     )
//!     .await;
//!     let task = ExtractionTask::new(TaskKind::Vision, "receipt.jpg", "receipt");
//!     let result = orchestrator.extract(&task).await;
//!     println!("{:?}", result.fields());
//! }
//! ```

pub mod config;
pub mod credentials;
pub mod media;
pub mod ocr;
pub mod orchestrator;
pub mod parser;
pub mod speech;
pub mod vision;

mod http;

// Re-export core types
pub use famlog_core::*;

pub use config::{ClaudeConfig, ExtractionConfig, GeminiConfig, TesseractConfig};
pub use credentials::{EnvCredentials, StaticCredentials};
pub use media::{detect_mime, mime_from_suffix, FsMediaSource, InMemoryMediaSource};
pub use ocr::{OcrEngine, TesseractCli, TesseractOcrAdapter};
pub use orchestrator::{BackendStatus, ExtractionOrchestrator};
pub use parser::extract_structured;
pub use speech::GeminiSpeechAdapter;
pub use vision::ClaudeVisionAdapter;
