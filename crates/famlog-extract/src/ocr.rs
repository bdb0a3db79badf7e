//! Local OCR fallback: Tesseract text recognition.
//!
//! Used when the vision backend is unavailable or fails. Output is plain text
//! with a fixed low confidence; it never produces structured receipt fields.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use famlog_core::{
    defaults, BackendAdapter, BackendDescriptor, Error, ExtractionResult, ExtractionTask,
    FieldMap, MediaSource, Result, TaskKind,
};

use crate::config::TesseractConfig;

/// A local text recognizer.
///
/// Dropping a `recognize` future must stop the underlying work.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Engine name used in failure reasons.
    fn name(&self) -> &str;

    /// Probe whether the engine can run on this host.
    async fn is_installed(&self) -> bool;

    /// Recognize text in an image.
    async fn recognize(&self, image: &[u8], mime_type: &str) -> Result<String>;
}

/// Tesseract invoked through its command-line interface.
///
/// The child process is killed when the recognition future is dropped.
pub struct TesseractCli {
    binary: String,
    languages: String,
}

impl TesseractCli {
    pub fn new(config: &TesseractConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            languages: config.languages.clone(),
        }
    }
}

fn suffix_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/tiff" => ".tif",
        "image/bmp" => ".bmp",
        _ => ".jpg",
    }
}

#[async_trait]
impl OcrEngine for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn is_installed(&self) -> bool {
        match Command::new(&self.binary)
            .arg("--version")
            .kill_on_drop(true)
            .output()
            .await
        {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }

    async fn recognize(&self, image: &[u8], mime_type: &str) -> Result<String> {
        let mut tmpfile = tempfile::Builder::new()
            .prefix("famlog-ocr-")
            .suffix(suffix_for_mime(mime_type))
            .tempfile()
            .map_err(|e| Error::BackendUnavailable(format!("Failed to create temp file: {}", e)))?;
        tmpfile
            .write_all(image)
            .and_then(|_| tmpfile.flush())
            .map_err(|e| Error::BackendUnavailable(format!("Failed to write temp file: {}", e)))?;

        // tesseract INPUT stdout -l LANG -- writes recognized text to stdout
        let output = Command::new(&self.binary)
            .arg(tmpfile.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                Error::BackendUnavailable(format!("Failed to execute {}: {}", self.binary, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::BackendUnavailable(format!(
                "tesseract failed (exit {}): {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Fallback adapter running a local [`OcrEngine`].
///
/// The engine is probed once at construction. When it is missing the adapter
/// is permanently disabled and every call fails fast with
/// `BackendUnavailable`.
pub struct TesseractOcrAdapter {
    descriptor: BackendDescriptor,
    engine: Arc<dyn OcrEngine>,
    available: bool,
    media: Arc<dyn MediaSource>,
}

impl TesseractOcrAdapter {
    pub async fn new(engine: Arc<dyn OcrEngine>, media: Arc<dyn MediaSource>) -> Self {
        let available = engine.is_installed().await;
        if available {
            info!(engine = engine.name(), "Local OCR fallback available");
        } else {
            warn!(
                engine = engine.name(),
                "Local OCR engine not installed, fallback disabled"
            );
        }

        Self {
            descriptor: BackendDescriptor {
                id: defaults::OCR_BACKEND_ID.to_string(),
                required_credential: None,
                supported_kinds: vec![TaskKind::Vision],
                nominal_confidence: defaults::OCR_CONFIDENCE,
            },
            engine,
            available,
            media,
        }
    }

    /// Create with the Tesseract CLI engine.
    pub async fn from_config(config: &TesseractConfig, media: Arc<dyn MediaSource>) -> Self {
        Self::new(Arc::new(TesseractCli::new(config)), media).await
    }

    async fn recognize(&self, task: &ExtractionTask) -> Result<FieldMap> {
        if !self.available {
            return Err(Error::BackendUnavailable(format!(
                "{} is not installed",
                self.engine.name()
            )));
        }
        if task.kind() != TaskKind::Vision {
            return Err(Error::BackendUnavailable(format!(
                "{} handles vision tasks only",
                self.descriptor.id
            )));
        }

        let media = self.media.resolve(task.media_ref(), task.kind()).await?;
        debug!(
            engine = self.engine.name(),
            mime_type = %media.mime_type,
            size_bytes = media.bytes.len(),
            "Running local OCR"
        );

        let text = self.engine.recognize(&media.bytes, &media.mime_type).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::ParseFailure("no text recognized".to_string()));
        }

        let mut fields = FieldMap::new();
        fields.insert(
            "text".to_string(),
            serde_json::Value::String(text.to_string()),
        );
        Ok(fields)
    }
}

#[async_trait]
impl BackendAdapter for TesseractOcrAdapter {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn invoke(&self, task: &ExtractionTask) -> ExtractionResult {
        let started = Instant::now();
        match self.recognize(task).await {
            Ok(fields) => {
                info!(
                    backend = %self.descriptor.id,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Local OCR completed"
                );
                ExtractionResult::success(&self.descriptor.id, fields, defaults::OCR_CONFIDENCE)
            }
            Err(e) => {
                warn!(
                    backend = %self.descriptor.id,
                    duration_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "Local OCR failed"
                );
                ExtractionResult::failure(&self.descriptor.id, &e)
            }
        }
    }
}
