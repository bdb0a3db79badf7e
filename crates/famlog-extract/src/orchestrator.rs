//! Extraction orchestrator: per-kind backend chains with sequential fallback.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use famlog_core::{
    defaults, BackendAdapter, BackendDescriptor, CredentialProvider, Error, ExtractionResult,
    ExtractionTask, MediaSource, TaskKind,
};

use crate::config::ExtractionConfig;
use crate::ocr::TesseractOcrAdapter;
use crate::speech::GeminiSpeechAdapter;
use crate::vision::ClaudeVisionAdapter;

/// Progress of one extraction call through its chain.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChainState<'a> {
    Pending,
    Attempting { index: usize, backend: &'a str },
    Succeeded { backend: &'a str },
    Exhausted,
}

impl fmt::Display for ChainState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Attempting { index, backend } => write!(f, "attempting({}:{})", index, backend),
            Self::Succeeded { backend } => write!(f, "succeeded({})", backend),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Availability of one chain entry, for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    pub kind: TaskKind,
    pub position: usize,
    pub descriptor: BackendDescriptor,
    pub available: bool,
}

/// Runs extraction tasks through ordered backend chains.
///
/// For each task the chain registered for its kind is tried in order. The
/// first successful result is returned unchanged; only a failed attempt moves
/// on to the next backend (confidence is never used for fallback). When every
/// backend fails the result is a `ChainExhausted` failure listing each
/// attempt's reason.
///
/// The orchestrator holds only read-only configuration and can be shared
/// across concurrent requests behind an `Arc`.
pub struct ExtractionOrchestrator {
    chains: HashMap<TaskKind, Vec<Arc<dyn BackendAdapter>>>,
    attempt_timeout: Duration,
}

impl ExtractionOrchestrator {
    /// Create an orchestrator with no chains.
    pub fn new() -> Self {
        Self {
            chains: HashMap::new(),
            attempt_timeout: Duration::from_secs(defaults::ATTEMPT_TIMEOUT_SECS),
        }
    }

    /// Build the standard chains:
    /// speech → [Gemini], vision → [Claude, Tesseract].
    ///
    /// Probes the local OCR engine once.
    pub async fn from_config(
        config: &ExtractionConfig,
        credentials: &dyn CredentialProvider,
        media: Arc<dyn MediaSource>,
    ) -> Self {
        let speech: Arc<dyn BackendAdapter> = Arc::new(GeminiSpeechAdapter::new(
            config.gemini.clone(),
            credentials,
            Arc::clone(&media),
        ));
        let vision: Arc<dyn BackendAdapter> = Arc::new(ClaudeVisionAdapter::new(
            config.claude.clone(),
            credentials,
            Arc::clone(&media),
        ));
        let ocr: Arc<dyn BackendAdapter> =
            Arc::new(TesseractOcrAdapter::from_config(&config.tesseract, media).await);

        Self::new()
            .with_chain(TaskKind::Speech, vec![speech])
            .with_chain(TaskKind::Vision, vec![vision, ocr])
            .with_attempt_timeout(config.attempt_timeout())
    }

    /// Register the chain for a task kind, replacing any existing one.
    pub fn with_chain(mut self, kind: TaskKind, chain: Vec<Arc<dyn BackendAdapter>>) -> Self {
        self.chains.insert(kind, chain);
        self
    }

    /// Set the upper bound for a single attempt.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// The chain configured for a task kind (empty if none).
    pub fn chain(&self, kind: TaskKind) -> &[Arc<dyn BackendAdapter>] {
        self.chains.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Report every chain entry with its availability.
    pub fn backend_status(&self) -> Vec<BackendStatus> {
        let mut status = Vec::new();
        for kind in [TaskKind::Speech, TaskKind::Vision] {
            for (position, adapter) in self.chain(kind).iter().enumerate() {
                status.push(BackendStatus {
                    kind,
                    position,
                    descriptor: adapter.descriptor().clone(),
                    available: adapter.is_available(),
                });
            }
        }
        status
    }

    /// Run one extraction. Always returns a result, never an error.
    pub async fn extract(&self, task: &ExtractionTask) -> ExtractionResult {
        let request_id = Uuid::now_v7();
        let span = info_span!("extract", %request_id, kind = %task.kind());
        self.run_chain(task).instrument(span).await
    }

    async fn run_chain(&self, task: &ExtractionTask) -> ExtractionResult {
        let chain = self.chain(task.kind());
        debug!(
            state = %ChainState::Pending,
            chain_len = chain.len(),
            hint = task.context_hint(),
            "Starting extraction"
        );

        if chain.is_empty() {
            error!("No backends configured for task kind");
            return ExtractionResult::failed(
                None,
                &Error::ChainExhausted(format!("no backends configured for {} tasks", task.kind())),
            );
        }

        let mut attempts: Vec<String> = Vec::with_capacity(chain.len());
        let mut last_backend: Option<String> = None;

        for (index, adapter) in chain.iter().enumerate() {
            let backend = adapter.id();
            debug!(
                state = %ChainState::Attempting { index, backend },
                nominal_confidence = adapter.descriptor().nominal_confidence,
                "Invoking backend"
            );

            let started = Instant::now();
            let result = match tokio::time::timeout(self.attempt_timeout, adapter.invoke(task)).await
            {
                Ok(result) => result,
                Err(_) => ExtractionResult::failure(
                    backend,
                    &timeout_error(adapter.descriptor(), self.attempt_timeout),
                ),
            };
            let duration_ms = started.elapsed().as_millis() as u64;

            if result.succeeded() {
                info!(
                    state = %ChainState::Succeeded { backend },
                    attempt = index + 1,
                    duration_ms,
                    confidence = result.confidence(),
                    "Extraction succeeded"
                );
                return result;
            }

            let kind = result
                .failure_kind()
                .map(|k| k.to_string())
                .unwrap_or_default();
            let reason = result.failure_reason().unwrap_or("unknown failure");
            warn!(
                backend,
                attempt = index + 1,
                duration_ms,
                failure = %kind,
                error = reason,
                "Backend attempt failed"
            );
            attempts.push(format!("{} ({}): {}", backend, kind, reason));
            last_backend = Some(result.backend_id().unwrap_or(backend).to_string());
        }

        error!(
            state = %ChainState::Exhausted,
            attempts = attempts.len(),
            "All backends failed"
        );
        ExtractionResult::failed(last_backend, &Error::ChainExhausted(attempts.join("; ")))
    }
}

/// Failure recorded for an attempt cut off by the attempt timeout.
///
/// Remote backends report it as a network failure; a local backend has no
/// network, so its timeout means the capability itself did not answer.
fn timeout_error(descriptor: &BackendDescriptor, timeout: Duration) -> Error {
    let reason = format!("attempt timed out after {}s", timeout.as_secs_f64());
    if descriptor.required_credential.is_some() {
        Error::NetworkFailure(reason)
    } else {
        Error::BackendUnavailable(reason)
    }
}

impl Default for ExtractionOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}
