//! Value objects exchanged between the orchestrator, adapters and callers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, FailureKind};

/// Extracted fields keyed by field name.
///
/// Ordered so that equal extractions compare and serialize identically.
pub type FieldMap = BTreeMap<String, serde_json::Value>;

/// Kind of media an extraction task carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Voice recording to transcribe and interpret.
    Speech,
    /// Photographed document (receipt) to read.
    Vision,
}

impl TaskKind {
    /// Context hint used when the caller does not supply one.
    pub fn default_hint(&self) -> &'static str {
        match self {
            Self::Speech => defaults::DEFAULT_SPEECH_HINT,
            Self::Vision => defaults::DEFAULT_VISION_HINT,
        }
    }

    /// MIME type assumed when a media suffix is not recognized.
    pub fn default_mime(&self) -> &'static str {
        match self {
            Self::Speech => defaults::DEFAULT_AUDIO_MIME,
            Self::Vision => defaults::DEFAULT_IMAGE_MIME,
        }
    }

    /// Top-level MIME type (`audio` / `image`) this kind accepts.
    pub fn mime_family(&self) -> &'static str {
        match self {
            Self::Speech => "audio",
            Self::Vision => "image",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Speech => write!(f, "speech"),
            Self::Vision => write!(f, "vision"),
        }
    }
}

impl FromStr for TaskKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "speech" | "voice" | "audio" => Ok(Self::Speech),
            "vision" | "image" | "receipt" => Ok(Self::Vision),
            _ => Err(Error::Config(format!("Unknown task kind: {}", s))),
        }
    }
}

/// A single extraction request. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionTask {
    kind: TaskKind,
    media_ref: String,
    context_hint: String,
}

impl ExtractionTask {
    pub fn new(kind: TaskKind, media_ref: impl Into<String>, context_hint: impl Into<String>) -> Self {
        Self {
            kind,
            media_ref: media_ref.into(),
            context_hint: context_hint.into(),
        }
    }

    /// Build a task using the kind's default context hint.
    pub fn with_default_hint(kind: TaskKind, media_ref: impl Into<String>) -> Self {
        Self::new(kind, media_ref, kind.default_hint())
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn media_ref(&self) -> &str {
        &self.media_ref
    }

    pub fn context_hint(&self) -> &str {
        &self.context_hint
    }
}

/// Canonical outcome of any backend attempt or orchestrated extraction.
///
/// A result is either a success (fields plus a confidence in `[0, 1]`) or a
/// failure (kind plus reason, no fields). The two constructors are the only
/// way to build one, so a failure can never carry partial fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    succeeded: bool,
    fields: FieldMap,
    confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    backend_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_reason: Option<String>,
}

impl ExtractionResult {
    /// A successful extraction. Confidence is clamped into `[0, 1]`.
    pub fn success(backend_id: impl Into<String>, fields: FieldMap, confidence: f32) -> Self {
        Self {
            succeeded: true,
            fields,
            confidence: clamp_confidence(confidence),
            backend_id: Some(backend_id.into()),
            failure_kind: None,
            failure_reason: None,
        }
    }

    /// A failed attempt by one backend.
    pub fn failure(backend_id: impl Into<String>, error: &Error) -> Self {
        Self::failed(Some(backend_id.into()), error)
    }

    /// A failed result, optionally attributed to a backend.
    pub fn failed(backend_id: Option<String>, error: &Error) -> Self {
        Self {
            succeeded: false,
            fields: FieldMap::new(),
            confidence: 0.0,
            backend_id,
            failure_kind: Some(error.kind()),
            failure_reason: Some(error.to_string()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Look up a single extracted field.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }

    pub fn into_fields(self) -> FieldMap {
        self.fields
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn backend_id(&self) -> Option<&str> {
        self.backend_id.as_deref()
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure_kind
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }
}

fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Static description of a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    /// Identifier reported as `backend_id` on results.
    pub id: String,
    /// Credential name the backend needs; `None` for local backends.
    pub required_credential: Option<String>,
    /// Task kinds the backend can handle.
    pub supported_kinds: Vec<TaskKind>,
    /// Prior expectation of result quality, for telemetry only.
    pub nominal_confidence: f32,
}

impl BackendDescriptor {
    pub fn supports(&self, kind: TaskKind) -> bool {
        self.supported_kinds.contains(&kind)
    }
}

/// Media bytes resolved from a reference, with the derived content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_kind_from_str() {
        assert_eq!("speech".parse::<TaskKind>().unwrap(), TaskKind::Speech);
        assert_eq!("Vision".parse::<TaskKind>().unwrap(), TaskKind::Vision);
        assert_eq!("receipt".parse::<TaskKind>().unwrap(), TaskKind::Vision);
        assert!("video".parse::<TaskKind>().is_err());
    }

    #[test]
    fn test_task_kind_serialization() {
        assert_eq!(serde_json::to_value(TaskKind::Speech).unwrap(), "speech");
        let kind: TaskKind = serde_json::from_str("\"vision\"").unwrap();
        assert_eq!(kind, TaskKind::Vision);
    }

    #[test]
    fn test_task_kind_defaults() {
        assert_eq!(TaskKind::Speech.default_mime(), "audio/mpeg");
        assert_eq!(TaskKind::Vision.default_mime(), "image/jpeg");
        assert_eq!(TaskKind::Speech.default_hint(), "todo");
        assert_eq!(TaskKind::Vision.default_hint(), "receipt");
    }

    #[test]
    fn test_task_accessors() {
        let task = ExtractionTask::new(TaskKind::Speech, "voice.mp3", "event");
        assert_eq!(task.kind(), TaskKind::Speech);
        assert_eq!(task.media_ref(), "voice.mp3");
        assert_eq!(task.context_hint(), "event");

        let task = ExtractionTask::with_default_hint(TaskKind::Vision, "receipt.jpg");
        assert_eq!(task.context_hint(), "receipt");
    }

    #[test]
    fn test_success_result() {
        let mut fields = FieldMap::new();
        fields.insert("vendor".to_string(), json!("Cafe"));
        let result = ExtractionResult::success("claude-vision", fields, 0.9);

        assert!(result.succeeded());
        assert_eq!(result.field("vendor"), Some(&json!("Cafe")));
        assert_eq!(result.confidence(), 0.9);
        assert_eq!(result.backend_id(), Some("claude-vision"));
        assert!(result.failure_kind().is_none());
        assert!(result.failure_reason().is_none());
    }

    #[test]
    fn test_success_clamps_confidence() {
        let high = ExtractionResult::success("b", FieldMap::new(), 1.7);
        assert_eq!(high.confidence(), 1.0);
        let low = ExtractionResult::success("b", FieldMap::new(), -0.2);
        assert_eq!(low.confidence(), 0.0);
        let nan = ExtractionResult::success("b", FieldMap::new(), f32::NAN);
        assert_eq!(nan.confidence(), 0.0);
    }

    #[test]
    fn test_failure_result_has_no_fields() {
        let err = Error::CredentialMissing("anthropic".to_string());
        let result = ExtractionResult::failure("claude-vision", &err);

        assert!(!result.succeeded());
        assert!(result.fields().is_empty());
        assert_eq!(result.confidence(), 0.0);
        assert_eq!(result.failure_kind(), Some(FailureKind::CredentialMissing));
        assert_eq!(
            result.failure_reason(),
            Some("Credential missing: anthropic")
        );
    }

    #[test]
    fn test_failed_without_backend() {
        let err = Error::ChainExhausted("no backends configured".to_string());
        let result = ExtractionResult::failed(None, &err);
        assert!(result.backend_id().is_none());
        assert_eq!(result.failure_kind(), Some(FailureKind::ChainExhausted));
    }

    #[test]
    fn test_result_serialization_skips_absent_failure() {
        let result = ExtractionResult::success("gemini-speech", FieldMap::new(), 0.95);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["succeeded"], true);
        assert_eq!(json["backend_id"], "gemini-speech");
        assert!(json.get("failure_reason").is_none());
        assert!(json.get("failure_kind").is_none());
    }

    #[test]
    fn test_descriptor_supports() {
        let descriptor = BackendDescriptor {
            id: "tesseract-ocr".to_string(),
            required_credential: None,
            supported_kinds: vec![TaskKind::Vision],
            nominal_confidence: 0.65,
        };
        assert!(descriptor.supports(TaskKind::Vision));
        assert!(!descriptor.supports(TaskKind::Speech));
    }
}
