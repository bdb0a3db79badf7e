//! Centralized default constants for the famlog extraction pipeline.
//!
//! **This module is the single source of truth** for shared default values.
//! Adapters and configuration reference these constants instead of defining
//! their own magic numbers.

// =============================================================================
// BACKEND IDENTIFIERS
// =============================================================================

/// Backend id of the primary speech adapter (Gemini).
pub const SPEECH_BACKEND_ID: &str = "gemini-speech";

/// Backend id of the primary vision adapter (Claude).
pub const VISION_BACKEND_ID: &str = "claude-vision";

/// Backend id of the local OCR fallback adapter (Tesseract).
pub const OCR_BACKEND_ID: &str = "tesseract-ocr";

/// Credential name required by the speech adapter.
pub const GEMINI_CREDENTIAL: &str = "gemini";

/// Credential name required by the vision adapter.
pub const ANTHROPIC_CREDENTIAL: &str = "anthropic";

// =============================================================================
// CONFIDENCE
// =============================================================================

/// Confidence reported by the speech adapter when the remote omits one.
pub const SPEECH_DEFAULT_CONFIDENCE: f32 = 0.95;

/// Confidence reported by the vision adapter when the remote omits one.
pub const VISION_DEFAULT_CONFIDENCE: f32 = 0.95;

/// Fixed confidence of local OCR text (low-accuracy fallback).
pub const OCR_CONFIDENCE: f32 = 0.65;

// =============================================================================
// MEDIA
// =============================================================================

/// MIME type assumed for speech media with an unrecognized suffix.
pub const DEFAULT_AUDIO_MIME: &str = "audio/mpeg";

/// MIME type assumed for vision media with an unrecognized suffix.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Context hint used for speech tasks when the caller supplies none.
pub const DEFAULT_SPEECH_HINT: &str = "todo";

/// Context hint used for vision tasks when the caller supplies none.
pub const DEFAULT_VISION_HINT: &str = "receipt";

// =============================================================================
// GEMINI (SPEECH)
// =============================================================================

/// Default Gemini API base URL.
pub const GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

/// Default Gemini model for transcription.
pub const GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Timeout for transcription requests in seconds (long recordings).
pub const GEMINI_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// CLAUDE (VISION)
// =============================================================================

/// Default Anthropic API base URL.
pub const ANTHROPIC_URL: &str = "https://api.anthropic.com";

/// Default Claude model for receipt extraction.
pub const ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Anthropic API version header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Maximum tokens requested from the vision model.
pub const ANTHROPIC_MAX_TOKENS: u32 = 1024;

/// Timeout for vision requests in seconds.
pub const ANTHROPIC_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// TESSERACT (LOCAL OCR)
// =============================================================================

/// Tesseract binary looked up on PATH.
pub const TESSERACT_BIN: &str = "tesseract";

/// Tesseract language packs (Korean receipts with English fragments).
pub const TESSERACT_LANG: &str = "kor+eng";

// =============================================================================
// ORCHESTRATION
// =============================================================================

/// Upper bound for a single chain attempt in seconds.
///
/// Slightly above the slowest adapter timeout so the adapter's own timeout
/// normally fires first and reports a more specific reason.
pub const ATTEMPT_TIMEOUT_SECS: u64 = 150;

/// Maximum number of response body bytes quoted in a remote error reason.
pub const ERROR_BODY_PREVIEW: usize = 500;

// =============================================================================
// ENVIRONMENT VARIABLES
// =============================================================================

pub const ENV_GEMINI_API_KEY: &str = "GOOGLE_GEMINI_API_KEY";
pub const ENV_GEMINI_BASE_URL: &str = "GEMINI_BASE_URL";
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";
pub const ENV_GEMINI_TIMEOUT: &str = "GEMINI_TIMEOUT";

pub const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_ANTHROPIC_BASE_URL: &str = "ANTHROPIC_BASE_URL";
pub const ENV_ANTHROPIC_MODEL: &str = "ANTHROPIC_MODEL";
pub const ENV_ANTHROPIC_VERSION: &str = "ANTHROPIC_VERSION";
pub const ENV_ANTHROPIC_MAX_TOKENS: &str = "ANTHROPIC_MAX_TOKENS";
pub const ENV_ANTHROPIC_TIMEOUT: &str = "ANTHROPIC_TIMEOUT";

pub const ENV_TESSERACT_BIN: &str = "TESSERACT_BIN";
pub const ENV_TESSERACT_LANG: &str = "TESSERACT_LANG";

pub const ENV_ATTEMPT_TIMEOUT: &str = "EXTRACT_ATTEMPT_TIMEOUT";
