//! Primary speech backend: Gemini transcription of voice recordings.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use famlog_core::{
    defaults, BackendAdapter, BackendDescriptor, CredentialProvider, Error, ExtractionResult,
    ExtractionTask, FieldMap, MediaSource, Result, TaskKind,
};

use crate::config::GeminiConfig;
use crate::http::{ensure_success, malformed_body, network_failure};
use crate::parser::{
    extract_structured, map_fields, object_span, read_confidence, FieldFormat, FieldSpec,
};

/// Fields read from the transcription reply.
const SPEECH_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("text", "text", FieldFormat::Text),
    FieldSpec::new("date", "date", FieldFormat::Date),
    FieldSpec::new("time", "time", FieldFormat::Text),
    FieldSpec::new("amount", "amount", FieldFormat::Amount),
    FieldSpec::new("category", "category", FieldFormat::Text),
];

/// Gemini-based speech adapter.
///
/// Sends the recording inline (base64) with an instruction that asks for the
/// transcript plus any date, time, amount and category mentioned. A reply that
/// carries no JSON object is still a transcript and becomes `{text}`.
pub struct GeminiSpeechAdapter {
    descriptor: BackendDescriptor,
    api_key: Option<String>,
    config: GeminiConfig,
    client: reqwest::Client,
    media: Arc<dyn MediaSource>,
}

impl GeminiSpeechAdapter {
    /// Create the adapter. The credential is read once, here.
    pub fn new(
        config: GeminiConfig,
        credentials: &dyn CredentialProvider,
        media: Arc<dyn MediaSource>,
    ) -> Self {
        let api_key = credentials.get_credential(defaults::GEMINI_CREDENTIAL);
        if api_key.is_none() {
            warn!(
                backend = defaults::SPEECH_BACKEND_ID,
                "Google Gemini API key not configured, speech extraction disabled"
            );
        }

        Self {
            descriptor: BackendDescriptor {
                id: defaults::SPEECH_BACKEND_ID.to_string(),
                required_credential: Some(defaults::GEMINI_CREDENTIAL.to_string()),
                supported_kinds: vec![TaskKind::Speech],
                nominal_confidence: defaults::SPEECH_DEFAULT_CONFIDENCE,
            },
            api_key,
            config,
            client: reqwest::Client::new(),
            media,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    async fn transcribe(&self, task: &ExtractionTask) -> Result<(FieldMap, f32)> {
        if task.kind() != TaskKind::Speech {
            return Err(Error::BackendUnavailable(format!(
                "{} handles speech tasks only",
                self.descriptor.id
            )));
        }

        let api_key = self.api_key.as_deref().ok_or_else(|| {
            Error::CredentialMissing(format!(
                "{} requires the '{}' credential",
                self.descriptor.id,
                defaults::GEMINI_CREDENTIAL
            ))
        })?;

        let media = self.media.resolve(task.media_ref(), task.kind()).await?;
        let audio_b64 = base64::engine::general_purpose::STANDARD.encode(&media.bytes);

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::inline(media.mime_type.clone(), audio_b64),
                    Part::text(speech_prompt(task.context_hint())),
                ],
            }],
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        debug!(
            model = %self.config.model,
            mime_type = %media.mime_type,
            size_bytes = media.bytes.len(),
            hint = task.context_hint(),
            "Sending audio to Gemini"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await
            .map_err(|e| network_failure("Gemini", e))?;

        let response = ensure_success(response, "Gemini").await?;
        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| malformed_body("Gemini", e))?;

        let text = body.into_text();
        if text.trim().is_empty() {
            return Err(Error::RemoteError(
                "Gemini returned no transcript".to_string(),
            ));
        }

        interpret_transcript(&text)
    }
}

/// Turn the model reply into speech fields and a confidence.
///
/// A reply with no `{...}` span is a bare transcript. Once a span is present
/// it must decode to an object carrying `text`, otherwise the reply is
/// malformed.
fn interpret_transcript(raw: &str) -> Result<(FieldMap, f32)> {
    if object_span(raw).is_none() {
        debug!("No structured payload in transcript, using raw text");
        let mut fields = FieldMap::new();
        fields.insert(
            "text".to_string(),
            serde_json::Value::String(raw.trim().to_string()),
        );
        return Ok((fields, defaults::SPEECH_DEFAULT_CONFIDENCE));
    }

    let object = extract_structured(raw, &["text"])?;
    let fields = map_fields(&object, SPEECH_FIELDS);
    if !fields.contains_key("text") {
        return Err(Error::RemoteError(
            "Gemini returned an empty transcript".to_string(),
        ));
    }
    let confidence = read_confidence(&object).unwrap_or(defaults::SPEECH_DEFAULT_CONFIDENCE);
    Ok((fields, confidence))
}

fn speech_prompt(context_hint: &str) -> String {
    format!(
        "Transcribe this voice recording. The speaker is describing a {hint}. \
         Reply with a single JSON object and nothing else:\n\
         {{\n  \"text\": \"full transcript\",\n  \"date\": \"YYYY-MM-DD or null\",\n  \
         \"time\": \"HH:MM or null\",\n  \"amount\": number or null,\n  \
         \"category\": \"음식|교통|쇼핑|의료|기타 or null\",\n  \"confidence\": 0.0-1.0\n}}",
        hint = context_hint
    )
}

#[async_trait]
impl BackendAdapter for GeminiSpeechAdapter {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn invoke(&self, task: &ExtractionTask) -> ExtractionResult {
        let started = Instant::now();
        match self.transcribe(task).await {
            Ok((fields, confidence)) => {
                info!(
                    backend = %self.descriptor.id,
                    duration_ms = started.elapsed().as_millis() as u64,
                    field_count = fields.len(),
                    confidence,
                    "Speech extraction completed"
                );
                ExtractionResult::success(&self.descriptor.id, fields, confidence)
            }
            Err(e) => {
                warn!(
                    backend = %self.descriptor.id,
                    duration_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "Speech extraction failed"
                );
                ExtractionResult::failure(&self.descriptor.id, &e)
            }
        }
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Default)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }

    fn inline(mime_type: String, data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData { mime_type, data }),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct InlineData {
    mime_type: String,
    data: String, // base64 encoded
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}
