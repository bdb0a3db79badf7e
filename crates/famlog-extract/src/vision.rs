//! Primary vision backend: Claude receipt extraction.

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

use crate::config::ClaudeConfig;
use crate::http::{ensure_success, malformed_body, network_failure};
use crate::parser::{extract_structured, map_fields, read_confidence, FieldFormat, FieldSpec};

/// Fixed receipt extraction instruction.
const RECEIPT_PROMPT: &str = r#"이 영수증에서 다음 정보를 JSON 형식으로 추출해줘:
{
    "vendor": "상호명",
    "purchase_date": "YYYY-MM-DD",
    "amount": 숫자,
    "currency": "KRW",
    "payment_type": "cash|card|mobile",
    "card_brand": "카드명",
    "category": "음식|교통|쇼핑|의료|기타",
    "confidence": 0.95
}"#;

/// Remote receipt keys and the result fields they populate.
const RECEIPT_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("vendor", "vendor", FieldFormat::Text),
    FieldSpec::new("amount", "amount", FieldFormat::Amount),
    FieldSpec::new("purchase_date", "date", FieldFormat::Date),
    FieldSpec::new("payment_type", "paymentType", FieldFormat::Text),
    FieldSpec::new("card_brand", "cardBrand", FieldFormat::Text),
    FieldSpec::new("category", "category", FieldFormat::Text),
    FieldSpec::new("currency", "currency", FieldFormat::Text),
];

/// Claude-based receipt reader.
///
/// The reply is free-form text that may hold the requested JSON object in
/// surrounding prose. When no object can be recovered the attempt fails with
/// `ParseFailure`; no substitute values are produced.
pub struct ClaudeVisionAdapter {
    descriptor: BackendDescriptor,
    api_key: Option<String>,
    config: ClaudeConfig,
    client: reqwest::Client,
    media: Arc<dyn MediaSource>,
}

impl ClaudeVisionAdapter {
    /// Create the adapter. The credential is read once, here.
    pub fn new(
        config: ClaudeConfig,
        credentials: &dyn CredentialProvider,
        media: Arc<dyn MediaSource>,
    ) -> Self {
        let api_key = credentials.get_credential(defaults::ANTHROPIC_CREDENTIAL);
        if api_key.is_none() {
            warn!(
                backend = defaults::VISION_BACKEND_ID,
                "Anthropic API key not configured, vision extraction disabled"
            );
        }

        Self {
            descriptor: BackendDescriptor {
                id: defaults::VISION_BACKEND_ID.to_string(),
                required_credential: Some(defaults::ANTHROPIC_CREDENTIAL.to_string()),
                supported_kinds: vec![TaskKind::Vision],
                nominal_confidence: defaults::VISION_DEFAULT_CONFIDENCE,
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

    async fn read_receipt(&self, task: &ExtractionTask) -> Result<(FieldMap, f32)> {
        if task.kind() != TaskKind::Vision {
            return Err(Error::BackendUnavailable(format!(
                "{} handles vision tasks only",
                self.descriptor.id
            )));
        }

        let api_key = self.api_key.as_deref().ok_or_else(|| {
            Error::CredentialMissing(format!(
                "{} requires the '{}' credential",
                self.descriptor.id,
                defaults::ANTHROPIC_CREDENTIAL
            ))
        })?;

        let media = self.media.resolve(task.media_ref(), task.kind()).await?;
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(&media.bytes);

        let request = MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            source_type: "base64",
                            media_type: media.mime_type.clone(),
                            data: image_b64,
                        },
                    },
                    ContentBlock::Text {
                        text: RECEIPT_PROMPT.to_string(),
                    },
                ],
            }],
        };

        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        debug!(
            model = %self.config.model,
            mime_type = %media.mime_type,
            size_bytes = media.bytes.len(),
            "Sending image to Claude"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&request)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await
            .map_err(|e| network_failure("Anthropic", e))?;

        let response = ensure_success(response, "Anthropic").await?;
        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| malformed_body("Anthropic", e))?;

        let text = body.first_text().ok_or_else(|| {
            Error::RemoteError("Anthropic response contained no text block".to_string())
        })?;

        interpret_receipt(&text)
    }
}

/// Turn the model reply into receipt fields and a confidence.
fn interpret_receipt(raw: &str) -> Result<(FieldMap, f32)> {
    let object = extract_structured(raw, &[])?;
    let fields = map_fields(&object, RECEIPT_FIELDS);
    if fields.is_empty() {
        return Err(Error::ParseFailure(
            "model output contained no receipt fields".to_string(),
        ));
    }
    let confidence = read_confidence(&object).unwrap_or(defaults::VISION_DEFAULT_CONFIDENCE);
    Ok((fields, confidence))
}

#[async_trait]
impl BackendAdapter for ClaudeVisionAdapter {
    fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn invoke(&self, task: &ExtractionTask) -> ExtractionResult {
        let started = Instant::now();
        match self.read_receipt(task).await {
            Ok((fields, confidence)) => {
                info!(
                    backend = %self.descriptor.id,
                    duration_ms = started.elapsed().as_millis() as u64,
                    field_count = fields.len(),
                    confidence,
                    "Receipt extraction completed"
                );
                ExtractionResult::success(&self.descriptor.id, fields, confidence)
            }
            Err(e) => {
                warn!(
                    backend = %self.descriptor.id,
                    duration_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "Receipt extraction failed"
                );
                ExtractionResult::failure(&self.descriptor.id, &e)
            }
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentBlock {
    Image { source: ImageSource },
    Text { text: String },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: String,
    data: String, // base64 encoded
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

impl MessagesResponse {
    fn first_text(self) -> Option<String> {
        self.content
            .into_iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentials;
    use crate::media::InMemoryMediaSource;
    use famlog_core::FailureKind;
    use serde_json::json;

    fn adapter(credentials: StaticCredentials) -> ClaudeVisionAdapter {
        ClaudeVisionAdapter::new(
            ClaudeConfig::default(),
            &credentials,
            Arc::new(InMemoryMediaSource::new()),
        )
    }

    #[test]
    fn test_descriptor() {
        let adapter = adapter(StaticCredentials::new());
        assert_eq!(adapter.id(), "claude-vision");
        assert_eq!(
            adapter.descriptor().required_credential.as_deref(),
            Some("anthropic")
        );
        assert!(adapter.descriptor().supports(TaskKind::Vision));
        assert_eq!(adapter.model_name(), "claude-3-5-sonnet-20241022");
    }

    #[test]
    fn test_prompt_requests_all_receipt_keys() {
        for key in [
            "vendor",
            "purchase_date",
            "amount",
            "currency",
            "payment_type",
            "card_brand",
            "category",
            "confidence",
        ] {
            assert!(RECEIPT_PROMPT.contains(key), "prompt should request {}", key);
        }
    }

    #[test]
    fn test_interpret_receipt_in_prose() {
        let raw = "Here is the result: {\"vendor\":\"Cafe\",\"amount\":4500,\"confidence\":0.9} Thanks!";
        let (fields, confidence) = interpret_receipt(raw).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["vendor"], "Cafe");
        assert_eq!(fields["amount"], 4500);
        assert_eq!(confidence, 0.9);
    }

    #[test]
    fn test_interpret_receipt_maps_keys() {
        let raw = r#"{
            "vendor": "맥도날드",
            "purchase_date": "2026-01-06",
            "amount": 15000,
            "currency": "KRW",
            "payment_type": "card",
            "card_brand": "국민카드",
            "category": "음식"
        }"#;
        let (fields, confidence) = interpret_receipt(raw).unwrap();
        assert_eq!(fields["date"], "2026-01-06");
        assert_eq!(fields["paymentType"], "card");
        assert_eq!(fields["cardBrand"], "국민카드");
        assert_eq!(fields["currency"], "KRW");
        assert!(!fields.contains_key("purchase_date"));
        assert_eq!(confidence, 0.95);
    }

    #[test]
    fn test_interpret_receipt_without_json_fails() {
        let err = interpret_receipt("Sorry, the image is too blurry to read.").unwrap_err();
        assert!(matches!(err, Error::ParseFailure(_)));
    }

    #[test]
    fn test_interpret_receipt_with_unrelated_json_fails() {
        let err = interpret_receipt(r#"{"error": "unreadable"}"#).unwrap_err();
        assert!(matches!(err, Error::ParseFailure(_)));
    }

    #[test]
    fn test_request_serialization() {
        let request = MessagesRequest {
            model: "claude".to_string(),
            max_tokens: 1024,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            source_type: "base64",
                            media_type: "image/png".to_string(),
                            data: "base64data".to_string(),
                        },
                    },
                    ContentBlock::Text {
                        text: "read".to_string(),
                    },
                ],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        let content = &json["messages"][0]["content"];
        assert_eq!(json["max_tokens"], 1024);
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[0]["source"]["type"], "base64");
        assert_eq!(content[0]["source"]["media_type"], "image/png");
        assert_eq!(content[1]["type"], "text");
        assert_eq!(content[1]["text"], "read");
    }

    #[test]
    fn test_response_first_text() {
        let body = json!({
            "id": "msg_1",
            "type": "message",
            "content": [{"type": "text", "text": "{\"vendor\": \"Cafe\"}"}],
            "stop_reason": "end_turn"
        });
        let response: MessagesResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.first_text().as_deref(), Some("{\"vendor\": \"Cafe\"}"));
    }

    #[tokio::test]
    async fn test_invoke_without_credential() {
        let task = ExtractionTask::new(TaskKind::Vision, "receipt.jpg", "receipt");
        let result = adapter(StaticCredentials::new()).invoke(&task).await;
        assert!(!result.succeeded());
        assert!(result.fields().is_empty());
        assert_eq!(result.failure_kind(), Some(FailureKind::CredentialMissing));
        assert_eq!(result.backend_id(), Some("claude-vision"));
    }

    #[tokio::test]
    async fn test_invoke_rejects_speech_task() {
        let task = ExtractionTask::new(TaskKind::Speech, "memo.mp3", "todo");
        let result = adapter(StaticCredentials::new().with("anthropic", "key"))
            .invoke(&task)
            .await;
        assert_eq!(result.failure_kind(), Some(FailureKind::BackendUnavailable));
    }
}
