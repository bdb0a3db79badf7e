//! Tolerant parsing of structured payloads embedded in model prose.
//!
//! Model backends are asked for a JSON object but often wrap it in
//! explanatory text ("Here is the result: {...} Thanks!"). The parser scans
//! for the outermost brace pair and decodes what it encloses. It does not
//! guarantee well-formedness: decode failures are reported as
//! `Error::ParseFailure` and the caller decides what to do with them.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Number, Value};
use tracing::debug;

use famlog_core::{Error, FieldMap, Result};

/// Decoded JSON object recovered from model output.
pub type JsonObject = Map<String, Value>;

static AMOUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d[\d,]*(?:\.\d+)?").expect("amount pattern is valid"));

/// Date layouts accepted from model output, normalized to `YYYY-MM-DD`.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d"];

/// Extract the JSON object embedded in `raw_text`.
///
/// Locates the first `{` and the last `}`. When both exist in that order the
/// enclosed substring is decoded; it must be an object containing every key
/// in `required_keys`.
///
/// # Examples
///
/// ```
/// use famlog_extract::parser::extract_structured;
///
/// let raw = r#"Here is the result: {"vendor":"Cafe","amount":4500} Thanks!"#;
/// let object = extract_structured(raw, &["vendor"]).unwrap();
/// assert_eq!(object["vendor"], "Cafe");
/// assert_eq!(object["amount"], 4500);
/// ```
pub fn extract_structured(raw_text: &str, required_keys: &[&str]) -> Result<JsonObject> {
    let candidate = object_span(raw_text).ok_or_else(|| {
        Error::ParseFailure("no JSON object found in model output".to_string())
    })?;
    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| Error::ParseFailure(format!("embedded JSON did not decode: {}", e)))?;

    let object = match value {
        Value::Object(object) => object,
        other => {
            return Err(Error::ParseFailure(format!(
                "embedded payload is not a JSON object: {}",
                json_type_name(&other)
            )))
        }
    };

    if let Some(missing) = required_keys.iter().find(|k| !object.contains_key(**k)) {
        return Err(Error::ParseFailure(format!(
            "embedded JSON is missing required key '{}'",
            missing
        )));
    }

    Ok(object)
}

/// The substring from the first `{` to the last `}`, if both exist in order.
pub fn object_span(raw_text: &str) -> Option<&str> {
    let start = raw_text.find('{')?;
    let end = raw_text.rfind('}')?;
    (start < end).then(|| &raw_text[start..=end])
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// How a remote value is normalized into a result field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    /// Non-empty string (numbers and booleans are stringified).
    Text,
    /// Number; numeric strings such as `"15,000원"` are converted.
    Amount,
    /// Calendar date, normalized to `YYYY-MM-DD`.
    Date,
}

/// Mapping from a remote JSON key to a result field name.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub remote_key: &'static str,
    pub field: &'static str,
    pub format: FieldFormat,
}

impl FieldSpec {
    pub const fn new(remote_key: &'static str, field: &'static str, format: FieldFormat) -> Self {
        Self {
            remote_key,
            field,
            format,
        }
    }
}

/// Build result fields from a decoded object.
///
/// Keys that are absent, `null`, empty or fail normalization are omitted.
pub fn map_fields(object: &JsonObject, specs: &[FieldSpec]) -> FieldMap {
    let mut fields = FieldMap::new();
    for spec in specs {
        let Some(raw) = object.get(spec.remote_key) else {
            continue;
        };
        let normalized = match spec.format {
            FieldFormat::Text => normalize_text(raw),
            FieldFormat::Amount => normalize_amount(raw),
            FieldFormat::Date => normalize_date(raw),
        };
        match normalized {
            Some(value) => {
                fields.insert(spec.field.to_string(), value);
            }
            None if !raw.is_null() => {
                debug!(key = spec.remote_key, value = %raw, "Dropping unusable field value");
            }
            None => {}
        }
    }
    fields
}

/// Read a self-reported confidence, if present and numeric.
pub fn read_confidence(object: &JsonObject) -> Option<f32> {
    match object.get("confidence")? {
        Value::Number(n) => n.as_f64().map(|v| v as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    }
}

/// Normalize a text value. Empty strings and nulls are dropped.
pub fn normalize_text(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| Value::String(trimmed.to_string()))
        }
        Value::Number(n) => Some(Value::String(n.to_string())),
        Value::Bool(b) => Some(Value::String(b.to_string())),
        _ => None,
    }
}

/// Normalize an amount to a JSON number.
///
/// Strings are scanned for the first number, ignoring thousands separators
/// and currency symbols: `"15,000원"` → `15000`, `"$12.50"` → `12.5`.
pub fn normalize_amount(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => {
            let matched = AMOUNT_PATTERN.find(s)?.as_str().replace(',', "");
            if matched.contains('.') {
                let parsed = matched.parse::<f64>().ok()?;
                Number::from_f64(parsed).map(Value::Number)
            } else {
                matched.parse::<i64>().ok().map(|n| Value::Number(n.into()))
            }
        }
        _ => None,
    }
}

/// Normalize a date string to `YYYY-MM-DD`. Unparseable dates are dropped.
pub fn normalize_date(value: &Value) -> Option<Value> {
    let s = value.as_str()?.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_plain_object() {
        let object = extract_structured(r#"{"vendor":"Cafe"}"#, &[]).unwrap();
        assert_eq!(object["vendor"], "Cafe");
    }

    #[test]
    fn test_extract_object_wrapped_in_prose() {
        let raw = "Here is the result: {\"vendor\":\"Cafe\",\"amount\":4500,\"confidence\":0.9} Thanks!";
        let object = extract_structured(raw, &["vendor"]).unwrap();
        assert_eq!(object["vendor"], "Cafe");
        assert_eq!(object["amount"], 4500);
        assert_eq!(object["confidence"], 0.9);
    }

    #[test]
    fn test_extract_object_in_markdown_fence() {
        let raw = "```json\n{\n  \"vendor\": \"맥도날드\",\n  \"nested\": {\"a\": 1}\n}\n```";
        let object = extract_structured(raw, &[]).unwrap();
        assert_eq!(object["vendor"], "맥도날드");
        assert_eq!(object["nested"]["a"], 1);
    }

    #[test]
    fn test_extract_no_braces() {
        let err = extract_structured("I could not read this receipt.", &[]).unwrap_err();
        assert!(matches!(err, Error::ParseFailure(_)));
    }

    #[test]
    fn test_extract_braces_in_wrong_order() {
        let err = extract_structured("} backwards {", &[]).unwrap_err();
        assert!(matches!(err, Error::ParseFailure(_)));
    }

    #[test]
    fn test_object_span() {
        assert_eq!(object_span(r#"ok {"a":1} bye"#), Some(r#"{"a":1}"#));
        assert_eq!(object_span("no object here"), None);
        assert_eq!(object_span("} {"), None);
    }

    #[test]
    fn test_extract_malformed_json_is_reported() {
        let err = extract_structured("result: {vendor: Cafe,} done", &[]).unwrap_err();
        match err {
            Error::ParseFailure(msg) => assert!(msg.contains("did not decode")),
            other => panic!("Expected ParseFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_two_objects_is_a_failure() {
        // The span from first '{' to last '}' covers both objects
        let err = extract_structured(r#"{"a":1} and {"b":2}"#, &[]).unwrap_err();
        assert!(matches!(err, Error::ParseFailure(_)));
    }

    #[test]
    fn test_extract_missing_required_key() {
        let err = extract_structured(r#"{"amount": 10}"#, &["vendor"]).unwrap_err();
        match err {
            Error::ParseFailure(msg) => assert!(msg.contains("vendor")),
            other => panic!("Expected ParseFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_amount() {
        assert_eq!(normalize_amount(&json!(4500)), Some(json!(4500)));
        assert_eq!(normalize_amount(&json!("15,000원")), Some(json!(15000)));
        assert_eq!(normalize_amount(&json!("$12.50")), Some(json!(12.5)));
        assert_eq!(normalize_amount(&json!("총 4,500 원")), Some(json!(4500)));
        assert_eq!(normalize_amount(&json!("unknown")), None);
        assert_eq!(normalize_amount(&Value::Null), None);
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date(&json!("2026-01-06")), Some(json!("2026-01-06")));
        assert_eq!(normalize_date(&json!("2026.01.06")), Some(json!("2026-01-06")));
        assert_eq!(normalize_date(&json!("2026/01/06")), Some(json!("2026-01-06")));
        assert_eq!(normalize_date(&json!("YYYY-MM-DD")), None);
        assert_eq!(normalize_date(&json!(20260106)), None);
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text(&json!("  Cafe ")), Some(json!("Cafe")));
        assert_eq!(normalize_text(&json!("")), None);
        assert_eq!(normalize_text(&json!(42)), Some(json!("42")));
        assert_eq!(normalize_text(&Value::Null), None);
    }

    #[test]
    fn test_read_confidence() {
        let object = extract_structured(r#"{"confidence": 0.9}"#, &[]).unwrap();
        assert_eq!(read_confidence(&object), Some(0.9));

        let object = extract_structured(r#"{"confidence": "0.7"}"#, &[]).unwrap();
        assert_eq!(read_confidence(&object), Some(0.7));

        let object = extract_structured(r#"{"vendor": "x"}"#, &[]).unwrap();
        assert_eq!(read_confidence(&object), None);
    }

    #[test]
    fn test_map_fields_renames_and_skips() {
        let object = extract_structured(
            r#"{"vendor":"Cafe","purchase_date":"2026-01-06","amount":"4,500","card_brand":null}"#,
            &[],
        )
        .unwrap();
        let specs = [
            FieldSpec::new("vendor", "vendor", FieldFormat::Text),
            FieldSpec::new("purchase_date", "date", FieldFormat::Date),
            FieldSpec::new("amount", "amount", FieldFormat::Amount),
            FieldSpec::new("card_brand", "cardBrand", FieldFormat::Text),
            FieldSpec::new("category", "category", FieldFormat::Text),
        ];

        let fields = map_fields(&object, &specs);
        assert_eq!(fields.len(), 3);
        assert_eq!(fields["vendor"], "Cafe");
        assert_eq!(fields["date"], "2026-01-06");
        assert_eq!(fields["amount"], 4500);
        assert!(!fields.contains_key("cardBrand"));
    }
}
