use serde_json::Value;

use crate::errors::ExtractionError;
use crate::models::{ExtractedRecord, ExtractionSchema, Field, FieldType, FieldValue};
use crate::services::ai::retry::{with_retry, RetryPolicy};
use crate::services::ai::{LlmProvider, Message};

use super::json::{as_integer, parse_json_object};
use super::prompts;

/// Sends the raw description to the model and validates the reply against
/// `schema`. Fields the model could not infer are left absent.
pub async fn extract_fields(
    llm: &dyn LlmProvider,
    retry: &RetryPolicy,
    schema: &ExtractionSchema,
    raw: &str,
) -> Result<ExtractedRecord, ExtractionError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ExtractionError::Input("description is empty"));
    }

    let system = prompts::extraction_prompt(schema);
    let messages = [Message::user(raw)];

    let response = with_retry(retry, "field extraction", || llm.chat(&system, &messages))
        .await
        .map_err(|e| ExtractionError::Schema(format!("extraction service failed: {e}")))?;

    tracing::debug!(response = %response, "field extraction response");

    parse_extraction(schema, &response)
}

pub fn parse_extraction(
    schema: &ExtractionSchema,
    response: &str,
) -> Result<ExtractedRecord, ExtractionError> {
    let obj = parse_json_object(response).ok_or_else(|| {
        ExtractionError::Schema("extraction response is not a JSON object".to_string())
    })?;

    let mut record = ExtractedRecord::new();
    for (key, value) in &obj {
        let spec = Field::parse(key)
            .and_then(|f| schema.spec(f))
            .ok_or_else(|| ExtractionError::Schema(format!("unexpected field `{key}`")))?;

        if let Some(value) = coerce(spec.field, spec.kind, value)? {
            record.insert(spec.field, value);
        }
    }

    if let Some(missing) = schema.required_fields().find(|f| !record.contains(*f)) {
        return Err(ExtractionError::Schema(format!(
            "required field {missing} was not found"
        )));
    }

    Ok(record)
}

/// `Ok(None)` means the model sent an empty value, which counts as absent.
fn coerce(field: Field, kind: FieldType, value: &Value) -> Result<Option<FieldValue>, ExtractionError> {
    if value.is_null() {
        return Ok(None);
    }

    match kind {
        FieldType::String => match value {
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => Ok(Some(FieldValue::Text(s.trim().to_string()))),
            other => Err(ExtractionError::Schema(format!(
                "{field} should be a string, got {other}"
            ))),
        },
        FieldType::Integer => match as_integer(value) {
            Some(n) if n < 0 => Err(ExtractionError::Schema(format!(
                "{field} must not be negative"
            ))),
            Some(n) => Ok(Some(FieldValue::Integer(n))),
            None => Err(ExtractionError::Schema(format!(
                "{field} should be an integer, got {value}"
            ))),
        },
    }
}
