use chrono::NaiveDate;

use crate::errors::NormalizationError;
use crate::models::NormalizedDate;
use crate::services::ai::retry::{with_retry, RetryPolicy};
use crate::services::ai::{LlmProvider, Message};

use super::json::{documented_integers, parse_json_object};
use super::prompts;

/// Resolves a free-text date ("tonight", "7/30", "next Friday") relative to
/// `reference`. ISO dates are accepted as-is without a model call.
pub async fn normalize_date(
    llm: &dyn LlmProvider,
    retry: &RetryPolicy,
    expression: &str,
    reference: NaiveDate,
) -> Result<NormalizedDate, NormalizationError> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Err(NormalizationError::Empty);
    }
    if let Ok(date) = NaiveDate::parse_from_str(expression, "%Y-%m-%d") {
        return Ok(date.into());
    }

    let system = prompts::date_prompt(reference);
    let messages = [Message::user(prompts::date_request(expression))];

    let response = with_retry(retry, "date normalization", || llm.chat(&system, &messages))
        .await
        .map_err(|e| NormalizationError::Service(e.to_string()))?;

    let date = parse_date_response(&response)?;
    tracing::debug!(expression, %reference, %date, "normalized date");
    Ok(date)
}

pub fn parse_date_response(response: &str) -> Result<NormalizedDate, NormalizationError> {
    let obj = parse_json_object(response)
        .ok_or_else(|| NormalizationError::Malformed(response.trim().to_string()))?;

    let [year, month, day] = documented_integers(&obj, ["year", "month", "day"])?;

    let out_of_range = || NormalizationError::OutOfRange(format!("{year}-{month}-{day}"));
    let year = i32::try_from(year).map_err(|_| out_of_range())?;
    let month = u32::try_from(month).map_err(|_| out_of_range())?;
    let day = u32::try_from(day).map_err(|_| out_of_range())?;

    NormalizedDate::new(year, month, day).ok_or_else(out_of_range)
}
