use crate::errors::NormalizationError;
use crate::models::NormalizedTime;
use crate::services::ai::retry::{with_retry, RetryPolicy};
use crate::services::ai::{LlmProvider, Message};

use super::json::{documented_integers, parse_json_object};
use super::prompts;

/// Converts a free-text time ("7 PM", "half past eight", "noon") to a
/// 24-hour clock time.
pub async fn normalize_time(
    llm: &dyn LlmProvider,
    retry: &RetryPolicy,
    expression: &str,
) -> Result<NormalizedTime, NormalizationError> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Err(NormalizationError::Empty);
    }
    if let Some(time) = parse_24h(expression) {
        return Ok(time);
    }

    let messages = [Message::user(prompts::time_request(expression))];
    let response = with_retry(retry, "time normalization", || {
        llm.chat(prompts::time_prompt(), &messages)
    })
    .await
    .map_err(|e| NormalizationError::Service(e.to_string()))?;

    let time = parse_time_response(&response)?;
    tracing::debug!(expression, %time, "normalized time");
    Ok(time)
}

pub fn parse_time_response(response: &str) -> Result<NormalizedTime, NormalizationError> {
    let obj = parse_json_object(response)
        .ok_or_else(|| NormalizationError::Malformed(response.trim().to_string()))?;

    let [hour, minute] = documented_integers(&obj, ["hour", "minute"])?;

    let out_of_range = || NormalizationError::OutOfRange(format!("{hour}:{minute}"));
    let hour = u32::try_from(hour).map_err(|_| out_of_range())?;
    let minute = u32::try_from(minute).map_err(|_| out_of_range())?;

    NormalizedTime::new(hour, minute).ok_or_else(out_of_range)
}

/// Strict `HH:MM`; anything shorter ("7:00") is ambiguous about AM/PM.
fn parse_24h(expression: &str) -> Option<NormalizedTime> {
    let (h, m) = expression.split_once(':')?;
    if h.len() != 2 || m.len() != 2 {
        return None;
    }
    if !h.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    NormalizedTime::new(h.parse().ok()?, m.parse().ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::services::ai::LlmError;

    struct FixedLlm {
        reply: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for FixedLlm {
        async fn chat(&self, _system: &str, _messages: &[Message]) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.to_string())
        }
    }

    fn llm(reply: &'static str) -> FixedLlm {
        FixedLlm {
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    fn retry() -> RetryPolicy {
        RetryPolicy::new(2, Duration::ZERO)
    }

    #[test]
    fn test_parse_evening_time() {
        let time = parse_time_response(r#"{"hour": 19, "minute": 0}"#).unwrap();
        assert_eq!(time, NormalizedTime { hour: 19, minute: 0 });
    }

    #[test]
    fn test_error_key_ignored_when_time_complete() {
        let time = parse_time_response(r#"{"hour": 19, "minute": 0, "error": ""}"#).unwrap();
        assert_eq!(time, NormalizedTime { hour: 19, minute: 0 });
    }

    #[test]
    fn test_reported_error_when_keys_missing() {
        assert_eq!(
            parse_time_response(r#"{"error": "whenever is not a time"}"#),
            Err(NormalizationError::Unrecognized("whenever is not a time".to_string()))
        );
    }

    #[test]
    fn test_hour_out_of_range_fails() {
        assert!(matches!(
            parse_time_response(r#"{"hour": 24, "minute": 0}"#),
            Err(NormalizationError::OutOfRange(_))
        ));
        assert!(matches!(
            parse_time_response(r#"{"hour": -1, "minute": 0}"#),
            Err(NormalizationError::OutOfRange(_))
        ));
        assert!(matches!(
            parse_time_response(r#"{"hour": 7, "minute": 75}"#),
            Err(NormalizationError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_garbled_response_fails() {
        assert!(matches!(
            parse_time_response("sometime after dinner"),
            Err(NormalizationError::Malformed(_))
        ));
        assert_eq!(
            parse_time_response(r#"{"hour": 8}"#),
            Err(NormalizationError::MissingKey("minute"))
        );
    }

    #[test]
    fn test_parse_24h_is_strict() {
        assert_eq!(parse_24h("19:00"), NormalizedTime::new(19, 0));
        assert_eq!(parse_24h("00:30"), NormalizedTime::new(0, 30));
        assert_eq!(parse_24h("7:00"), None);
        assert_eq!(parse_24h("25:00"), None);
        assert_eq!(parse_24h("7 PM"), None);
    }

    #[tokio::test]
    async fn test_pm_time_via_model() {
        let llm = llm(r#"{"hour": 19, "minute": 0}"#);
        let time = normalize_time(&llm, &retry(), "7 PM").await.unwrap();
        assert_eq!(time.hour, 19);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_midnight_via_model() {
        let llm = llm(r#"{"hour": 0, "minute": 0}"#);
        let time = normalize_time(&llm, &retry(), "midnight").await.unwrap();
        assert_eq!(time, NormalizedTime { hour: 0, minute: 0 });
    }

    #[tokio::test]
    async fn test_24h_time_skips_model() {
        let llm = llm("{}");
        let time = normalize_time(&llm, &retry(), " 21:15 ").await.unwrap();
        assert_eq!(time.to_string(), "21:15");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }
}
