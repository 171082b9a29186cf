use std::env;
use std::time::Duration;

use chrono::NaiveDate;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub llm_provider: String,
    pub ollama_url: String,
    pub extraction: ExtractionConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            port: lookup("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| "louru.db".to_string()),
            llm_provider: lookup("LLM_PROVIDER").unwrap_or_else(|| "openai".to_string()),
            ollama_url: lookup("OLLAMA_URL")
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            extraction: ExtractionConfig::from_lookup(&lookup),
        }
    }
}

/// Where "today" comes from when resolving relative dates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceDateProvider {
    System,
    Fixed(NaiveDate),
}

impl ReferenceDateProvider {
    pub fn today(&self) -> NaiveDate {
        match self {
            ReferenceDateProvider::System => chrono::Local::now().date_naive(),
            ReferenceDateProvider::Fixed(date) => *date,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ExtractionConfig {
    pub provider_key: String,
    pub model_name: String,
    pub timeout: Duration,
    pub retry_count: u32,
    pub retry_base_delay: Duration,
    pub reference_date: ReferenceDateProvider,
    pub require_event_date: bool,
    /// Treat any normalization failure as fatal to the whole record.
    pub strict_normalization: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            provider_key: String::new(),
            model_name: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(30),
            retry_count: 2,
            retry_base_delay: Duration::from_millis(500),
            reference_date: ReferenceDateProvider::System,
            require_event_date: false,
            strict_normalization: false,
        }
    }
}

impl ExtractionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; unparseable values keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            provider_key: lookup("LLM_API_KEY").unwrap_or_default(),
            model_name: lookup("LLM_MODEL").unwrap_or(defaults.model_name),
            timeout: lookup("LLM_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            retry_count: lookup("LLM_MAX_RETRIES")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.retry_count),
            retry_base_delay: lookup("LLM_RETRY_DELAY_MS")
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_base_delay),
            reference_date: lookup("REFERENCE_DATE")
                .and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok())
                .map(ReferenceDateProvider::Fixed)
                .unwrap_or(defaults.reference_date),
            require_event_date: lookup("REQUIRE_EVENT_DATE")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.require_event_date),
            strict_normalization: lookup("STRICT_NORMALIZATION")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.strict_normalization),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" YES "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("no"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_fixed_reference_date() {
        let date = NaiveDate::from_ymd_opt(2023, 8, 4).unwrap();
        assert_eq!(ReferenceDateProvider::Fixed(date).today(), date);
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_reads_values() {
        let config = ExtractionConfig::from_lookup(lookup(&[
            ("LLM_API_KEY", "sk-test"),
            ("LLM_TIMEOUT_SECS", "5"),
            ("LLM_MAX_RETRIES", "4"),
            ("REFERENCE_DATE", "2023-08-04"),
            ("STRICT_NORMALIZATION", "true"),
        ]));
        assert_eq!(config.provider_key, "sk-test");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retry_count, 4);
        assert_eq!(
            config.reference_date,
            ReferenceDateProvider::Fixed(NaiveDate::from_ymd_opt(2023, 8, 4).unwrap())
        );
        assert!(config.strict_normalization);
        assert!(!config.require_event_date);
    }

    #[test]
    fn test_unparseable_values_fall_back_to_defaults() {
        let config = ExtractionConfig::from_lookup(lookup(&[
            ("LLM_TIMEOUT_SECS", "soon"),
            ("LLM_MAX_RETRIES", "-1"),
            ("LLM_RETRY_DELAY_MS", "fast"),
            ("REFERENCE_DATE", "8/4/2023"),
            ("REQUIRE_EVENT_DATE", "maybe"),
        ]));
        let defaults = ExtractionConfig::default();
        assert_eq!(config.timeout, defaults.timeout);
        assert_eq!(config.retry_count, defaults.retry_count);
        assert_eq!(config.retry_base_delay, defaults.retry_base_delay);
        assert_eq!(config.reference_date, ReferenceDateProvider::System);
        assert!(!config.require_event_date);

        let app = AppConfig::from_lookup(lookup(&[("PORT", "eighty")]));
        assert_eq!(app.port, 3000);
        assert_eq!(app.llm_provider, "openai");
    }

    #[test]
    fn test_defaults() {
        let config = ExtractionConfig::default();
        assert_eq!(config.retry_count, 2);
        assert_eq!(config.reference_date, ReferenceDateProvider::System);
        assert!(!config.strict_normalization);
    }
}
