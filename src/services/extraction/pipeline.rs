use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::ExtractionConfig;
use crate::errors::{ExtractionError, NormalizationError};
use crate::models::{ConsolidatedRecord, ExtractedRecord, ExtractionSchema, Field, NormalizedTime};
use crate::services::ai::retry::RetryPolicy;
use crate::services::ai::LlmProvider;

use super::{date, fields, time};

/// Turns a free-text description into a [`ConsolidatedRecord`]: one field
/// extraction call, then date and time normalization for whichever of those
/// fields were found. The normalization calls run concurrently.
pub struct ExperienceExtractor {
    llm: Arc<dyn LlmProvider>,
    schema: ExtractionSchema,
    retry: RetryPolicy,
    config: ExtractionConfig,
}

impl ExperienceExtractor {
    pub fn new(llm: Arc<dyn LlmProvider>, config: ExtractionConfig) -> Result<Self, ExtractionError> {
        let mut schema = ExtractionSchema::default();
        if config.require_event_date {
            schema = schema.require(Field::EventDate);
        }
        Self::with_schema(llm, schema, config)
    }

    pub fn with_schema(
        llm: Arc<dyn LlmProvider>,
        schema: ExtractionSchema,
        config: ExtractionConfig,
    ) -> Result<Self, ExtractionError> {
        schema.validate().map_err(ExtractionError::InvalidSchema)?;
        Ok(Self {
            llm,
            schema,
            retry: RetryPolicy::new(config.retry_count, config.retry_base_delay),
            config,
        })
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.config.reference_date.today()
    }

    /// Extracts relative to the configured reference date.
    pub async fn extract_today(&self, raw: &str) -> Result<ConsolidatedRecord, ExtractionError> {
        self.extract(raw, self.reference_date()).await
    }

    pub async fn extract(
        &self,
        raw: &str,
        reference: NaiveDate,
    ) -> Result<ConsolidatedRecord, ExtractionError> {
        let llm = self.llm.as_ref();
        let extracted = fields::extract_fields(llm, &self.retry, &self.schema, raw).await?;

        let mut record = ConsolidatedRecord::from_extracted(&extracted).ok_or_else(|| {
            ExtractionError::Schema("business name or event type missing".to_string())
        })?;

        let date_task = async {
            match extracted.text(Field::EventDate) {
                Some(expr) => Some((
                    expr,
                    date::normalize_date(llm, &self.retry, expr, reference).await,
                )),
                None => None,
            }
        };
        let (date, start, end) = tokio::join!(
            date_task,
            self.normalize_time_field(&extracted, Field::EventStartTime),
            self.normalize_time_field(&extracted, Field::EventEndTime),
        );

        if let Some((raw, result)) = date {
            match result {
                Ok(date) => record.set_date(date),
                Err(e) => self.handle_failure(&mut record, Field::EventDate, raw, e)?,
            }
        }

        for (field, outcome) in [(Field::EventStartTime, start), (Field::EventEndTime, end)] {
            if let Some((raw, result)) = outcome {
                match result {
                    Ok(time) => record.set_time(field, time),
                    Err(e) => self.handle_failure(&mut record, field, raw, e)?,
                }
            }
        }

        tracing::info!(
            business = %record.business_name,
            event_type = %record.event_type,
            status = ?record.status(),
            resolved = record.resolved.len(),
            "extracted experience"
        );

        Ok(record)
    }

    async fn normalize_time_field<'a>(
        &self,
        extracted: &'a ExtractedRecord,
        field: Field,
    ) -> Option<(&'a str, Result<NormalizedTime, NormalizationError>)> {
        let expr = extracted.text(field)?;
        Some((expr, time::normalize_time(self.llm.as_ref(), &self.retry, expr).await))
    }

    fn handle_failure(
        &self,
        record: &mut ConsolidatedRecord,
        field: Field,
        raw: &str,
        error: NormalizationError,
    ) -> Result<(), ExtractionError> {
        if self.config.strict_normalization || self.schema.is_required(field) {
            return Err(ExtractionError::Normalization {
                field,
                source: error,
            });
        }
        tracing::warn!(%field, raw, "leaving field unresolved: {error}");
        record.mark_unresolved(field, raw, error.to_string());
        Ok(())
    }
}
