use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    ConsolidatedRecord, ExperienceSubmission, ExtractionStatus, Field, StoredExperience,
    UnresolvedField,
};
use crate::state::AppState;

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 500;

// POST /api/experiences/extract
#[derive(Deserialize)]
pub struct ExtractRequest {
    pub text: String,
    #[serde(default)]
    pub reference_date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct ExtractResponse {
    pub status: ExtractionStatus,
    pub record: ConsolidatedRecord,
    pub resolved_fields: BTreeSet<Field>,
    pub unresolved_fields: Vec<UnresolvedField>,
    /// Pre-filled form values for the review step.
    pub submission: ExperienceSubmission,
}

pub async fn extract(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, AppError> {
    let reference = payload
        .reference_date
        .unwrap_or_else(|| state.extractor.reference_date());

    tracing::info!(chars = payload.text.len(), %reference, "extraction requested");

    let record = state.extractor.extract(&payload.text, reference).await?;

    Ok(Json(ExtractResponse {
        status: record.status(),
        resolved_fields: record.resolved.clone(),
        unresolved_fields: record.unresolved.clone(),
        submission: ExperienceSubmission::from(&record),
        record,
    }))
}

// POST /api/experiences
#[derive(Serialize)]
pub struct SubmitResponse {
    pub id: String,
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExperienceSubmission>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    payload.validate().map_err(AppError::Validation)?;

    let stored = {
        let db = state
            .db
            .lock()
            .map_err(|_| AppError::Storage(anyhow::anyhow!("database lock poisoned")))?;
        queries::insert_experience(&db, &payload)?
    };

    tracing::info!(
        id = %stored.id,
        business = %payload.business_name,
        event_type = %payload.event_type,
        "experience submitted"
    );

    Ok((StatusCode::CREATED, Json(SubmitResponse { id: stored.id })))
}

// GET /api/experiences
#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<StoredExperience>>, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let db = state
        .db
        .lock()
        .map_err(|_| AppError::Storage(anyhow::anyhow!("database lock poisoned")))?;
    let experiences = queries::list_experiences(&db, limit)?;
    Ok(Json(experiences))
}
