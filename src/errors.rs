use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::Field;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizationError {
    #[error("expression is empty")]
    Empty,

    #[error("normalization service failed: {0}")]
    Service(String),

    #[error("response is not a JSON object: {0}")]
    Malformed(String),

    #[error("response is missing `{0}`")]
    MissingKey(&'static str),

    #[error("value out of range: {0}")]
    OutOfRange(String),

    #[error("expression could not be resolved: {0}")]
    Unrecognized(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("input rejected: {0}")]
    Input(&'static str),

    #[error("could not extract an experience: {0}")]
    Schema(String),

    #[error("invalid extraction schema: {0}")]
    InvalidSchema(String),

    #[error("{field} could not be normalized: {source}")]
    Normalization {
        field: Field,
        #[source]
        source: NormalizationError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("invalid request: {0}")]
    Validation(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Extraction(ExtractionError::Input(_)) => StatusCode::BAD_REQUEST,
            AppError::Extraction(ExtractionError::Schema(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Extraction(ExtractionError::Normalization { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Extraction(ExtractionError::InvalidSchema(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
        };

        let mut body = serde_json::json!({ "error": self.to_string() });
        if let AppError::Extraction(ExtractionError::Schema(_)) = &self {
            body["hint"] = "Try describing the experience again, including the venue and what is happening.".into();
        }
        (status, axum::Json(body)).into_response()
    }
}
