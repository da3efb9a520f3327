use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid period type: {0}")]
    InvalidPeriodType(String),

    #[error("Missing required field: {0}")]
    MissingRequiredField(&'static str),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store write failed: {0}")]
    StoreWriteFailed(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Kafka error: {0}")]
    Kafka(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Backwards compatibility alias
pub type AppError = IngestError;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ResponseError for IngestError {
    fn error_response(&self) -> HttpResponse {
        let code = self.status_code();
        HttpResponse::build(code).json(ErrorResponse {
            error: self.to_string(),
            code: code.as_u16(),
        })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            IngestError::InvalidPeriodType(_)
            | IngestError::MissingRequiredField(_)
            | IngestError::Validation(_) => StatusCode::BAD_REQUEST,
            IngestError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
