use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;
use tracing::error;

use crate::api::models::ErrorBody;
use crate::gateway::{requests::FieldError, GatewayError};
use crate::llm::ProviderError;

const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed")]
    ValidationFailed(Vec<FieldError>),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("Too many AI requests, please try again later")]
    RateLimited,
    #[error("The request is too long for the AI model, please shorten it")]
    ContextTooLong,
    /// Detail is only present in development mode.
    #[error("{}", .0.as_deref().unwrap_or(INTERNAL_MESSAGE))]
    Internal(Option<String>),
}

impl ApiError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationFailed(vec![FieldError::new(field, message)])
    }

    /// Maps gateway failures onto the HTTP taxonomy.
    pub fn from_gateway(err: GatewayError, expose_internal: bool) -> Self {
        match err {
            GatewayError::Validation(errors) => ApiError::ValidationFailed(errors),
            GatewayError::Forbidden(msg) => ApiError::Forbidden(msg),
            GatewayError::NotFound(msg) => ApiError::NotFound(msg),
            GatewayError::NotConfigured => {
                ApiError::ServiceUnavailable("AI service is not configured".to_string())
            }
            GatewayError::Provider(ProviderError::Unavailable(_)) => {
                ApiError::ServiceUnavailable("AI service is temporarily unavailable".to_string())
            }
            GatewayError::Provider(ProviderError::QuotaExceeded) => {
                ApiError::ServiceUnavailable("AI service quota exceeded".to_string())
            }
            GatewayError::Provider(ProviderError::RateLimited) => ApiError::RateLimited,
            GatewayError::Provider(ProviderError::ContextTooLong) => ApiError::ContextTooLong,
            other @ (GatewayError::Provider(ProviderError::Unknown(_)) | GatewayError::Store(_)) => {
                error!(error = %other, "Internal error while serving AI request");
                ApiError::Internal(expose_internal.then(|| other.to_string()))
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationFailed(_) | ApiError::ContextTooLong => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let errors = match self {
            ApiError::ValidationFailed(errors) => Some(errors.clone()),
            _ => None,
        };

        HttpResponse::build(self.status_code()).json(ErrorBody {
            success: false,
            message: self.to_string(),
            errors,
        })
    }
}
