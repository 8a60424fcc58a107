// core/common/src/error.rs
// Error responses and their HTTP mapping

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(
        error: String,
        error_code: String,
        message: String,
    ) -> Self {
        Self {
            error,
            error_code,
            message,
            request_id: None,
        }
    }
    
    pub fn with_request_id(mut self, request_id: String) -> Self {
        self.request_id = Some(request_id);
        self
    }
}

#[derive(Debug)]
pub enum ServiceError {
    // Client errors (4xx)
    ValidationError(String),
    NotFound(String),
    Unauthorized,
    Forbidden,
    Conflict(String),
    RateLimitExceeded(String),
    BadRequest(String),
    
    // Server errors (5xx)
    DatabaseError(String),
    ServiceUnavailable(String),
    InternalError(String),
    
    // Custom errors
    Custom {
        status_code: StatusCode,
        error_code: String,
        message: String,
    },
}

impl ServiceError {
    pub fn error_code(&self) -> String {
        match self {
            ServiceError::ValidationError(_) => "validation_error".to_string(),
            ServiceError::NotFound(_) => "not_found".to_string(),
            ServiceError::Unauthorized => "unauthorized".to_string(),
            ServiceError::Forbidden => "forbidden".to_string(),
            ServiceError::Conflict(_) => "conflict".to_string(),
            ServiceError::RateLimitExceeded(_) => "rate_limit_exceeded".to_string(),
            ServiceError::BadRequest(_) => "bad_request".to_string(),
            ServiceError::DatabaseError(_) => "database_error".to_string(),
            ServiceError::ServiceUnavailable(_) => "service_unavailable".to_string(),
            ServiceError::InternalError(_) => "internal_error".to_string(),
            ServiceError::Custom { error_code, .. } => error_code.clone(),
        }
    }
    
    pub fn message(&self) -> String {
        match self {
            ServiceError::ValidationError(msg) => msg.clone(),
            ServiceError::NotFound(msg) => msg.clone(),
            ServiceError::Unauthorized => "Unauthorized access".to_string(),
            ServiceError::Forbidden => "Access forbidden".to_string(),
            ServiceError::Conflict(msg) => msg.clone(),
            ServiceError::RateLimitExceeded(msg) => msg.clone(),
            ServiceError::BadRequest(msg) => msg.clone(),
            ServiceError::DatabaseError(msg) => format!("Database error: {}", msg),
            ServiceError::ServiceUnavailable(msg) => format!("Service unavailable: {}", msg),
            ServiceError::InternalError(msg) => format!("Internal error: {}", msg),
            ServiceError::Custom { message, .. } => message.clone(),
        }
    }
    
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Custom { status_code, .. } => *status_code,
        }
    }
    
    pub fn to_error_response(&self, request_id: Option<String>) -> ErrorResponse {
        let mut response = ErrorResponse::new(
            self.to_string(),
            self.error_code(),
            self.message(),
        );
        
        if let Some(id) = request_id {
            response = response.with_request_id(id);
        }
        
        response
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl ResponseError for ServiceError {
    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!(error_code = %self.error_code(), error = %self.message(), "Request failed");
        }
        let error_response = self.to_error_response(None);
        HttpResponse::build(self.status_code()).json(error_response)
    }
    
    fn status_code(&self) -> StatusCode {
        self.status_code()
    }
}

// Conversion from common error types
impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::DatabaseError(err.to_string())
    }
}

impl From<crate::auth::AuthError> for ServiceError {
    fn from(err: crate::auth::AuthError) -> Self {
        match err {
            crate::auth::AuthError::InvalidToken => ServiceError::Unauthorized,
            crate::auth::AuthError::TokenExpired => ServiceError::Unauthorized,
            crate::auth::AuthError::SessionRevoked => ServiceError::Unauthorized,
            crate::auth::AuthError::MissingAuth => ServiceError::Unauthorized,
            crate::auth::AuthError::InsufficientPermissions => ServiceError::Forbidden,
            crate::auth::AuthError::JwtError(_) => ServiceError::Unauthorized,
        }
    }
}

// Only reached where a cache is load-bearing (captcha, sessions); cache-aside reads never surface it
impl From<crate::cache::CacheError> for ServiceError {
    fn from(err: crate::cache::CacheError) -> Self {
        match err {
            crate::cache::CacheError::Unavailable(msg) => ServiceError::ServiceUnavailable(msg),
            other => ServiceError::InternalError(other.to_string()),
        }
    }
}

impl From<crate::validation::ValidationError> for ServiceError {
    fn from(err: crate::validation::ValidationError) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<crate::rate_limit::RateLimitError> for ServiceError {
    fn from(err: crate::rate_limit::RateLimitError) -> Self {
        match &err {
            crate::rate_limit::RateLimitError::LimitExceeded { .. } => {
                ServiceError::RateLimitExceeded(err.to_string())
            }
            crate::rate_limit::RateLimitError::InternalError(msg) => {
                ServiceError::InternalError(msg.clone())
            }
        }
    }
}
