use std::fmt;

use actix_web::HttpResponse;
use actix_web::http::StatusCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GistlinkError {
    /// Payload exceeds the remote content API's size limit.
    TooLarge(String),
    /// Remote API refused the call due to rate limiting.
    RateLimited(String),
    /// Credential rejected by the remote API.
    Unauthorized(String),
    /// Requested slug already present in the table.
    SlugTaken(String),
    NotFound(String),
    /// Conditional write lost against a concurrent writer, retries exhausted.
    ConcurrentModification(String),
    /// Remote call exceeded the configured timeout.
    Timeout(String),
    Validation(String),
    Serialization(String),
    /// Transport failure or an unclassified remote response.
    Network(String),
}

impl GistlinkError {
    pub fn code(&self) -> &'static str {
        match self {
            GistlinkError::TooLarge(_) => "E001",
            GistlinkError::RateLimited(_) => "E002",
            GistlinkError::Unauthorized(_) => "E003",
            GistlinkError::SlugTaken(_) => "E004",
            GistlinkError::NotFound(_) => "E005",
            GistlinkError::ConcurrentModification(_) => "E006",
            GistlinkError::Timeout(_) => "E007",
            GistlinkError::Validation(_) => "E008",
            GistlinkError::Serialization(_) => "E009",
            GistlinkError::Network(_) => "E010",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            GistlinkError::TooLarge(_) => "Payload Too Large",
            GistlinkError::RateLimited(_) => "Rate Limited",
            GistlinkError::Unauthorized(_) => "Unauthorized",
            GistlinkError::SlugTaken(_) => "Slug Taken",
            GistlinkError::NotFound(_) => "Resource Not Found",
            GistlinkError::ConcurrentModification(_) => "Concurrent Modification",
            GistlinkError::Timeout(_) => "Remote Timeout",
            GistlinkError::Validation(_) => "Validation Error",
            GistlinkError::Serialization(_) => "Serialization Error",
            GistlinkError::Network(_) => "Network Error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            GistlinkError::TooLarge(msg)
            | GistlinkError::RateLimited(msg)
            | GistlinkError::Unauthorized(msg)
            | GistlinkError::SlugTaken(msg)
            | GistlinkError::NotFound(msg)
            | GistlinkError::ConcurrentModification(msg)
            | GistlinkError::Timeout(msg)
            | GistlinkError::Validation(msg)
            | GistlinkError::Serialization(msg)
            | GistlinkError::Network(msg) => msg,
        }
    }

    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for GistlinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for GistlinkError {}

impl GistlinkError {
    pub fn too_large<T: Into<String>>(msg: T) -> Self {
        GistlinkError::TooLarge(msg.into())
    }

    pub fn rate_limited<T: Into<String>>(msg: T) -> Self {
        GistlinkError::RateLimited(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        GistlinkError::Unauthorized(msg.into())
    }

    pub fn slug_taken<T: Into<String>>(msg: T) -> Self {
        GistlinkError::SlugTaken(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        GistlinkError::NotFound(msg.into())
    }

    pub fn concurrent_modification<T: Into<String>>(msg: T) -> Self {
        GistlinkError::ConcurrentModification(msg.into())
    }

    pub fn timeout<T: Into<String>>(msg: T) -> Self {
        GistlinkError::Timeout(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        GistlinkError::Validation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        GistlinkError::Serialization(msg.into())
    }

    pub fn network<T: Into<String>>(msg: T) -> Self {
        GistlinkError::Network(msg.into())
    }
}

impl From<serde_json::Error> for GistlinkError {
    fn from(err: serde_json::Error) -> Self {
        GistlinkError::Serialization(err.to_string())
    }
}

impl actix_web::ResponseError for GistlinkError {
    fn status_code(&self) -> StatusCode {
        match self {
            GistlinkError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GistlinkError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            GistlinkError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GistlinkError::SlugTaken(_) => StatusCode::CONFLICT,
            GistlinkError::NotFound(_) => StatusCode::NOT_FOUND,
            GistlinkError::ConcurrentModification(_) => StatusCode::CONFLICT,
            GistlinkError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GistlinkError::Validation(_) => StatusCode::BAD_REQUEST,
            GistlinkError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GistlinkError::Network(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "code": self.code(),
            "error": self.error_type(),
            "message": self.message(),
        }))
    }
}

pub type Result<T> = std::result::Result<T, GistlinkError>;
