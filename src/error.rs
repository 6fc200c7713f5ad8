//! Error types for vsphere-exporter
//!
//! This module defines the error types used throughout the application.
//! The scrape pipeline distinguishes failures by how far they propagate:
//! connect and credential errors end a pass, list errors only fail the
//! entity type that raised them.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::catalog::EntityType;

/// VI/JSON 요청 단위 에러
#[derive(Error, Debug)]
pub enum RequestError {
    /// HTTP 전송 실패 (연결, TLS 등)
    #[error("HTTP request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// 타임아웃
    /// The value is the configured timeout in milliseconds, if known.
    #[error("Request timed out{}", .0.map(|ms| format!(" after {}ms", ms)).unwrap_or_default())]
    Timeout(Option<u64>),

    /// vSphere fault 응답
    #[error("vSphere fault (status {status}) {fault}: {message}")]
    Fault {
        status: u16,
        fault: String,
        message: String,
    },

    /// JSON 디코딩 실패
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// 로그인 응답에 세션 토큰이 없음
    #[error("Response is missing the session token header")]
    MissingSessionToken,
}

impl RequestError {
    /// HTTP 상태 코드 추출
    pub fn http_status(&self) -> Option<u16> {
        match self {
            RequestError::Fault { status, .. } => Some(*status),
            RequestError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Fault 타입 이름 (예: "InvalidLogin")
    pub fn fault_name(&self) -> Option<&str> {
        match self {
            RequestError::Fault { fault, .. } => Some(fault.as_str()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest doesn't expose the configured timeout duration
            RequestError::Timeout(None)
        } else if err.is_decode() {
            RequestError::Decode(err.to_string())
        } else {
            RequestError::Transport(err)
        }
    }
}

/// Failure to open a control-plane session. Fatal to the pass.
#[derive(Error, Debug)]
pub enum ConnectError {
    /// Endpoint could not be turned into a URL
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// HTTP client could not be built (TLS backend etc.)
    #[error("Failed to initialize HTTP client: {0}")]
    HttpClientInit(#[source] reqwest::Error),

    /// Login rejected by the control plane
    #[error("Authentication failed for user '{username}': {message}")]
    AuthenticationFailed { username: String, message: String },

    /// Service content lookup or login request failed
    #[error("Connection failed: {0}")]
    Request(#[from] RequestError),
}

/// Failure to enumerate one entity type. Isolated to that branch.
#[derive(Error, Debug)]
#[error("Failed to list {entity} inventory: {source}")]
pub struct ListError {
    pub entity: EntityType,
    #[source]
    pub source: RequestError,
}

impl ListError {
    pub fn new(entity: EntityType, source: RequestError) -> Self {
        Self { entity, source }
    }
}

/// No credentials configured for a target
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("No credentials found for target '{target}' and no default entry configured")]
    NotFound { target: String },
}

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Scrape request is missing the target parameter
    #[error("'target' parameter must be specified in multi scrape mode")]
    MissingTarget,

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, public_message, log_message) = match self {
            AppError::Config(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error",
                e.to_string(),
            ),
            AppError::MissingTarget => (
                StatusCode::BAD_REQUEST,
                "'target' parameter must be specified in multi scrape mode",
                "missing target parameter".to_string(),
            ),
            AppError::Internal(e) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error", e),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %log_message, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %log_message, "Request rejected");
        }

        (status, public_message).into_response()
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;
