//! Error types for the component credential layer.
//!
//! Upstream failures arrive as an `errcode`/`errmsg` envelope on HTTP 200,
//! so upstream errors are kept distinct from transport errors.

use std::time::Duration;
use thiserror::Error;

/// Upstream error code meaning the presented access token was rejected.
///
/// This is the only code the dispatcher recovers from, with a single forced
/// refresh per logical call.
pub const INVALID_CREDENTIAL_CODE: i64 = 40001;

/// Root error type for component operations.
#[derive(Error, Debug)]
pub enum WechatError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Verify ticket unavailable: {message}")]
    TicketUnavailable { message: String },

    #[error("No refresh token stored for {identity}")]
    MissingRefreshToken { identity: String },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Upstream error {code}: {message}")]
    Upstream { code: i64, message: String },

    #[error("Upstream returned an empty response body")]
    EmptyResponse,

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Response error: {0}")]
    Response(#[from] ResponseError),
}

impl WechatError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "WECHAT_CONFIG",
            Self::TicketUnavailable { .. } => "WECHAT_TICKET",
            Self::MissingRefreshToken { .. } => "WECHAT_REFRESH_TOKEN",
            Self::Transport(_) => "WECHAT_TRANSPORT",
            Self::Upstream { .. } => "WECHAT_UPSTREAM",
            Self::EmptyResponse => "WECHAT_EMPTY_RESPONSE",
            Self::InvalidArgument { .. } => "WECHAT_INVALID_ARGUMENT",
            Self::Storage(_) => "WECHAT_STORAGE",
            Self::Response(_) => "WECHAT_RESPONSE",
        }
    }

    /// Check whether this is the upstream invalid-credential rejection.
    ///
    /// Only this condition may trigger the dispatcher's one forced refresh;
    /// every other error surfaces to the caller untouched.
    pub fn is_credential_rejection(&self) -> bool {
        matches!(self, Self::Upstream { code, .. } if *code == INVALID_CREDENTIAL_CODE)
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },
}

/// Transport-level error. Never retried by the credential layer.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

/// Token store error.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    #[error("Write failed: {message}")]
    WriteFailed { message: String },
}

/// Response decoding error.
#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },

    #[error("Unexpected payload shape: {message}")]
    Decode { message: String },
}

/// Result type for component operations.
pub type WechatResult<T> = Result<T, WechatError>;
