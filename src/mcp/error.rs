//! The protocol error type threaded through every capability handler.

use serde_json::Value;
use thiserror::Error;

use crate::mcp::protocol::ErrorCode;

/// Boxed error returned by application handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for dispatcher and capability operations.
pub type McpResult<T> = Result<T, McpError>;

/// A protocol-level failure: one of the fixed [`ErrorCode`] kinds plus a
/// message and optional structured data.
///
/// Handlers may return this (boxed) to signal a precise error; it then
/// reaches the client unchanged instead of being reported as an internal
/// error.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct McpError {
    /// The error kind.
    pub code: ErrorCode,
    /// Human readable message.
    pub message: String,
    /// Optional structured details.
    pub data: Option<Value>,
}

impl McpError {
    /// Creates an error carrying the code's default message.
    #[must_use]
    pub fn new(code: ErrorCode) -> Self {
        Self::with_message(code, code.default_message())
    }

    /// Creates an error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attaches structured data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// No handler (or no capability) answers to `method`.
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::with_message(
            ErrorCode::MethodNotFound,
            format!("Method not found: {method}"),
        )
    }

    /// The parameters were rejected.
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidParams, message)
    }

    /// Something went wrong on our side.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, message)
    }

    /// Nothing readable lives at `uri`.
    #[must_use]
    pub fn resource_not_found(uri: &str) -> Self {
        Self::with_message(
            ErrorCode::ResourceNotFound,
            format!("Resource not found: {uri}"),
        )
    }

    /// Converts a handler failure into a protocol error.
    ///
    /// An `McpError` inside the box passes through untouched; anything else
    /// becomes an internal error carrying the original message.
    #[must_use]
    pub fn from_handler(error: BoxError) -> Self {
        match error.downcast::<Self>() {
            Ok(mcp) => *mcp,
            Err(other) => Self::internal(other.to_string()),
        }
    }
}
