//! Result, error and envelope types for the core library

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::notification::NotificationType;

/// Message used when neither the server nor the transport supplied one
pub const FALLBACK_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Message used when a 2xx envelope carries no `data`
pub const INVALID_RESPONSE_MESSAGE: &str = "Invalid API response format";

/// Normalized client error
///
/// Every variant displays as a single human-readable message, which is
/// what stores record in their error slot and forward to notifications.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No response was received (connect failure, timeout, DNS, ...)
    #[error("{0}")]
    Network(String),

    /// The server answered with a non-success HTTP status
    #[error("{message}")]
    Http { status: u16, message: String },

    /// A 2xx response whose envelope reported failure or lacked data
    #[error("{0}")]
    Envelope(String),

    /// A client-side precondition did not hold (e.g. no logged-in user)
    #[error("{0}")]
    Precondition(String),

    /// The response body could not be decoded
    #[error("{0}")]
    Decode(String),
}

impl ApiError {
    /// Create an HTTP error, preferring the server-provided message
    pub fn http(status: u16, server_message: Option<String>) -> Self {
        let message = server_message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("Request failed with status code {}", status));
        Self::Http { status, message }
    }

    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if msg.trim().is_empty() {
            Self::Network(FALLBACK_ERROR_MESSAGE.to_string())
        } else {
            Self::Network(msg)
        }
    }

    /// Create a precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// HTTP status, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The user-facing category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network(_) => ErrorCategory::Network,
            Self::Http { status, .. } => ErrorCategory::from_status(*status),
            Self::Envelope(_) | Self::Decode(_) => ErrorCategory::Request,
            Self::Precondition(_) => ErrorCategory::Other,
        }
    }
}

/// User-facing error categories, keyed off the originating HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    RateLimited,
    Server,
    Request,
    Network,
    Other,
}

impl ErrorCategory {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            422 => Self::Validation,
            429 => Self::RateLimited,
            500 => Self::Server,
            _ => Self::Request,
        }
    }

    /// Notification title shown for this category
    pub fn title(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Session Expired",
            Self::Forbidden => "Access Denied",
            Self::NotFound => "Not Found",
            Self::Validation => "Validation Error",
            Self::RateLimited => "Rate Limited",
            Self::Server => "Server Error",
            Self::Request => "Request Failed",
            Self::Network => "Network Error",
            Self::Other => "Error",
        }
    }

    /// Rate limiting is a warning, everything else an error
    pub fn notification_type(&self) -> NotificationType {
        match self {
            Self::RateLimited => NotificationType::Warning,
            _ => NotificationType::Error,
        }
    }

    /// Fixed user message for categories that do not echo the server
    pub fn default_message(&self) -> Option<&'static str> {
        match self {
            Self::Forbidden => Some("You do not have permission to perform this action"),
            Self::NotFound => Some("The requested resource was not found"),
            Self::RateLimited => Some("Too many requests. Please try again later."),
            Self::Server => Some("An unexpected error occurred. Please try again."),
            Self::Network => {
                Some("Unable to connect to the server. Please check your connection.")
            }
            Self::Unauthorized => Some("Your session has expired. Please log in again."),
            Self::Validation | Self::Request | Self::Other => None,
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, ApiError>;

/// Server-reported pagination for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    #[serde(alias = "total_pages")]
    pub total_pages: u32,
}

impl PaginationInfo {
    /// First page with the given page size and nothing known about totals
    pub fn first_page(limit: u32) -> Self {
        Self {
            page: 1,
            limit,
            total: 0,
            total_pages: 0,
        }
    }
}

impl Default for PaginationInfo {
    fn default() -> Self {
        Self::first_page(20)
    }
}

fn default_success() -> bool {
    true
}

/// Response envelope shared by every endpoint
///
/// `{ success, data?, error?, message?, pagination? }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    // Missing `Option` fields already decode as `None`. A `default` here
    // would demand `T: Default` from every payload type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationInfo>,
}

impl<T> ApiResponse<T> {
    /// Create a successful envelope
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
            pagination: None,
        }
    }

    /// Attach pagination to an envelope
    pub fn with_pagination(mut self, pagination: PaginationInfo) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Create a failed envelope
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
            pagination: None,
        }
    }

    /// Reject envelopes that report `success: false`
    pub fn ensure_success(self) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        let message = self
            .message
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string());
        Err(ApiError::Envelope(message))
    }

    /// Extract `data`, treating its absence as an error
    pub fn into_data(self) -> Result<T> {
        self.ensure_success()?
            .data
            .ok_or_else(|| ApiError::Envelope(INVALID_RESPONSE_MESSAGE.to_string()))
    }
}
