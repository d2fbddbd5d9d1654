//! Error types for reviewwatch.
//!
//! One flat taxonomy, matched by kind in the polling loop:
//! - Startup: configuration could not be loaded
//! - Per cycle: fetch, response shape, status extraction, delivery
//! - Benign: the API returned no homework updates

use thiserror::Error;

/// Top-level error type for reviewwatch.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    /// Transport failures and non-200 statuses share this variant.
    #[error("API request to {endpoint} failed: {reason}")]
    ApiRequest {
        endpoint: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("Unexpected API response: {0}")]
    Response(#[from] ResponseError),

    #[error("Cannot extract homework status: {0}")]
    Status(#[from] StatusError),

    #[error("Failed to send message to chat: {0}")]
    SendMessage(String),

    #[error("HTTP client error: {0}")]
    Client(#[source] reqwest::Error),
}

/// The API answered, but not with the documented shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseError {
    #[error("response is not a JSON object")]
    NotAMapping,

    #[error("response has no \"homeworks\" key")]
    MissingHomeworks,

    #[error("response has no \"current_date\" key")]
    MissingCurrentDate,

    #[error("\"homeworks\" is not a list")]
    HomeworksNotAList,

    #[error("\"current_date\" is not an integer")]
    CurrentDateNotInteger,

    /// Not a failure: nothing changed since the cursor.
    #[error("homework list is empty")]
    EmptyHomeworks { current_date: i64 },
}

/// A homework record could not be turned into a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    #[error("homework record has no \"{0}\" field")]
    MissingField(&'static str),

    #[error("undocumented homework status: {}", .0.as_deref().unwrap_or("<none>"))]
    UndocumentedStatus(Option<String>),
}

impl BotError {
    /// Transport or HTTP-level failure while calling `endpoint`.
    pub fn api_request(
        endpoint: impl Into<String>,
        status: Option<u16>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ApiRequest {
            endpoint: endpoint.into(),
            status,
            reason: reason.into(),
        }
    }

    /// True for the expected "no updates" condition.
    pub fn is_informational(&self) -> bool {
        self.no_updates_date().is_some()
    }

    /// Server date carried by the "no updates" condition.
    pub fn no_updates_date(&self) -> Option<i64> {
        match self {
            Self::Response(ResponseError::EmptyHomeworks { current_date }) => Some(*current_date),
            _ => None,
        }
    }

    /// HTTP status attached to a failed API call, if one was received.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::ApiRequest { status, .. } => *status,
            _ => None,
        }
    }
}

/// Result type alias for reviewwatch.
pub type Result<T> = std::result::Result<T, BotError>;
