//! Errors raised by the Bot API client.

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias for Bot API calls.
pub type BotApiResult<T> = Result<T, BotApiError>;

/// Bot API failures.
#[derive(Debug, Error)]
pub enum BotApiError {
    /// A required variable is not set.
    #[error("missing Bot API environment variable `{var}`")]
    MissingEnvVar {
        /// Variable name.
        var: &'static str,
    },
    /// The HTTP client could not be built.
    #[error("failed to build Bot API client")]
    ClientBuilder {
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// The request never got a response.
    #[error("failed to send Bot API request `{method}`")]
    RequestSend {
        /// Method called.
        method: &'static str,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// The response body was not a Bot API envelope.
    #[error("failed to decode Bot API response for `{method}` (status {status})")]
    DecodeResponse {
        /// Method called.
        method: &'static str,
        /// HTTP status received.
        status: StatusCode,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// The API answered `ok: false`.
    #[error("Bot API refused `{method}`: {description}")]
    Refused {
        /// Method called.
        method: &'static str,
        /// Numeric error code, when provided.
        error_code: Option<i32>,
        /// Reason given by the API.
        description: String,
    },
    /// `ok: true` without a result payload.
    #[error("Bot API returned no result for `{method}`")]
    EmptyResult {
        /// Method called.
        method: &'static str,
    },
}
