use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::IntoResponse,
};
use axum_valid::{ValidRejection, ValidationRejection};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError, state::lifecycle::InvalidTransition, transport::TransportError,
};

/// Outcomes of game operations other than success.
///
/// Everything except the infrastructure variants (see
/// [`ServiceError::is_infrastructure`]) is an expected, user-facing rejection.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The group has no channel yet.
    #[error("group is not initialized")]
    NotInitialized,
    /// The group already has a channel.
    #[error("group is already initialized")]
    AlreadyInitialized,
    /// A channel was supplied without a preceding `begin_init`.
    #[error("no initialization is in progress")]
    InitNotStarted,
    /// The number was found before.
    #[error("number already submitted: {existing_link}")]
    AlreadySubmitted {
        /// Proof link of the earlier find.
        existing_link: String,
    },
    /// The number does not follow the current one.
    #[error("wrong number: expected {expected}, got {got}")]
    WrongNumber {
        /// Number the group waits for.
        expected: u64,
        /// Number that was claimed.
        got: i64,
    },
    /// No number could be read from the submission.
    #[error("submission does not carry a number")]
    InvalidFormat,
    /// The channel handle is not a public channel reference.
    #[error("invalid channel `{0}`")]
    InvalidChannel(String),
    /// The bot cannot post in the channel.
    #[error("bot cannot post in channel `{0}`")]
    ChannelNotWritable(String),
    /// The requester is not an administrator of the group.
    #[error("permission denied")]
    PermissionDenied,
    /// Reposting the proof to the channel failed or timed out.
    #[error("posting to channel failed: {0}")]
    PostingFailed(String),
    /// A non-posting transport call failed or timed out.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Storage backend returned an error.
    #[error("storage unavailable")]
    StoreUnavailable(#[source] StorageError),
    /// No storage backend is installed.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
}

impl ServiceError {
    /// Stable machine-readable identifier.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotInitialized => "not_initialized",
            ServiceError::AlreadyInitialized => "already_initialized",
            ServiceError::InitNotStarted => "init_not_started",
            ServiceError::AlreadySubmitted { .. } => "already_submitted",
            ServiceError::WrongNumber { .. } => "wrong_number",
            ServiceError::InvalidFormat => "invalid_format",
            ServiceError::InvalidChannel(_) => "invalid_channel",
            ServiceError::ChannelNotWritable(_) => "channel_not_writable",
            ServiceError::PermissionDenied => "permission_denied",
            ServiceError::PostingFailed(_) => "posting_failed",
            ServiceError::Transport(_) => "transport_failed",
            ServiceError::StoreUnavailable(_) | ServiceError::Degraded => "store_unavailable",
        }
    }

    /// Whether this is a system failure rather than a rejected request.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            ServiceError::PostingFailed(_)
                | ServiceError::Transport(_)
                | ServiceError::StoreUnavailable(_)
                | ServiceError::Degraded
        )
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::StoreUnavailable(err)
    }
}

impl From<TransportError> for ServiceError {
    fn from(err: TransportError) -> Self {
        ServiceError::Transport(err.to_string())
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        use crate::state::lifecycle::GroupPhase;

        match err.from {
            GroupPhase::Active => ServiceError::AlreadyInitialized,
            GroupPhase::Idle | GroupPhase::AwaitingChannel => ServiceError::InitNotStarted,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest {
            code: "validation_failed",
            message: format!("validation failed: {}", err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest {
            code: "invalid_body",
            message: rejection.body_text(),
        }
    }
}

impl From<ValidRejection<JsonRejection>> for AppError {
    fn from(rejection: ValidRejection<JsonRejection>) -> Self {
        match rejection {
            ValidationRejection::Valid(errors) => errors.into(),
            ValidationRejection::Inner(rejection) => rejection.into(),
        }
    }
}

/// Extra fields attached to some rejections.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ErrorDetails {
    /// Details of [`ServiceError::WrongNumber`].
    WrongNumber {
        /// Number the group waits for.
        expected: u64,
        /// Number that was claimed.
        got: i64,
    },
    /// Details of [`ServiceError::AlreadySubmitted`].
    AlreadySubmitted {
        /// Proof link of the earlier find.
        existing_link: String,
    },
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {message}")]
    BadRequest {
        /// Stable machine-readable code.
        code: &'static str,
        /// Human-readable reason.
        message: String,
    },
    /// Requester lacks the required rights.
    #[error("forbidden: {message}")]
    Forbidden {
        /// Stable machine-readable code.
        code: &'static str,
        /// Human-readable reason.
        message: String,
    },
    /// Conflict with current state.
    #[error("conflict: {message}")]
    Conflict {
        /// Stable machine-readable code.
        code: &'static str,
        /// Human-readable reason.
        message: String,
        /// Fields flattened into the body.
        details: Option<ErrorDetails>,
    },
    /// Input understood but refused by a collaborator check.
    #[error("unprocessable: {message}")]
    Unprocessable {
        /// Stable machine-readable code.
        code: &'static str,
        /// Human-readable reason.
        message: String,
    },
    /// Upstream chat platform failed.
    #[error("bad gateway: {message}")]
    BadGateway {
        /// Stable machine-readable code.
        code: &'static str,
        /// Human-readable reason.
        message: String,
    },
    /// Service unavailable or degraded.
    #[error("service unavailable: {message}")]
    ServiceUnavailable {
        /// Stable machine-readable code.
        code: &'static str,
        /// Human-readable reason.
        message: String,
    },
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let code = err.code();
        let message = err.to_string();
        match err {
            ServiceError::InvalidFormat | ServiceError::InvalidChannel(_) => {
                AppError::BadRequest { code, message }
            }
            ServiceError::PermissionDenied => AppError::Forbidden { code, message },
            ServiceError::WrongNumber { expected, got } => AppError::Conflict {
                code,
                message,
                details: Some(ErrorDetails::WrongNumber { expected, got }),
            },
            ServiceError::AlreadySubmitted { existing_link } => AppError::Conflict {
                code,
                message,
                details: Some(ErrorDetails::AlreadySubmitted { existing_link }),
            },
            ServiceError::NotInitialized
            | ServiceError::AlreadyInitialized
            | ServiceError::InitNotStarted => AppError::Conflict {
                code,
                message,
                details: None,
            },
            ServiceError::ChannelNotWritable(_) => AppError::Unprocessable { code, message },
            ServiceError::PostingFailed(_) | ServiceError::Transport(_) => {
                AppError::BadGateway { code, message }
            }
            ServiceError::StoreUnavailable(_) | ServiceError::Degraded => {
                AppError::ServiceUnavailable { code, message }
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    details: Option<ErrorDetails>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };

        let message = self.to_string();
        let (code, details) = match self {
            AppError::Conflict { code, details, .. } => (code, details),
            AppError::BadRequest { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::Unprocessable { code, .. }
            | AppError::BadGateway { code, .. }
            | AppError::ServiceUnavailable { code, .. } => (code, None),
        };

        let payload = Json(ErrorBody {
            code,
            message,
            details,
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_number_keeps_expected_and_got() {
        let err: AppError = ServiceError::WrongNumber {
            expected: 2,
            got: 3,
        }
        .into();

        match err {
            AppError::Conflict {
                code,
                details: Some(ErrorDetails::WrongNumber { expected, got }),
                ..
            } => {
                assert_eq!(code, "wrong_number");
                assert_eq!((expected, got), (2, 3));
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn infrastructure_failures_are_flagged() {
        assert!(ServiceError::PostingFailed("timeout".into()).is_infrastructure());
        assert!(ServiceError::Degraded.is_infrastructure());
        assert!(!ServiceError::PermissionDenied.is_infrastructure());
        assert!(!ServiceError::InvalidFormat.is_infrastructure());
    }

    #[test]
    fn error_body_flattens_details() {
        let body = ErrorBody {
            code: "already_submitted",
            message: "number already submitted".into(),
            details: Some(ErrorDetails::AlreadySubmitted {
                existing_link: "https://t.me/chan/1".into(),
            }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["existing_link"], "https://t.me/chan/1");
        assert_eq!(json["code"], "already_submitted");
    }
}
