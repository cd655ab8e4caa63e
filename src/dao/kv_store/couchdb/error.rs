use reqwest::StatusCode;
use thiserror::Error;

/// Result alias for CouchDB calls.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// CouchDB failures, keyed by the database or document they concern.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// A required variable is not set.
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar {
        /// Variable name.
        var: &'static str,
    },
    /// The HTTP client could not be built.
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// No HTTP status came back (connection refused, timeout, TLS).
    #[error("CouchDB unreachable while accessing `{target}`")]
    Unreachable {
        /// Database or document concerned.
        target: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// Unexpected HTTP status.
    #[error("CouchDB answered {status} for `{target}`")]
    Status {
        /// Database or document concerned.
        target: String,
        /// HTTP status received.
        status: StatusCode,
    },
    /// The response body did not match the expected document.
    #[error("CouchDB returned an unreadable body for `{target}`")]
    Decode {
        /// Database or document concerned.
        target: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },
    /// Concurrent writers kept bumping the document revision.
    #[error("gave up updating `{key}` after {attempts} revision conflicts")]
    ConflictRetriesExhausted {
        /// Key concerned.
        key: String,
        /// Attempts made.
        attempts: u32,
    },
}

impl CouchDaoError {
    pub(super) fn unreachable(target: &str) -> impl FnOnce(reqwest::Error) -> Self {
        let target = target.to_owned();
        move |source| Self::Unreachable { target, source }
    }

    pub(super) fn decode(target: &str) -> impl FnOnce(reqwest::Error) -> Self {
        let target = target.to_owned();
        move |source| Self::Decode { target, source }
    }
}
