use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or failed the call.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human-readable reason.
        message: String,
        /// Underlying error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A key holds a value of another shape (e.g. a set where a string was expected).
    #[error("key `{key}` holds a {found} value, expected {expected}")]
    WrongKind {
        /// Key concerned.
        key: String,
        /// Shape the caller asked for.
        expected: &'static str,
        /// Shape actually stored.
        found: &'static str,
    },
    /// A stored value could not be decoded into the expected type.
    #[error("key `{key}` holds an undecodable value `{value}`")]
    Corrupt {
        /// Key concerned.
        key: String,
        /// Raw stored value.
        value: String,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
