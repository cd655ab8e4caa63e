use mongodb::error::Error as MongoError;
use thiserror::Error;

/// Result alias for MongoDB calls.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// MongoDB failures.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// A required variable is not set.
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar {
        /// Variable name.
        var: &'static str,
    },
    /// The connection URI could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// Rejected URI.
        uri: String,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// The client could not be built from its options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// The server never answered a ping while connecting.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Attempts made.
        attempts: u32,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// A periodic ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// Reading a key failed.
    #[error("failed to read key `{key}`")]
    Read {
        /// Key concerned.
        key: String,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// Writing a key failed.
    #[error("failed to write key `{key}`")]
    Write {
        /// Key concerned.
        key: String,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// Deleting a key failed.
    #[error("failed to delete key `{key}`")]
    Delete {
        /// Key concerned.
        key: String,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
    /// Listing keys failed.
    #[error("failed to scan keys with prefix `{prefix}`")]
    Scan {
        /// Scanned prefix.
        prefix: String,
        /// Underlying error.
        #[source]
        source: MongoError,
    },
}
