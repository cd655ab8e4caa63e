mod client;
mod config;
mod error;
mod models;

pub use client::BotApiTransport;
pub use config::BotApiConfig;
pub use error::BotApiError;

use crate::transport::TransportError;

impl From<BotApiError> for TransportError {
    fn from(err: BotApiError) -> Self {
        match err {
            BotApiError::Refused {
                method,
                description,
                ..
            } => TransportError::Rejected {
                method,
                description,
            },
            other => TransportError::unavailable(other.to_string(), other),
        }
    }
}
