//! Chat-transport capabilities consumed by the game core.

/// Telegram-compatible Bot API client.
pub mod bot_api;

use std::error::Error;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::state::game::{GroupId, MediaRef, UserId};

/// Result alias for transport calls.
pub type TransportResult<T> = Result<T, TransportError>;

/// Failure reported by a transport implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote service could not be reached or answered garbage.
    #[error("transport unavailable: {message}")]
    Unavailable {
        /// What failed.
        message: String,
        /// Underlying error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The remote service refused the request.
    #[error("transport rejected `{method}`: {description}")]
    Rejected {
        /// Remote method called.
        method: &'static str,
        /// Reason given by the remote side.
        description: String,
    },
}

impl TransportError {
    /// Construct an unavailable error from any client failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        TransportError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Operations the core delegates to the chat platform.
pub trait Transport: Send + Sync {
    /// Re-post `media` to `channel_id` and return a durable link to the new post.
    fn post_media(
        &self,
        channel_id: String,
        media: MediaRef,
        caption: String,
    ) -> BoxFuture<'static, TransportResult<String>>;

    /// Check that the bot may post in `channel_id` (post then delete a probe).
    fn probe_channel_admin(&self, channel_id: String) -> BoxFuture<'static, TransportResult<bool>>;

    /// Whether `user_id` is an administrator or the creator of `group_id`.
    fn is_group_admin(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> BoxFuture<'static, TransportResult<bool>>;

    /// Display handle for a user.
    fn resolve_username(&self, user_id: UserId) -> BoxFuture<'static, TransportResult<String>>;
}
