use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::timeout;

use crate::{error::ServiceError, transport::TransportResult};

/// Await a non-posting transport call, bounded by `limit`.
pub(crate) async fn bounded<T>(
    limit: Duration,
    operation: &'static str,
    call: BoxFuture<'static, TransportResult<T>>,
) -> Result<T, ServiceError> {
    match timeout(limit, call).await {
        Ok(result) => result.map_err(ServiceError::from),
        Err(_) => Err(ServiceError::Transport(format!(
            "{operation} timed out after {} ms",
            limit.as_millis()
        ))),
    }
}

/// Await a channel post, bounded by `limit`; every failure is a [`ServiceError::PostingFailed`].
pub(crate) async fn bounded_post(
    limit: Duration,
    call: BoxFuture<'static, TransportResult<String>>,
) -> Result<String, ServiceError> {
    match timeout(limit, call).await {
        Ok(Ok(link)) => Ok(link),
        Ok(Err(err)) => Err(ServiceError::PostingFailed(err.to_string())),
        Err(_) => Err(ServiceError::PostingFailed(format!(
            "timed out after {} ms",
            limit.as_millis()
        ))),
    }
}
