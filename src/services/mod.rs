/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Group setup conversation and reset.
pub mod lifecycle_service;
/// Read-only views over a group's progress.
pub mod query_service;
/// Storage connection supervisor with reconnect backoff.
pub mod storage_supervisor;
/// Parsing of caption and reply-command submissions.
pub mod submission_adapter;
/// Validation and recording of finds.
pub mod submission_service;
mod transport_call;
