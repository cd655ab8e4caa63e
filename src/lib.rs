//! Library crate for number-hunt-back, exposing modules for binaries and integration tests.

/// Game settings file.
pub mod config;
/// Storage backends and key layout.
pub mod dao;
mod dto;
/// Domain and HTTP errors.
pub mod error;
/// HTTP routers.
pub mod routes;
/// Game operations.
pub mod services;
/// Shared application state and domain types.
pub mod state;
/// Chat platform access.
pub mod transport;
