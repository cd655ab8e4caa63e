/// Logical key layout for per-group state.
pub mod keys;
/// Key/value persistence abstraction and its backends.
pub mod kv_store;
/// Storage abstraction layer for database operations.
pub mod storage;
