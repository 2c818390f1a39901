/// Storage-agnostic records and partial updates.
pub mod models;
/// Session store trait and its backends.
pub mod session_store;
/// Backend-agnostic storage errors.
pub mod storage;
