/// Crash-safe file replacement helpers.
pub mod atomic;
/// Uploaded clip storage keyed by ball number.
pub mod clip_store;
/// Static-asset fallback for clips.
pub mod fallback;
/// Durable record definitions.
pub mod models;
/// Game session storage shared between host and viewer.
pub mod session_store;
/// Storage error types.
pub mod storage;
