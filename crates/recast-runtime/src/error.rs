//! Runtime error types

/// Result type for runtime operations
pub type Result<T> = anyhow::Result<T>;

/// Runtime error; batch failures are application-level, so anyhow carries them
pub type Error = anyhow::Error;
