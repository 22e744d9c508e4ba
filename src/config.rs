//! Environment configuration helpers
//!
//! Configuration is plain environment variables (loaded from `.env` via
//! `dotenvy` at process start) with typed defaults.

/// Get an environment variable with a default value
///
/// # Example
/// ```
/// use taskflow::config::env;
///
/// let max: u32 = env("DB_MAX_CONNECTIONS", 10);
/// let url = env("DATABASE_URL", "sqlite://./taskflow.db".to_string());
/// ```
pub fn env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Get an optional environment variable
pub fn env_optional<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
