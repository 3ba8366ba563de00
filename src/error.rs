//! Error handling for the Timescope core
//!
//! This module defines custom error types and a Result alias for use
//! throughout the crate.

use thiserror::Error;

/// Main error type for Timescope operations
#[derive(Error, Debug)]
pub enum TimescopeError {
    /// Errors establishing or maintaining a connection to the data service
    #[error("Connection error: {0}")]
    Connection(String),

    /// Errors from a discrete fetch or a bounds query
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Errors from the streaming subscription
    #[error("Stream error: {0}")]
    Stream(String),

    /// Errors related to channel lookup or listing
    #[error("Channel error: {0}")]
    Channel(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TimescopeError>,
    },
}

impl TimescopeError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TimescopeError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for Timescope operations
pub type Result<T> = std::result::Result<T, TimescopeError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TimescopeError::Channel("no such channel".to_string());
        assert_eq!(err.to_string(), "Channel error: no such channel");
    }

    #[test]
    fn test_error_with_context() {
        let err = TimescopeError::Fetch("timed out".to_string());
        let with_ctx = err.with_context("Failed to step window");
        assert!(with_ctx.to_string().contains("Failed to step window"));
    }

    #[test]
    fn test_result_ext_context() {
        let res: Result<()> = Err(TimescopeError::Connection("refused".to_string()));
        let err = res.context("opening data source").unwrap_err();
        assert!(err.to_string().contains("opening data source"));
        assert!(err.to_string().contains("refused"));
    }
}
