use thiserror::Error;

/// Unified error type for release-sync operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Cannot parse '{input}' as a version: {reason}")]
    Format { input: String, reason: String },

    #[error("Malformed version heading on line {line}: {source}")]
    Heading {
        line: usize,
        #[source]
        source: Box<ReleaseError>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported document order: {0}")]
    UnsupportedOrder(String),

    #[error("Nothing to release: top-most version {0} is not flavored")]
    NothingToRelease(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Version control error: {0}")]
    Vcs(String),

    #[error("Hosted repository error: {0}")]
    Host(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in release-sync
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a format error for the offending input
    pub fn format(input: impl Into<String>, reason: impl Into<String>) -> Self {
        ReleaseError::Format {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Attach the 1-based line number of a change-log heading to an error
    pub fn on_line(self, line: usize) -> Self {
        ReleaseError::Heading {
            line,
            source: Box::new(self),
        }
    }

    /// Create a not-found error with context
    pub fn not_found(msg: impl Into<String>) -> Self {
        ReleaseError::NotFound(msg.into())
    }

    /// Create a version control error with context
    pub fn vcs(msg: impl Into<String>) -> Self {
        ReleaseError::Vcs(msg.into())
    }

    /// Create a hosted repository error with context
    pub fn host(msg: impl Into<String>) -> Self {
        ReleaseError::Host(msg.into())
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }
}
