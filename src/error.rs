//! Custom error types for find-bzs.

use thiserror::Error;

/// Main error type for find-bzs operations.
#[derive(Error, Debug)]
pub enum FindBzsError {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid git remote URL: {0}")]
    InvalidRemoteUrl(String),

    #[error("Git URL parse error: {0}")]
    GitUrlError(#[from] git_url_parse::GitUrlParseError),

    #[error("Git operation failed: {0}")]
    GitError(#[from] git2::Error),

    // Issue tracker errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    // Commit to pull request mapping errors
    #[error("Found {count} merged pull requests in {project} for {sha}")]
    AmbiguousMapping {
        project: String,
        sha: String,
        count: u64,
    },

    #[error("Merge commit {sha} does not reference a pull request: {summary}")]
    UnrecognizedMerge { sha: String, summary: String },

    // Version errors
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    // Network/API errors
    #[error("Network request failed: {0}")]
    NetworkError(String),

    #[error("{url} returned HTTP {status}")]
    Http { url: String, status: u16 },

    #[error("API response missing {0}")]
    MalformedResponse(String),

    // Parsing errors
    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Regular expression error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] log::SetLoggerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Server replies to a fetch of an object the remote does not have.
const MISSING_OBJECT_REPLIES: &[&str] = &[
    "not our ref",
    "couldn't find remote ref",
    "no such remote ref",
];

/// Result type alias using FindBzsError
pub type Result<T> = std::result::Result<T, FindBzsError>;

impl FindBzsError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a not-supported error
    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    /// Whether a fetch failed only because the remote does not have the
    /// requested object.
    pub fn is_missing_object(&self) -> bool {
        let Self::GitError(err) = self else {
            return false;
        };

        if err.code() == git2::ErrorCode::NotFound {
            return true;
        }

        let message = err.message();
        MISSING_OBJECT_REPLIES
            .iter()
            .any(|reply| message.contains(reply))
    }

    /// Create an ambiguous mapping error
    pub fn ambiguous(
        project: impl Into<String>,
        sha: impl Into<String>,
        count: u64,
    ) -> Self {
        Self::AmbiguousMapping {
            project: project.into(),
            sha: sha.into(),
            count,
        }
    }
}

// Implement From for reqwest errors (network/API)
impl From<reqwest::Error> for FindBzsError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if matches!(status.as_u16(), 401 | 403) => {
                Self::Authentication(err.to_string())
            }
            Some(status) => Self::Http {
                url: err
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_default(),
                status: status.as_u16(),
            },
            None => Self::NetworkError(err.to_string()),
        }
    }
}

// Implement From for reqwest header errors (needs custom message)
impl From<reqwest::header::InvalidHeaderValue> for FindBzsError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        Self::Configuration(format!("Invalid header value: {}", err))
    }
}
