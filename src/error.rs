use thiserror::Error;

/// Errors raised while talking to the agent service
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, reset, timeout)
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The service answered with a non-success status
    #[error("agent service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The body could not be decoded as the expected JSON shape
    #[error("failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),

    /// The body decoded but is missing required data
    #[error("invalid {0} response format")]
    InvalidResponse(&'static str),
}

/// Errors raised by the conversation controller
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a request is already in flight")]
    Busy,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors raised while assembling configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting `{0}` (config file or environment)")]
    Missing(&'static str),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
