use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("discovery cancelled")]
    Cancelled,

    #[error("candidate space is empty (no domains or zero-width search window)")]
    EmptyCandidateSpace,

    #[error("no valid candidate found after probing {attempted} locations")]
    NoValidCandidate { attempted: usize },

    #[error("failed to decode playlist: {reason}")]
    Decode { reason: String },

    #[error("no live segments remain after validation")]
    ZeroValidSegments,

    #[error("segment validation stopped after {processed} of {total} segments")]
    ValidationIncomplete { processed: usize, total: usize },

    #[error("invalid path identifier `{input}`: {reason}")]
    InvalidPath { input: String, reason: String },

    #[error("invalid timestamp `{input}` (expected format `{format}`)")]
    InvalidTime { input: String, format: &'static str },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("request failed with HTTP {status} for {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("resource not found: {url}")]
    NotFound { url: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl DiscoveryError {
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    pub fn invalid_path(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Maps a non-200 response to the matching probe miss.
    pub fn http_status(status: StatusCode, url: impl Into<String>) -> Self {
        if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
            Self::NotFound { url: url.into() }
        } else {
            Self::HttpStatus {
                status,
                url: url.into(),
            }
        }
    }

    /// Whether the caller can reasonably try again with a wider window or
    /// different metadata. Nothing in this crate retries on its own.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::NoValidCandidate { .. } | Self::ZeroValidSegments => true,
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Network { .. } | Self::Io { .. } | Self::ValidationIncomplete { .. } => true,
            Self::Cancelled
            | Self::EmptyCandidateSpace
            | Self::Decode { .. }
            | Self::InvalidPath { .. }
            | Self::InvalidTime { .. }
            | Self::Configuration { .. }
            | Self::NotFound { .. } => false,
        }
    }

    /// Errors a single probe may produce without failing the whole search.
    pub fn is_probe_miss(&self) -> bool {
        matches!(
            self,
            Self::HttpStatus { .. } | Self::NotFound { .. } | Self::Network { .. }
        )
    }
}
