//! Failure taxonomy for a single proxied exchange.

use thiserror::Error;

/// Every variant is terminal for the connection it occurred on.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to read request: {0}")]
    Read(#[source] std::io::Error),

    #[error("malformed request line {line:?}")]
    MalformedRequestLine { line: String },

    #[error("please specify a URL after /proxy/ (received {target:?} instead)")]
    MissingProxyMarker { target: String },

    #[error("malformed form pair {pair:?}, expected key=value")]
    MalformedBody { pair: String },

    #[error("request method {0} unimplemented, try GET or POST")]
    Unimplemented(String),

    #[error("invalid target URL {url:?}: {source}")]
    InvalidTargetUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported scheme in target URL {0}")]
    UnsupportedScheme(String),

    #[error("User-Agent {0:?} is not a valid header value")]
    InvalidUserAgent(String),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("failed to relay response: {0}")]
    Relay(#[source] std::io::Error),
}

impl ForwardError {
    /// Whether the client's request itself was unusable, as opposed to the
    /// upstream exchange failing.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            ForwardError::MalformedRequestLine { .. }
                | ForwardError::MissingProxyMarker { .. }
                | ForwardError::MalformedBody { .. }
        )
    }
}
