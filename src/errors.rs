use thiserror::Error;

/// All errors that can occur when talking to a SABnzbd instance.
#[derive(Error, Debug)]
pub enum SabnzbdError {
    /// The API key is missing, rejected by the server, or the request was
    /// refused (HTTP 401/403).
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// A non-success HTTP status with the response body.
    #[error("API error {status_code}: {message}")]
    Api {
        status_code: u16,
        message: String,
        body: Option<serde_json::Value>,
    },

    /// The server answered `{"status": false, "error": ...}`.
    #[error("server reported an error: {message}")]
    Server { message: String },

    /// A transport-level HTTP error from reqwest.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Host, port or base URL did not form a valid endpoint.
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The response body was not JSON or did not have the expected shape.
    #[error("could not decode `{mode}` response: {source}")]
    Decode {
        mode: String,
        #[source]
        source: serde_json::Error,
    },

    /// Waiting for completion exceeded the configured timeout.
    #[error("wait timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// At least one history entry reached the `Failed` status.
    #[error("download failed for {ids:?}: {message}")]
    DownloadFailed { ids: Vec<String>, message: String },

    /// A completion check was asked about an empty set of jobs.
    #[error("no job ids to check")]
    NoJobIds,
}

/// A convenience alias for `Result<T, SabnzbdError>`.
pub type Result<T> = std::result::Result<T, SabnzbdError>;
