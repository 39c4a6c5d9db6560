use thiserror::Error;

/// Failure of an external collaborator call. None of these is fatal: the
/// caller keeps the page as it was and tells the user.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} answered {status}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        /// Machine-readable error code of the response body, when present.
        code: Option<String>,
        message: String,
    },

    #[error("{endpoint} answered without code")]
    MissingCode { endpoint: String },

    #[error("failed to decode response of {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, CollaboratorError>;
