//! Client error types.

/// Errors that can occur when using the z-cohort client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed, including an undecodable success body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response not covered by a specific variant.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// User, segment or membership not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The user is already assigned to the segment.
    #[error("already assigned: {0}")]
    AlreadyAssigned(String),

    /// A unique field is already taken.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The server rejected the input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}
