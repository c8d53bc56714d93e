//! Error types shared by every service client.

/// All errors a service client can produce.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Missing or invalid client configuration.
    #[error("client config error: {0}")]
    Config(String),

    /// The service returned a non-success HTTP status.
    #[error("service error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message decoded from the service response, or the bare
        /// status line when the body carried none.
        message: String,
    },

    /// The service replied successfully but the payload was missing data.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP-level failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("response decode error: {0}")]
    Json(#[from] serde_json::Error),
}
