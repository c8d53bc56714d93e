//! Request signing seam.
//!
//! The toolkit never handles raw credentials. A [`Signer`] attaches whatever
//! authentication material the deployment uses to an outgoing request; the
//! bundled [`SecurityTokenSigner`] carries an opaque session token of the
//! kind minted for instance principals.

use reqwest::RequestBuilder;

use crate::error::ClientError;

/// Applies authentication to an outgoing request.
pub trait Signer: Send + Sync {
    /// Attach credentials to `req` and return the builder.
    fn sign(&self, req: RequestBuilder) -> RequestBuilder;
}

/// Signer holding an opaque, already-acquired security token.
pub struct SecurityTokenSigner {
    token: String,
}

impl SecurityTokenSigner {
    /// Build a signer from a session token.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the token is empty.
    pub fn new(token: impl Into<String>) -> Result<Self, ClientError> {
        let token = token.into().trim().to_owned();
        if token.is_empty() {
            return Err(ClientError::Config("security token is empty".to_owned()));
        }
        Ok(Self { token })
    }
}

impl Signer for SecurityTokenSigner {
    fn sign(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("Authorization", format!("Bearer {}", self.token))
    }
}
