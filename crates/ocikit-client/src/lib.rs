//! HTTP clients for Oracle-Cloud-style infrastructure services.
//!
//! Thin reqwest wrappers over the REST APIs this toolkit drives: KMS vault
//! lookup, key management and crypto operations, the secrets vault service,
//! secret-bundle retrieval, generative-AI inference, agent runtime, and the
//! per-service endpoints of a roving-edge appliance. Every client is fully
//! configured at construction and immutable afterwards; authentication is
//! applied through the [`Signer`] seam and never inspected here.

pub mod agent;
pub mod edge;
pub mod endpoints;
mod error;
pub mod genai;
pub mod kms;
pub mod secrets;
mod signer;
mod transport;

pub use error::ClientError;
pub use signer::{SecurityTokenSigner, Signer};
