//! Vault asset replication.
//!
//! Copies software-protected keys and active secrets from a source vault to
//! a target vault: list the source, match by logical name against what the
//! target already holds, then create or update each eligible asset. Runs
//! strictly sequentially with per-asset failure isolation — one bad asset
//! never stops the rest of the run, and nothing is retried.

pub mod config;
pub mod driver;
mod error;
pub mod keys;
pub mod secrets;

pub use config::{KeyBackupConfig, SecretBackupConfig, VaultRef};
pub use driver::{
    AssetFlow, CopyOutcome, Eligibility, ReplicationEvent, TargetIndex, replicate,
};
pub use error::ReplicateError;
