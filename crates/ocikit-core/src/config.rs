//! Run configuration, built once at startup and held immutable for the
//! duration of a run.

use ocikit_client::kms::DEFAULT_WRAPPING_ALGORITHM;

/// Identifies one vault: region, owning compartment, and vault OCID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultRef {
    pub region: String,
    pub compartment_id: String,
    pub vault_id: String,
}

impl VaultRef {
    pub fn new(
        region: impl Into<String>,
        compartment_id: impl Into<String>,
        vault_id: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            compartment_id: compartment_id.into(),
            vault_id: vault_id.into(),
        }
    }
}

/// Configuration for a key backup run.
#[derive(Debug, Clone)]
pub struct KeyBackupConfig {
    pub source: VaultRef,
    pub target: VaultRef,
    /// Algorithm used to wrap key material for transport.
    pub wrapping_algorithm: String,
}

impl KeyBackupConfig {
    pub fn new(source: VaultRef, target: VaultRef) -> Self {
        Self {
            source,
            target,
            wrapping_algorithm: DEFAULT_WRAPPING_ALGORITHM.to_owned(),
        }
    }
}

/// Configuration for a secret backup run.
#[derive(Debug, Clone)]
pub struct SecretBackupConfig {
    pub source: VaultRef,
    pub target: VaultRef,
    /// Encryption key in the target vault protecting newly created secrets.
    pub target_key_id: String,
}
