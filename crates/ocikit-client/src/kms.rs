//! KMS vault lookup, management, and crypto clients.
//!
//! Management and crypto operations are bound to vault-specific endpoints;
//! resolve those first through [`KmsVaultClient::get_vault`] and construct
//! the narrower clients from the result.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::endpoints;
use crate::error::ClientError;
use crate::signer::Signer;
use crate::transport::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT, Transport};

const API_VERSION: &str = "20180608";

/// Wrapping algorithm used for key transport unless overridden.
pub const DEFAULT_WRAPPING_ALGORITHM: &str = "RSA_OAEP_AES_SHA256";

/// Where a key's private material lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtectionMode {
    /// Exportable software keys.
    Software,
    /// Hardware-module keys; no export path exists.
    Hsm,
    /// Keys whose material is held outside the service.
    External,
}

/// Administrative lifecycle state of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyLifecycleState {
    Creating,
    Enabling,
    Enabled,
    Disabling,
    Disabled,
    Deleting,
    Deleted,
    PendingDeletion,
    SchedulingDeletion,
    CancellingDeletion,
    Updating,
    BackupInProgress,
    Restoring,
    #[serde(other)]
    Unknown,
}

/// Vault lookup result: the endpoints every other KMS call is bound to.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub id: String,
    pub display_name: String,
    pub management_endpoint: String,
    pub crypto_endpoint: String,
}

/// Summary entry from a key listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySummary {
    pub id: String,
    pub display_name: String,
    pub compartment_id: String,
    pub vault_id: String,
    pub lifecycle_state: KeyLifecycleState,
    pub protection_mode: ProtectionMode,
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub time_created: Option<String>,
}

/// Shape of a key: algorithm family plus bit length.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyShape {
    pub algorithm: String,
    pub length: u32,
}

/// Full key detail.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Key {
    pub id: String,
    pub display_name: String,
    pub compartment_id: String,
    pub vault_id: String,
    pub lifecycle_state: KeyLifecycleState,
    pub protection_mode: ProtectionMode,
    pub key_shape: KeyShape,
}

/// Key material encrypted under a transport public key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedKeyMaterial {
    /// Base64 ciphertext produced by the export operation.
    pub key_material: String,
    pub wrapping_algorithm: String,
}

/// Parameters for creating a key from wrapped material.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportKeyDetails {
    pub compartment_id: String,
    pub display_name: String,
    pub key_shape: KeyShape,
    pub protection_mode: ProtectionMode,
    pub wrapped_import_key: WrappedKeyMaterial,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub freeform_tags: HashMap<String, String>,
}

/// Management-plane operations against one vault.
#[async_trait]
pub trait KmsManagementApi: Send + Sync {
    /// Every key in the compartment, newest first, across all pages.
    async fn list_keys(&self, compartment_id: &str) -> Result<Vec<KeySummary>, ClientError>;

    async fn get_key(&self, key_id: &str) -> Result<Key, ClientError>;

    /// The vault's transport public key, PEM with newlines stripped.
    async fn get_wrapping_key(&self) -> Result<String, ClientError>;

    /// Create a key from wrapped material; returns the new key's identifier.
    async fn import_key(&self, details: &ImportKeyDetails) -> Result<String, ClientError>;

    /// Replace an existing key's material with a new wrapped version.
    async fn import_key_version(
        &self,
        key_id: &str,
        wrapped: &WrappedKeyMaterial,
    ) -> Result<(), ClientError>;
}

/// Crypto-plane operations against one vault.
#[async_trait]
pub trait KmsCryptoApi: Send + Sync {
    /// Export a software key's material encrypted under `public_key`;
    /// returns the base64 ciphertext.
    async fn export_key(
        &self,
        key_id: &str,
        wrapping_algorithm: &str,
        public_key: &str,
    ) -> Result<String, ClientError>;
}

/// Regional client resolving vaults to their service endpoints.
pub struct KmsVaultClient {
    transport: Transport,
}

impl KmsVaultClient {
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new(region: &str, signer: Arc<dyn Signer>) -> Result<Self, ClientError> {
        let transport = Transport::new(
            endpoints::kms_vault(region),
            signer,
            DEFAULT_CONNECT_TIMEOUT,
            DEFAULT_READ_TIMEOUT,
        )?;
        Ok(Self { transport })
    }

    /// Look up a vault's management and crypto endpoints.
    ///
    /// # Errors
    ///
    /// Fails if the vault does not exist or is inaccessible.
    pub async fn get_vault(&self, vault_id: &str) -> Result<Vault, ClientError> {
        self.transport
            .get_json(&format!("/{API_VERSION}/vaults/{vault_id}"), &[])
            .await
    }
}

/// Client bound to one vault's management endpoint.
pub struct KmsManagementClient {
    transport: Transport,
}

impl KmsManagementClient {
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new(management_endpoint: &str, signer: Arc<dyn Signer>) -> Result<Self, ClientError> {
        let transport = Transport::new(
            management_endpoint,
            signer,
            DEFAULT_CONNECT_TIMEOUT,
            DEFAULT_READ_TIMEOUT,
        )?;
        Ok(Self { transport })
    }
}

#[async_trait]
impl KmsManagementApi for KmsManagementClient {
    async fn list_keys(&self, compartment_id: &str) -> Result<Vec<KeySummary>, ClientError> {
        self.transport
            .get_all_pages(
                &format!("/{API_VERSION}/keys"),
                &[
                    ("compartmentId", compartment_id.to_owned()),
                    ("sortBy", "TIMECREATED".to_owned()),
                    ("sortOrder", "DESC".to_owned()),
                ],
            )
            .await
    }

    async fn get_key(&self, key_id: &str) -> Result<Key, ClientError> {
        self.transport
            .get_json(&format!("/{API_VERSION}/keys/{key_id}"), &[])
            .await
    }

    async fn get_wrapping_key(&self) -> Result<String, ClientError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct WrappingKey {
            public_key: String,
        }
        let wrapping: WrappingKey = self
            .transport
            .get_json(&format!("/{API_VERSION}/wrappingKeys"), &[])
            .await?;
        Ok(normalize_wrapping_key(&wrapping.public_key))
    }

    async fn import_key(&self, details: &ImportKeyDetails) -> Result<String, ClientError> {
        #[derive(Deserialize)]
        struct Created {
            id: String,
        }
        let created: Created = self
            .transport
            .post_json(
                &format!("/{API_VERSION}/keys/import"),
                &serde_json::to_value(details)?,
            )
            .await?;
        Ok(created.id)
    }

    async fn import_key_version(
        &self,
        key_id: &str,
        wrapped: &WrappedKeyMaterial,
    ) -> Result<(), ClientError> {
        let body = json!({ "wrappedImportKey": wrapped });
        self.transport
            .post_ignore_body(
                &format!("/{API_VERSION}/keys/{key_id}/keyVersions/import"),
                &body,
            )
            .await
    }
}

/// Client bound to one vault's crypto endpoint.
pub struct KmsCryptoClient {
    transport: Transport,
}

impl KmsCryptoClient {
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new(crypto_endpoint: &str, signer: Arc<dyn Signer>) -> Result<Self, ClientError> {
        let transport = Transport::new(
            crypto_endpoint,
            signer,
            DEFAULT_CONNECT_TIMEOUT,
            DEFAULT_READ_TIMEOUT,
        )?;
        Ok(Self { transport })
    }
}

#[async_trait]
impl KmsCryptoApi for KmsCryptoClient {
    async fn export_key(
        &self,
        key_id: &str,
        wrapping_algorithm: &str,
        public_key: &str,
    ) -> Result<String, ClientError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Exported {
            encrypted_key: String,
        }
        let body = json!({
            "keyId": key_id,
            "algorithm": wrapping_algorithm,
            "publicKey": public_key,
        });
        let exported: Exported = self
            .transport
            .post_json(&format!("/{API_VERSION}/keys/export"), &body)
            .await?;
        Ok(exported.encrypted_key)
    }
}

/// The wrapping key is sent as multi-line PEM; the export operation expects
/// it as a single line.
fn normalize_wrapping_key(pem: &str) -> String {
    pem.replace('\n', "")
}
