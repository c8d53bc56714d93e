//! Secrets vault management and bundle retrieval clients.
//!
//! Management (list/create/update) and retrieval (read the current bundle)
//! are separate services with separate regional endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::endpoints;
use crate::error::ClientError;
use crate::signer::Signer;
use crate::transport::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT, Transport};

const VAULT_API_VERSION: &str = "20180608";
const RETRIEVAL_API_VERSION: &str = "20190301";

/// Administrative lifecycle state of a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecretLifecycleState {
    Creating,
    Active,
    Updating,
    Deleting,
    Deleted,
    SchedulingDeletion,
    PendingDeletion,
    CancellingDeletion,
    Failed,
    #[serde(other)]
    Unknown,
}

impl SecretLifecycleState {
    /// Wire value used in list filters.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Creating => "CREATING",
            Self::Active => "ACTIVE",
            Self::Updating => "UPDATING",
            Self::Deleting => "DELETING",
            Self::Deleted => "DELETED",
            Self::SchedulingDeletion => "SCHEDULING_DELETION",
            Self::PendingDeletion => "PENDING_DELETION",
            Self::CancellingDeletion => "CANCELLING_DELETION",
            Self::Failed => "FAILED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Summary entry from a secret listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretSummary {
    pub id: String,
    pub secret_name: String,
    pub compartment_id: String,
    pub vault_id: String,
    pub lifecycle_state: SecretLifecycleState,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub key_id: Option<String>,
}

/// Base64 secret payload; zeroed when dropped.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretContent(String);

impl SecretContent {
    pub fn new(content: impl Into<String>) -> Self {
        Self(content.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretContent(****)")
    }
}

/// Payload block shared by create and update calls.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretContentDetails {
    pub content_type: String,
    pub stage: String,
    pub content: SecretContent,
}

impl SecretContentDetails {
    /// Base64 content promoted to the current stage.
    pub fn base64_current(content: SecretContent) -> Self {
        Self {
            content_type: "BASE64".to_owned(),
            stage: "CURRENT".to_owned(),
            content,
        }
    }
}

/// Parameters for creating a secret.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSecretDetails {
    pub compartment_id: String,
    pub vault_id: String,
    /// Encryption key in the vault that protects this secret.
    pub key_id: String,
    pub secret_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub secret_content: SecretContentDetails,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub freeform_tags: HashMap<String, String>,
}

/// Management-plane operations on secrets.
#[async_trait]
pub trait VaultsApi: Send + Sync {
    /// Every matching secret in the compartment/vault, across all pages.
    async fn list_secrets(
        &self,
        compartment_id: &str,
        vault_id: &str,
        lifecycle_state: Option<SecretLifecycleState>,
    ) -> Result<Vec<SecretSummary>, ClientError>;

    /// Create a secret; returns the new secret's identifier.
    async fn create_secret(&self, details: &CreateSecretDetails) -> Result<String, ClientError>;

    /// Replace an existing secret's current content, leaving every other
    /// attribute untouched.
    async fn update_secret(
        &self,
        secret_id: &str,
        content: &SecretContent,
    ) -> Result<(), ClientError>;
}

/// Retrieval-plane operations on secrets.
#[async_trait]
pub trait SecretsApi: Send + Sync {
    /// The current bundle's base64 content.
    async fn get_secret_bundle(&self, secret_id: &str) -> Result<SecretContent, ClientError>;
}

/// Regional secrets management client.
pub struct VaultsClient {
    transport: Transport,
}

impl VaultsClient {
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new(region: &str, signer: Arc<dyn Signer>) -> Result<Self, ClientError> {
        let transport = Transport::new(
            endpoints::vaults(region),
            signer,
            DEFAULT_CONNECT_TIMEOUT,
            DEFAULT_READ_TIMEOUT,
        )?;
        Ok(Self { transport })
    }
}

#[async_trait]
impl VaultsApi for VaultsClient {
    async fn list_secrets(
        &self,
        compartment_id: &str,
        vault_id: &str,
        lifecycle_state: Option<SecretLifecycleState>,
    ) -> Result<Vec<SecretSummary>, ClientError> {
        let mut query = vec![
            ("compartmentId", compartment_id.to_owned()),
            ("vaultId", vault_id.to_owned()),
        ];
        if let Some(state) = lifecycle_state {
            query.push(("lifecycleState", state.as_str().to_owned()));
        }
        self.transport
            .get_all_pages(&format!("/{VAULT_API_VERSION}/secrets"), &query)
            .await
    }

    async fn create_secret(&self, details: &CreateSecretDetails) -> Result<String, ClientError> {
        #[derive(Deserialize)]
        struct Created {
            id: String,
        }
        let created: Created = self
            .transport
            .post_json(
                &format!("/{VAULT_API_VERSION}/secrets"),
                &serde_json::to_value(details)?,
            )
            .await?;
        Ok(created.id)
    }

    async fn update_secret(
        &self,
        secret_id: &str,
        content: &SecretContent,
    ) -> Result<(), ClientError> {
        let body = json!({
            "secretContent": SecretContentDetails::base64_current(content.clone()),
        });
        self.transport
            .put_ignore_body(&format!("/{VAULT_API_VERSION}/secrets/{secret_id}"), &body)
            .await
    }
}

/// Regional secret-bundle retrieval client.
pub struct SecretsClient {
    transport: Transport,
}

impl SecretsClient {
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new(region: &str, signer: Arc<dyn Signer>) -> Result<Self, ClientError> {
        let transport = Transport::new(
            endpoints::secret_retrieval(region),
            signer,
            DEFAULT_CONNECT_TIMEOUT,
            DEFAULT_READ_TIMEOUT,
        )?;
        Ok(Self { transport })
    }
}

#[async_trait]
impl SecretsApi for SecretsClient {
    async fn get_secret_bundle(&self, secret_id: &str) -> Result<SecretContent, ClientError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Bundle {
            secret_bundle_content: BundleContent,
        }
        #[derive(Deserialize)]
        struct BundleContent {
            content: SecretContent,
        }
        let bundle: Bundle = self
            .transport
            .get_json(
                &format!("/{RETRIEVAL_API_VERSION}/secretbundles/{secret_id}"),
                &[],
            )
            .await?;
        Ok(bundle.secret_bundle_content.content)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn secret_summary_decodes_wire_casing() {
        let raw = r#"{
            "id": "ocid1.vaultsecret.oc1.phx.s1",
            "secretName": "db-password",
            "compartmentId": "ocid1.compartment.oc1..c1",
            "vaultId": "ocid1.vault.oc1.phx.v1",
            "lifecycleState": "ACTIVE",
            "description": "primary database credential"
        }"#;
        let summary: SecretSummary = serde_json::from_str(raw).unwrap();
        assert_eq!(summary.secret_name, "db-password");
        assert_eq!(summary.lifecycle_state, SecretLifecycleState::Active);
        assert_eq!(
            summary.description.as_deref(),
            Some("primary database credential")
        );
    }

    #[test]
    fn secret_content_debug_never_prints_the_payload() {
        let content = SecretContent::new("cGFzc3dvcmQ=");
        assert_eq!(format!("{content:?}"), "SecretContent(****)");
    }

    #[test]
    fn create_details_serialize_in_wire_casing() {
        let details = CreateSecretDetails {
            compartment_id: "c1".to_owned(),
            vault_id: "v1".to_owned(),
            key_id: "k1".to_owned(),
            secret_name: "db-password".to_owned(),
            description: None,
            secret_content: SecretContentDetails::base64_current(SecretContent::new("Yg==")),
            freeform_tags: HashMap::new(),
        };
        let value = serde_json::to_value(&details).unwrap();
        assert_eq!(value["secretName"], "db-password");
        assert_eq!(value["secretContent"]["contentType"], "BASE64");
        assert_eq!(value["secretContent"]["stage"], "CURRENT");
        assert!(value.get("description").is_none());
        assert!(value.get("freeformTags").is_none());
    }
}
