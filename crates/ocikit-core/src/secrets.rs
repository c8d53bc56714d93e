//! Secret replication: read each active source secret's current bundle and
//! create-or-update it by name in the target vault.
//!
//! Eligibility is decided at listing time — only `ACTIVE` secrets are
//! requested from the source at all.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ocikit_client::secrets::{
    CreateSecretDetails, SecretContentDetails, SecretLifecycleState, SecretSummary, SecretsApi,
    SecretsClient, VaultsApi, VaultsClient,
};
use ocikit_client::{ClientError, Signer};

use crate::config::SecretBackupConfig;
use crate::driver::{
    AssetFlow, CopyOutcome, Eligibility, ReplicationEvent, TAG_SOURCE_VAULT, TargetIndex,
    replicate,
};
use crate::error::ReplicateError;

/// Tag key recording the originating secret on first creation.
pub const TAG_SOURCE_SECRET: &str = "source_secret";

/// Secret-kind flow over any vaults/retrieval API implementations.
pub struct SecretFlow<V, S> {
    source_vaults: V,
    source_bundles: S,
    target_vaults: V,
    config: SecretBackupConfig,
}

impl<V: VaultsApi, S: SecretsApi> SecretFlow<V, S> {
    pub fn new(source_vaults: V, source_bundles: S, target_vaults: V, config: SecretBackupConfig) -> Self {
        Self {
            source_vaults,
            source_bundles,
            target_vaults,
            config,
        }
    }
}

#[async_trait]
impl<V: VaultsApi, S: SecretsApi> AssetFlow for SecretFlow<V, S> {
    type Asset = SecretSummary;

    fn name(asset: &SecretSummary) -> &str {
        &asset.secret_name
    }

    fn source_id(asset: &SecretSummary) -> &str {
        &asset.id
    }

    async fn list_target(&self) -> Result<TargetIndex, ReplicateError> {
        let secrets = self
            .target_vaults
            .list_secrets(
                &self.config.target.compartment_id,
                &self.config.target.vault_id,
                None,
            )
            .await
            .map_err(ReplicateError::ListTarget)?;
        Ok(TargetIndex::from_pairs(
            secrets.into_iter().map(|secret| (secret.secret_name, secret.id)),
        ))
    }

    async fn list_source(&self) -> Result<Vec<SecretSummary>, ReplicateError> {
        self.source_vaults
            .list_secrets(
                &self.config.source.compartment_id,
                &self.config.source.vault_id,
                Some(SecretLifecycleState::Active),
            )
            .await
            .map_err(ReplicateError::ListSource)
    }

    fn eligibility(&self, _asset: &SecretSummary) -> Eligibility {
        // The source listing is already filtered to ACTIVE.
        Eligibility::Eligible
    }

    async fn copy(
        &self,
        asset: &SecretSummary,
        existing_id: Option<&str>,
    ) -> Result<CopyOutcome, ClientError> {
        let content = self.source_bundles.get_secret_bundle(&asset.id).await?;

        match existing_id {
            Some(target_id) => {
                self.target_vaults.update_secret(target_id, &content).await?;
                Ok(CopyOutcome::Updated)
            }
            None => {
                let freeform_tags = HashMap::from([
                    (
                        TAG_SOURCE_VAULT.to_owned(),
                        self.config.source.vault_id.clone(),
                    ),
                    (TAG_SOURCE_SECRET.to_owned(), asset.id.clone()),
                ]);
                let details = CreateSecretDetails {
                    compartment_id: self.config.target.compartment_id.clone(),
                    vault_id: self.config.target.vault_id.clone(),
                    key_id: self.config.target_key_id.clone(),
                    secret_name: asset.secret_name.clone(),
                    description: asset.description.clone(),
                    secret_content: SecretContentDetails::base64_current(content),
                    freeform_tags,
                };
                self.target_vaults.create_secret(&details).await?;
                Ok(CopyOutcome::Created)
            }
        }
    }
}

/// Build the regional clients and copy every active secret from the source
/// vault into the target vault.
///
/// # Errors
///
/// Fatal setup failures only; per-asset failures surface as
/// [`ReplicationEvent::Failed`] through `on_event`.
pub async fn run_secret_backup(
    config: SecretBackupConfig,
    signer: Arc<dyn Signer>,
    on_event: impl FnMut(ReplicationEvent),
) -> Result<(), ReplicateError> {
    let source_vaults = VaultsClient::new(&config.source.region, Arc::clone(&signer))?;
    let source_bundles = SecretsClient::new(&config.source.region, Arc::clone(&signer))?;
    let target_vaults = VaultsClient::new(&config.target.region, signer)?;

    let mut flow = SecretFlow::new(source_vaults, source_bundles, target_vaults, config);
    replicate(&mut flow, on_event).await
}
