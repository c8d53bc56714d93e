//! Key replication: export each eligible source key wrapped under the
//! target vault's transport key, then import it into the target.
//!
//! Only software-protected, enabled keys have an export path; everything
//! else is skipped before any crypto call is made.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ocikit_client::kms::{
    ImportKeyDetails, KeyLifecycleState, KeySummary, KmsCryptoApi, KmsCryptoClient,
    KmsManagementApi, KmsManagementClient, KmsVaultClient, ProtectionMode, WrappedKeyMaterial,
};
use ocikit_client::{ClientError, Signer};

use crate::config::KeyBackupConfig;
use crate::driver::{
    AssetFlow, CopyOutcome, Eligibility, ReplicationEvent, TAG_SOURCE_VAULT, TargetIndex,
    replicate,
};
use crate::error::ReplicateError;

/// Tag key recording the originating key on first creation.
pub const TAG_SOURCE_KEY: &str = "source_key";

/// Key-kind flow over any management/crypto API implementations.
pub struct KeyFlow<M, C> {
    source_mgmt: M,
    source_crypto: C,
    target_mgmt: M,
    config: KeyBackupConfig,
    wrapping_key: Option<String>,
}

impl<M: KmsManagementApi, C: KmsCryptoApi> KeyFlow<M, C> {
    pub fn new(source_mgmt: M, source_crypto: C, target_mgmt: M, config: KeyBackupConfig) -> Self {
        Self {
            source_mgmt,
            source_crypto,
            target_mgmt,
            config,
            wrapping_key: None,
        }
    }
}

#[async_trait]
impl<M: KmsManagementApi, C: KmsCryptoApi> AssetFlow for KeyFlow<M, C> {
    type Asset = KeySummary;

    fn name(asset: &KeySummary) -> &str {
        &asset.display_name
    }

    fn source_id(asset: &KeySummary) -> &str {
        &asset.id
    }

    async fn prepare(&mut self) -> Result<(), ReplicateError> {
        let wrapping_key = self
            .target_mgmt
            .get_wrapping_key()
            .await
            .map_err(ReplicateError::WrappingKey)?;
        self.wrapping_key = Some(wrapping_key);
        Ok(())
    }

    async fn list_target(&self) -> Result<TargetIndex, ReplicateError> {
        let keys = self
            .target_mgmt
            .list_keys(&self.config.target.compartment_id)
            .await
            .map_err(ReplicateError::ListTarget)?;
        Ok(TargetIndex::from_pairs(
            keys.into_iter().map(|key| (key.display_name, key.id)),
        ))
    }

    async fn list_source(&self) -> Result<Vec<KeySummary>, ReplicateError> {
        self.source_mgmt
            .list_keys(&self.config.source.compartment_id)
            .await
            .map_err(ReplicateError::ListSource)
    }

    fn eligibility(&self, asset: &KeySummary) -> Eligibility {
        if asset.protection_mode != ProtectionMode::Software {
            return Eligibility::Skip("not a software-protected key".to_owned());
        }
        if asset.lifecycle_state != KeyLifecycleState::Enabled {
            return Eligibility::Skip("key is not enabled".to_owned());
        }
        Eligibility::Eligible
    }

    async fn copy(
        &self,
        asset: &KeySummary,
        existing_id: Option<&str>,
    ) -> Result<CopyOutcome, ClientError> {
        let wrapping_key = self
            .wrapping_key
            .as_deref()
            .ok_or_else(|| ClientError::Config("wrapping key not fetched".to_owned()))?;

        let detail = self.source_mgmt.get_key(&asset.id).await?;
        let material = self
            .source_crypto
            .export_key(&asset.id, &self.config.wrapping_algorithm, wrapping_key)
            .await?;
        let wrapped = WrappedKeyMaterial {
            key_material: material,
            wrapping_algorithm: self.config.wrapping_algorithm.clone(),
        };

        match existing_id {
            Some(target_id) => {
                self.target_mgmt
                    .import_key_version(target_id, &wrapped)
                    .await?;
                Ok(CopyOutcome::Updated)
            }
            None => {
                let freeform_tags = HashMap::from([
                    (
                        TAG_SOURCE_VAULT.to_owned(),
                        self.config.source.vault_id.clone(),
                    ),
                    (TAG_SOURCE_KEY.to_owned(), asset.id.clone()),
                ]);
                let details = ImportKeyDetails {
                    compartment_id: self.config.target.compartment_id.clone(),
                    display_name: asset.display_name.clone(),
                    key_shape: detail.key_shape,
                    protection_mode: asset.protection_mode,
                    wrapped_import_key: wrapped,
                    freeform_tags,
                };
                self.target_mgmt.import_key(&details).await?;
                Ok(CopyOutcome::Created)
            }
        }
    }
}

/// Resolve both vaults' endpoints, build the clients, and copy every
/// eligible key from the source vault into the target vault.
///
/// # Errors
///
/// Fatal setup failures only; per-asset failures surface as
/// [`ReplicationEvent::Failed`] through `on_event`.
pub async fn run_key_backup(
    config: KeyBackupConfig,
    signer: Arc<dyn Signer>,
    on_event: impl FnMut(ReplicationEvent),
) -> Result<(), ReplicateError> {
    let source_lookup = KmsVaultClient::new(&config.source.region, Arc::clone(&signer))?;
    let source_vault = source_lookup
        .get_vault(&config.source.vault_id)
        .await
        .map_err(|source| ReplicateError::ResolveVault {
            vault_id: config.source.vault_id.clone(),
            source,
        })?;

    let target_lookup = KmsVaultClient::new(&config.target.region, Arc::clone(&signer))?;
    let target_vault = target_lookup
        .get_vault(&config.target.vault_id)
        .await
        .map_err(|source| ReplicateError::ResolveVault {
            vault_id: config.target.vault_id.clone(),
            source,
        })?;

    let source_mgmt = KmsManagementClient::new(&source_vault.management_endpoint, Arc::clone(&signer))?;
    let source_crypto = KmsCryptoClient::new(&source_vault.crypto_endpoint, Arc::clone(&signer))?;
    let target_mgmt = KmsManagementClient::new(&target_vault.management_endpoint, signer)?;

    let mut flow = KeyFlow::new(source_mgmt, source_crypto, target_mgmt, config);
    replicate(&mut flow, on_event).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use ocikit_client::kms::{Key, KeyShape};

    use super::*;
    use crate::config::VaultRef;

    const SOURCE_VAULT: &str = "ocid1.vault.oc1.phx.source";

    fn config() -> KeyBackupConfig {
        KeyBackupConfig::new(
            VaultRef::new("us-phoenix-1", "ocid1.compartment.oc1..source", SOURCE_VAULT),
            VaultRef::new(
                "us-ashburn-1",
                "ocid1.compartment.oc1..target",
                "ocid1.vault.oc1.iad.target",
            ),
        )
    }

    fn key(
        id: &str,
        name: &str,
        mode: ProtectionMode,
        state: KeyLifecycleState,
    ) -> KeySummary {
        KeySummary {
            id: id.to_owned(),
            display_name: name.to_owned(),
            compartment_id: "ocid1.compartment.oc1..source".to_owned(),
            vault_id: SOURCE_VAULT.to_owned(),
            lifecycle_state: state,
            protection_mode: mode,
            algorithm: Some("AES".to_owned()),
            time_created: None,
        }
    }

    #[derive(Clone, Default)]
    struct FakeMgmt {
        keys: Vec<KeySummary>,
        wrapping_key: String,
        fail_wrapping: bool,
        imports: Arc<Mutex<Vec<ImportKeyDetails>>>,
        version_imports: Arc<Mutex<Vec<(String, WrappedKeyMaterial)>>>,
    }

    #[async_trait]
    impl KmsManagementApi for FakeMgmt {
        async fn list_keys(&self, _compartment_id: &str) -> Result<Vec<KeySummary>, ClientError> {
            Ok(self.keys.clone())
        }

        async fn get_key(&self, key_id: &str) -> Result<Key, ClientError> {
            let summary = self
                .keys
                .iter()
                .find(|k| k.id == key_id)
                .ok_or_else(|| ClientError::Api {
                    status: 404,
                    message: format!("key {key_id} not found"),
                })?;
            Ok(Key {
                id: summary.id.clone(),
                display_name: summary.display_name.clone(),
                compartment_id: summary.compartment_id.clone(),
                vault_id: summary.vault_id.clone(),
                lifecycle_state: summary.lifecycle_state,
                protection_mode: summary.protection_mode,
                key_shape: KeyShape {
                    algorithm: "AES".to_owned(),
                    length: 32,
                },
            })
        }

        async fn get_wrapping_key(&self) -> Result<String, ClientError> {
            if self.fail_wrapping {
                return Err(ClientError::Api {
                    status: 500,
                    message: "wrapping key unavailable".to_owned(),
                });
            }
            Ok(self.wrapping_key.clone())
        }

        async fn import_key(&self, details: &ImportKeyDetails) -> Result<String, ClientError> {
            self.imports.lock().unwrap().push(details.clone());
            Ok(format!("ocid1.key.oc1.iad.created-{}", details.display_name))
        }

        async fn import_key_version(
            &self,
            key_id: &str,
            wrapped: &WrappedKeyMaterial,
        ) -> Result<(), ClientError> {
            self.version_imports
                .lock()
                .unwrap()
                .push((key_id.to_owned(), wrapped.clone()));
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct FakeCrypto {
        fail_key_id: Option<String>,
        exports: Arc<Mutex<Vec<(String, String)>>>,
    }

    #[async_trait]
    impl KmsCryptoApi for FakeCrypto {
        async fn export_key(
            &self,
            key_id: &str,
            _wrapping_algorithm: &str,
            public_key: &str,
        ) -> Result<String, ClientError> {
            if self.fail_key_id.as_deref() == Some(key_id) {
                return Err(ClientError::Api {
                    status: 409,
                    message: "export failed".to_owned(),
                });
            }
            self.exports
                .lock()
                .unwrap()
                .push((key_id.to_owned(), public_key.to_owned()));
            Ok(format!("wrapped-{key_id}"))
        }
    }

    fn target_with_wrapping_key() -> FakeMgmt {
        FakeMgmt {
            wrapping_key: "TARGET-PUBKEY".to_owned(),
            ..FakeMgmt::default()
        }
    }

    async fn run(source: FakeMgmt, crypto: FakeCrypto, target: FakeMgmt) -> Vec<ReplicationEvent> {
        let mut flow = KeyFlow::new(source, crypto, target, config());
        let mut events = Vec::new();
        replicate(&mut flow, |event| events.push(event))
            .await
            .unwrap();
        events
    }

    #[tokio::test]
    async fn only_enabled_software_keys_are_written() {
        let source = FakeMgmt {
            keys: vec![
                key(
                    "ocid1.key.oc1.phx.k1",
                    "k1",
                    ProtectionMode::Software,
                    KeyLifecycleState::Enabled,
                ),
                key(
                    "ocid1.key.oc1.phx.k2",
                    "k2",
                    ProtectionMode::Hsm,
                    KeyLifecycleState::Enabled,
                ),
                key(
                    "ocid1.key.oc1.phx.k3",
                    "k3",
                    ProtectionMode::Software,
                    KeyLifecycleState::Disabled,
                ),
            ],
            ..FakeMgmt::default()
        };
        let crypto = FakeCrypto::default();
        let target = target_with_wrapping_key();
        let imports = Arc::clone(&target.imports);
        let versions = Arc::clone(&target.version_imports);
        let exports = Arc::clone(&crypto.exports);

        let events = run(source, crypto, target).await;

        let imports = imports.lock().unwrap();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].display_name, "k1");
        assert_eq!(imports[0].freeform_tags[TAG_SOURCE_VAULT], SOURCE_VAULT);
        assert_eq!(
            imports[0].freeform_tags[TAG_SOURCE_KEY],
            "ocid1.key.oc1.phx.k1"
        );
        assert!(versions.lock().unwrap().is_empty());

        // The export is bound to the wrapping key fetched from the target.
        let exports = exports.lock().unwrap();
        assert_eq!(
            exports.as_slice(),
            [("ocid1.key.oc1.phx.k1".to_owned(), "TARGET-PUBKEY".to_owned())]
        );

        let skipped: Vec<&str> = events
            .iter()
            .filter_map(|event| match event {
                ReplicationEvent::Skipped { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(skipped, ["k2", "k3"]);
    }

    #[tokio::test]
    async fn existing_name_is_updated_in_place_without_tags() {
        let source = FakeMgmt {
            keys: vec![key(
                "ocid1.key.oc1.phx.k1",
                "app-key",
                ProtectionMode::Software,
                KeyLifecycleState::Enabled,
            )],
            ..FakeMgmt::default()
        };
        let target = FakeMgmt {
            keys: vec![key(
                "ocid1.key.oc1.iad.tk1",
                "app-key",
                ProtectionMode::Software,
                KeyLifecycleState::Enabled,
            )],
            ..target_with_wrapping_key()
        };
        let imports = Arc::clone(&target.imports);
        let versions = Arc::clone(&target.version_imports);

        let events = run(source, FakeCrypto::default(), target).await;

        assert!(imports.lock().unwrap().is_empty());
        let versions = versions.lock().unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].0, "ocid1.key.oc1.iad.tk1");
        assert_eq!(versions[0].1.key_material, "wrapped-ocid1.key.oc1.phx.k1");
        assert!(events.iter().any(|event| matches!(
            event,
            ReplicationEvent::Copied {
                outcome: CopyOutcome::Updated,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn one_failing_export_does_not_stop_the_run() {
        let source = FakeMgmt {
            keys: vec![
                key(
                    "ocid1.key.oc1.phx.k1",
                    "k1",
                    ProtectionMode::Software,
                    KeyLifecycleState::Enabled,
                ),
                key(
                    "ocid1.key.oc1.phx.k2",
                    "k2",
                    ProtectionMode::Software,
                    KeyLifecycleState::Enabled,
                ),
                key(
                    "ocid1.key.oc1.phx.k3",
                    "k3",
                    ProtectionMode::Software,
                    KeyLifecycleState::Enabled,
                ),
            ],
            ..FakeMgmt::default()
        };
        let crypto = FakeCrypto {
            fail_key_id: Some("ocid1.key.oc1.phx.k2".to_owned()),
            ..FakeCrypto::default()
        };
        let target = target_with_wrapping_key();
        let imports = Arc::clone(&target.imports);

        let events = run(source, crypto, target).await;

        let imports = imports.lock().unwrap();
        let imported: Vec<&str> = imports
            .iter()
            .map(|details| details.display_name.as_str())
            .collect();
        assert_eq!(imported, ["k1", "k3"]);

        let failed: Vec<&str> = events
            .iter()
            .filter_map(|event| match event {
                ReplicationEvent::Failed { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(failed, ["k2"]);
    }

    #[tokio::test]
    async fn second_run_over_unchanged_source_only_updates() {
        let source_keys = vec![key(
            "ocid1.key.oc1.phx.k1",
            "app-key",
            ProtectionMode::Software,
            KeyLifecycleState::Enabled,
        )];

        let first_target = target_with_wrapping_key();
        let first_imports = Arc::clone(&first_target.imports);
        run(
            FakeMgmt {
                keys: source_keys.clone(),
                ..FakeMgmt::default()
            },
            FakeCrypto::default(),
            first_target,
        )
        .await;
        assert_eq!(first_imports.lock().unwrap().len(), 1);

        // Same source again, target now holding the created key.
        let second_target = FakeMgmt {
            keys: vec![key(
                "ocid1.key.oc1.iad.created-app-key",
                "app-key",
                ProtectionMode::Software,
                KeyLifecycleState::Enabled,
            )],
            ..target_with_wrapping_key()
        };
        let second_imports = Arc::clone(&second_target.imports);
        let second_versions = Arc::clone(&second_target.version_imports);
        run(
            FakeMgmt {
                keys: source_keys,
                ..FakeMgmt::default()
            },
            FakeCrypto::default(),
            second_target,
        )
        .await;

        assert!(second_imports.lock().unwrap().is_empty());
        assert_eq!(second_versions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn wrapping_key_failure_aborts_the_run() {
        let target = FakeMgmt {
            fail_wrapping: true,
            ..FakeMgmt::default()
        };
        let mut flow = KeyFlow::new(FakeMgmt::default(), FakeCrypto::default(), target, config());
        let result = replicate(&mut flow, |_event| {}).await;
        assert!(matches!(result, Err(ReplicateError::WrappingKey(_))));
    }
}
