//! The replication driver: one strictly sequential pass over the source
//! collection, with per-asset failure isolation.

use std::collections::HashMap;

use async_trait::async_trait;
use ocikit_client::ClientError;

use crate::error::ReplicateError;

/// Tag key recording the originating vault on first creation.
pub const TAG_SOURCE_VAULT: &str = "source_vault";

/// Logical name → target-side identifier for everything already present in
/// the target vault.
///
/// Built once per run before the per-asset loop and never mutated by it.
#[derive(Debug, Default)]
pub struct TargetIndex {
    by_name: HashMap<String, String>,
}

impl TargetIndex {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            by_name: pairs.into_iter().collect(),
        }
    }

    /// Target identifier for a logical name, if that name is already taken.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Whether an asset may be written to the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    /// Skipped by policy; the reason is reported, not treated as a failure.
    Skip(String),
}

/// What the writer did for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// A new asset was created in the target.
    Created,
    /// An existing target asset's payload was replaced.
    Updated,
}

/// Progress notifications emitted by [`replicate`].
#[derive(Debug)]
pub enum ReplicationEvent {
    /// An eligible asset is about to be copied.
    Copying { name: String, source_id: String },
    /// The asset was written to the target.
    Copied {
        name: String,
        source_id: String,
        outcome: CopyOutcome,
    },
    /// The asset was skipped by an eligibility rule.
    Skipped {
        name: String,
        source_id: String,
        reason: String,
    },
    /// Export/read or write failed for this asset; the run continues.
    Failed {
        name: String,
        source_id: String,
        error: ClientError,
    },
}

/// One replicable asset kind: how to list, classify, and copy it.
#[async_trait]
pub trait AssetFlow {
    type Asset: Send + Sync;

    /// Logical name — the cross-vault matching key.
    fn name(asset: &Self::Asset) -> &str;

    /// Source-side identifier, used only for reporting.
    fn source_id(asset: &Self::Asset) -> &str;

    /// One-time setup before any listing. Failure is fatal to the run.
    async fn prepare(&mut self) -> Result<(), ReplicateError> {
        Ok(())
    }

    /// Build the logical-name index of the target vault.
    async fn list_target(&self) -> Result<TargetIndex, ReplicateError>;

    /// The full source collection, in the order assets will be processed.
    async fn list_source(&self) -> Result<Vec<Self::Asset>, ReplicateError>;

    /// Policy check applied before any per-asset remote call.
    fn eligibility(&self, asset: &Self::Asset) -> Eligibility;

    /// Read the asset from the source and write it to the target: update
    /// `existing_id` in place when the logical name is already taken,
    /// create otherwise.
    async fn copy(
        &self,
        asset: &Self::Asset,
        existing_id: Option<&str>,
    ) -> Result<CopyOutcome, ClientError>;
}

/// Run one replication pass.
///
/// Strictly sequential and non-retrying: prepare, index the target, list the
/// source, then walk the source collection once in listed order. Setup
/// failures abort the run; per-asset failures are reported through
/// `on_event` and the loop continues with the next asset. Returns `Ok(())`
/// whenever the source collection was fully walked, regardless of how many
/// assets were skipped or failed.
///
/// # Errors
///
/// Only the fatal setup failures in [`ReplicateError`].
pub async fn replicate<F: AssetFlow + Send>(
    flow: &mut F,
    mut on_event: impl FnMut(ReplicationEvent),
) -> Result<(), ReplicateError> {
    flow.prepare().await?;

    let index = flow.list_target().await?;
    tracing::debug!(existing = index.len(), "target index built");

    let assets = flow.list_source().await?;
    tracing::debug!(count = assets.len(), "source collection listed");

    for asset in &assets {
        let name = F::name(asset).to_owned();
        let source_id = F::source_id(asset).to_owned();

        match flow.eligibility(asset) {
            Eligibility::Skip(reason) => {
                tracing::debug!(%name, %reason, "asset skipped");
                on_event(ReplicationEvent::Skipped {
                    name,
                    source_id,
                    reason,
                });
                continue;
            }
            Eligibility::Eligible => {}
        }

        on_event(ReplicationEvent::Copying {
            name: name.clone(),
            source_id: source_id.clone(),
        });

        match flow.copy(asset, index.get(&name)).await {
            Ok(outcome) => on_event(ReplicationEvent::Copied {
                name,
                source_id,
                outcome,
            }),
            Err(error) => {
                tracing::debug!(%name, %error, "asset copy failed");
                on_event(ReplicationEvent::Failed {
                    name,
                    source_id,
                    error,
                });
            }
        }
    }

    Ok(())
}
