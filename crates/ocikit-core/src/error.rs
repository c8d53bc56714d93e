//! Fatal replication errors.
//!
//! Only failures that prevent a run from proceeding at all live here.
//! Per-asset failures are not errors at this level — the driver reports
//! them as [`crate::ReplicationEvent::Failed`] and moves on.

use ocikit_client::ClientError;

/// Setup failures that abort a replication run.
#[derive(Debug, thiserror::Error)]
pub enum ReplicateError {
    /// A vault lookup failed; without endpoints no replication is possible.
    #[error("failed to resolve vault {vault_id}: {source}")]
    ResolveVault {
        vault_id: String,
        #[source]
        source: ClientError,
    },

    /// The target vault's transport wrapping key could not be fetched.
    #[error("failed to fetch wrapping key from target vault: {0}")]
    WrappingKey(#[source] ClientError),

    /// Listing the target collection failed; without the index there is no
    /// create-vs-update decision.
    #[error("failed to list target assets: {0}")]
    ListTarget(#[source] ClientError),

    /// Listing the source collection failed, including mid-pagination.
    #[error("failed to list source assets: {0}")]
    ListSource(#[source] ClientError),

    /// A service client could not be constructed.
    #[error("client construction failed: {0}")]
    Client(#[from] ClientError),
}
