//! Event collection: replays `NewOwner` logs for one parent node.

use ensdex_core::{Address, LabelHash, NameHash};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RegistryResult;
use crate::ledger::RegistryContext;

/// One historical ownership assignment of a label under a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipEvent {
    pub label: LabelHash,
    /// Owner assigned by this event; not necessarily the current owner
    pub owner: Address,
    pub block_number: u64,
    /// Position in the ledger replay, oldest = 0
    pub position: usize,
}

/// First block to scan: the configured override, else the registry's
/// deployment block.
pub async fn start_block(ctx: &RegistryContext) -> RegistryResult<u64> {
    match ctx.config().start_block {
        Some(block) => Ok(block),
        None => ctx.registry().deployment_block().await,
    }
}

/// Collect ownership events under `parent` from `from_block` onwards, in
/// ledger order (oldest first). Read-only; transport errors propagate.
pub async fn collect(
    ctx: &RegistryContext,
    parent: &NameHash,
    from_block: u64,
) -> RegistryResult<Vec<OwnershipEvent>> {
    let logs = ctx.registry().new_owner_logs(*parent, from_block).await?;
    let total = logs.len();

    let events: Vec<OwnershipEvent> = logs
        .into_iter()
        .filter(|log| {
            if log.node != *parent {
                warn!(parent = %parent, node = %log.node, "Dropping NewOwner log for another node");
                return false;
            }
            true
        })
        .enumerate()
        .map(|(position, log)| OwnershipEvent {
            label: log.label,
            owner: log.owner,
            block_number: log.block_number,
            position,
        })
        .collect();

    debug!(
        parent = %parent,
        from_block,
        logs = total,
        events = events.len(),
        "Collected ownership events"
    );

    Ok(events)
}
