//! Subdomain discovery.
//!
//! Replays ownership events under a parent name, keeps the latest event per
//! label, recovers label text, then asks the registry for the current owner
//! of every discovered subname.
//!
//! # Ordering
//!
//! Owner lookups run concurrently (bounded by `owner_lookup_concurrency`)
//! but results are reassembled in deduplicated order, newest label first,
//! never in completion order.
//!
//! # Failure
//!
//! A listing either returns every record or fails as a whole. One failed
//! owner lookup fails the listing with [`RegistryError::OwnerLookup`].

use ensdex_core::{namehash, namehash_with_label_hash, normalize_name, Address, LabelHash};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::collector;
use crate::dedup::dedupe;
use crate::error::{RegistryError, RegistryResult};
use crate::ledger::RegistryContext;
use crate::reconcile::{reconcile, ReconciledLabel};

/// One discovered subname and its current owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubdomainRecord {
    pub label_hash: LabelHash,
    /// Label text, or its fallback encoding when unresolved
    pub label: String,
    pub resolved: bool,
    /// Normalized parent name
    pub parent: String,
    /// `<label>.<parent>`
    pub name: String,
    /// Owner at query time, independent of the event that surfaced the label
    pub owner: Address,
}

/// List the subnames ever registered under `parent`.
pub async fn list_subdomains(
    ctx: &RegistryContext,
    parent: &str,
) -> RegistryResult<Vec<SubdomainRecord>> {
    list_subdomains_cancellable(ctx, parent, &CancellationToken::new()).await
}

/// [`list_subdomains`], abandoned with [`RegistryError::Cancelled`] as soon
/// as `cancel` fires. In-flight requests are dropped, not leaked.
pub async fn list_subdomains_cancellable(
    ctx: &RegistryContext,
    parent: &str,
    cancel: &CancellationToken,
) -> RegistryResult<Vec<SubdomainRecord>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(parent = %parent, "Subdomain listing cancelled");
            Err(RegistryError::Cancelled)
        }
        result = discover(ctx, parent) => result,
    }
}

async fn discover(ctx: &RegistryContext, parent: &str) -> RegistryResult<Vec<SubdomainRecord>> {
    let parent = normalize_name(parent)?;
    let parent_node = namehash(&parent)?;

    let from_block = collector::start_block(ctx).await?;
    let events = collector::collect(ctx, &parent_node, from_block).await?;
    let events = dedupe(events);

    let hashes: Vec<LabelHash> = events.iter().map(|event| event.label).collect();
    let labels = reconcile(ctx, &hashes).await?;

    let registry = ctx.registry();
    let parent_name: &str = &parent;
    let parent_node = &parent_node;
    let lookups = labels.into_iter().map(move |label: ReconciledLabel| {
        let node = namehash_with_label_hash(&label.label_hash, parent_node);
        async move {
            let display = label.display_label();
            let name = format!("{}.{}", display, parent_name);
            match registry.owner(node).await {
                Ok(owner) => Ok(SubdomainRecord {
                    label_hash: label.label_hash,
                    resolved: label.is_resolved(),
                    label: display,
                    parent: parent_name.to_string(),
                    name,
                    owner,
                }),
                Err(source) => Err(RegistryError::OwnerLookup {
                    name,
                    source: Box::new(source),
                }),
            }
        }
    });

    let records: Vec<SubdomainRecord> = stream::iter(lookups)
        .buffered(ctx.config().owner_lookup_concurrency.max(1))
        .try_collect()
        .await?;

    info!(
        parent = %parent,
        subdomains = records.len(),
        unresolved = records.iter().filter(|r| !r.resolved).count(),
        "Listed subdomains"
    );

    Ok(records)
}
