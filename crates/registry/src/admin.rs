//! Registry writes: ownership, resolver and record updates, subdomain
//! creation and deletion.
//!
//! Signing and submission belong to the [`RegistryWriter`](crate::ledger::RegistryWriter)
//! collaborator; these functions only compute nodes and sequence the calls.

use ensdex_core::{label_hash_in, namehash, normalize_name, Address, NameHash};
use tracing::info;

use crate::error::{RegistryError, RegistryResult};
use crate::ledger::{RegistryContext, TxReceipt};
use crate::records::reverse_name;

pub async fn set_owner(
    ctx: &RegistryContext,
    name: &str,
    owner: Address,
) -> RegistryResult<TxReceipt> {
    let node = namehash(name)?;
    ctx.writer()?.set_owner(node, owner).await
}

/// Assign `<label>.<parent>` to `owner`. The label is normalized first, or
/// decoded when it is in fallback form.
pub async fn set_subnode_owner(
    ctx: &RegistryContext,
    label: &str,
    parent: &str,
    owner: Address,
) -> RegistryResult<TxReceipt> {
    let writer = ctx.writer()?;
    let label_hash = label_hash_in(label)?;
    let parent_node = namehash(parent)?;
    writer.set_subnode_owner(parent_node, label_hash, owner).await
}

pub async fn set_resolver(
    ctx: &RegistryContext,
    name: &str,
    resolver: Address,
) -> RegistryResult<TxReceipt> {
    let node = namehash(name)?;
    ctx.writer()?.set_resolver(node, resolver).await
}

async fn require_resolver(ctx: &RegistryContext, name: &str) -> RegistryResult<(NameHash, Address)> {
    let node = namehash(name)?;
    let resolver = ctx.registry().resolver(node).await?;
    if resolver.is_zero() {
        return Err(RegistryError::NoResolver {
            name: name.to_string(),
        });
    }
    Ok((node, resolver))
}

/// Set the address record on the name's current resolver.
pub async fn set_address(
    ctx: &RegistryContext,
    name: &str,
    addr: Address,
) -> RegistryResult<TxReceipt> {
    let writer = ctx.writer()?;
    let (node, resolver) = require_resolver(ctx, name).await?;
    writer.set_addr(resolver, node, addr).await
}

/// Set the contenthash record on the name's current resolver.
pub async fn set_contenthash(
    ctx: &RegistryContext,
    name: &str,
    hash: Vec<u8>,
) -> RegistryResult<TxReceipt> {
    let writer = ctx.writer()?;
    let (node, resolver) = require_resolver(ctx, name).await?;
    writer.set_contenthash(resolver, node, hash).await
}

/// Set the legacy content record on the name's current resolver.
pub async fn set_content(
    ctx: &RegistryContext,
    name: &str,
    content: [u8; 32],
) -> RegistryResult<TxReceipt> {
    let writer = ctx.writer()?;
    let (node, resolver) = require_resolver(ctx, name).await?;
    writer.set_content(resolver, node, content).await
}

/// Point the writer account's reverse record at `name`.
pub async fn set_reverse_record_name(ctx: &RegistryContext, name: &str) -> RegistryResult<TxReceipt> {
    let writer = ctx.writer()?;
    let name = normalize_name(name)?;
    let account = writer.account().await?;
    let (node, resolver) = require_resolver(ctx, &reverse_name(&account)).await?;
    writer.set_name(resolver, node, name).await
}

/// Create `<label>.<parent>` owned by the writer account.
pub async fn create_subdomain(
    ctx: &RegistryContext,
    label: &str,
    parent: &str,
) -> RegistryResult<TxReceipt> {
    let account = ctx.writer()?.account().await?;
    let receipt = set_subnode_owner(ctx, label, parent, account).await?;
    info!(label = %label, parent = %parent, owner = %account, "Created subdomain");
    Ok(receipt)
}

/// Delete `<label>.<parent>`: when a resolver is set, reclaim the subnode and
/// clear its resolver first, then hand ownership to the zero address.
///
/// Receipts are returned in submission order.
pub async fn delete_subdomain(
    ctx: &RegistryContext,
    label: &str,
    parent: &str,
) -> RegistryResult<Vec<TxReceipt>> {
    let writer = ctx.writer()?;
    let name = normalize_name(&format!("{}.{}", label, parent))?;
    let node = namehash(&name)?;
    let mut receipts = Vec::with_capacity(3);

    if !ctx.registry().resolver(node).await?.is_zero() {
        let account = writer.account().await?;
        receipts.push(set_subnode_owner(ctx, label, parent, account).await?);
        receipts.push(writer.set_resolver(node, Address::ZERO).await?);
    }
    receipts.push(set_subnode_owner(ctx, label, parent, Address::ZERO).await?);

    info!(name = %name, transactions = receipts.len(), "Deleted subdomain");
    Ok(receipts)
}
