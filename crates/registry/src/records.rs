//! Name record lookups: owner, resolver, address, content and reverse name.
//!
//! A resolver that cannot answer (no resolver set, or the call reverts) is
//! reported as a value ([`AddrRecord`], [`ContentRecord`]) rather than an
//! error. Transport failures still propagate.

use ensdex_core::{
    label_hash_in, namehash, namehash_with_label_hash, normalize_name, selector, Address,
    LabelHash, NameHash,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::ledger::RegistryContext;

/// Method signature whose selector identifies contenthash-capable resolvers
pub const CONTENTHASH_SIGNATURE: &str = "contenthash(bytes32)";

/// Address record of a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddrRecord {
    NoResolver,
    Set(Address),
    /// The resolver call reverted
    Unavailable(String),
}

/// Which resolver method a content value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    ContentHash,
    OldContent,
}

/// Content record of a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentRecord {
    NoResolver,
    Set { value: Vec<u8>, kind: ContentKind },
    /// The resolver call reverted
    Unavailable(String),
}

/// Owner, resolver and resolver records of one name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainDetails {
    pub name: String,
    pub label: String,
    pub label_hash: LabelHash,
    pub parent: Option<String>,
    pub owner: Address,
    pub resolver: Address,
    pub addr: AddrRecord,
    pub content: ContentRecord,
}

impl DomainDetails {
    pub fn has_resolver(&self) -> bool {
        !self.resolver.is_zero()
    }
}

/// Turn a reverted contract call into `Ok(Err(reason))`; anything else
/// keeps propagating.
fn soften<T>(result: RegistryResult<T>) -> RegistryResult<Result<T, String>> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(RegistryError::Contract(reason)) => Ok(Err(reason)),
        Err(err) => Err(err),
    }
}

pub async fn get_owner(ctx: &RegistryContext, name: &str) -> RegistryResult<Address> {
    ctx.registry().owner(namehash(name)?).await
}

pub async fn get_resolver(ctx: &RegistryContext, name: &str) -> RegistryResult<Address> {
    ctx.registry().resolver(namehash(name)?).await
}

pub async fn get_owner_with_label_hash(
    ctx: &RegistryContext,
    label_hash: &LabelHash,
    parent: &NameHash,
) -> RegistryResult<Address> {
    ctx.registry()
        .owner(namehash_with_label_hash(label_hash, parent))
        .await
}

pub async fn get_resolver_with_label_hash(
    ctx: &RegistryContext,
    label_hash: &LabelHash,
    parent: &NameHash,
) -> RegistryResult<Address> {
    ctx.registry()
        .resolver(namehash_with_label_hash(label_hash, parent))
        .await
}

async fn addr_at(
    ctx: &RegistryContext,
    resolver: Address,
    node: NameHash,
) -> RegistryResult<AddrRecord> {
    if resolver.is_zero() {
        return Ok(AddrRecord::NoResolver);
    }
    Ok(match soften(ctx.resolvers().addr(resolver, node).await)? {
        Ok(addr) => AddrRecord::Set(addr),
        Err(reason) => {
            warn!(resolver = %resolver, node = %node, %reason, "Resolver did not answer addr()");
            AddrRecord::Unavailable(reason)
        }
    })
}

async fn content_lookup(
    ctx: &RegistryContext,
    resolver: Address,
    node: NameHash,
) -> RegistryResult<(Vec<u8>, ContentKind)> {
    let resolvers = ctx.resolvers();
    if resolvers
        .supports_interface(resolver, selector(CONTENTHASH_SIGNATURE))
        .await?
    {
        Ok((resolvers.contenthash(resolver, node).await?, ContentKind::ContentHash))
    } else {
        Ok((resolvers.content(resolver, node).await?, ContentKind::OldContent))
    }
}

async fn content_at(
    ctx: &RegistryContext,
    resolver: Address,
    node: NameHash,
) -> RegistryResult<ContentRecord> {
    if resolver.is_zero() {
        return Ok(ContentRecord::NoResolver);
    }

    Ok(match soften(content_lookup(ctx, resolver, node).await)? {
        Ok((value, kind)) => ContentRecord::Set { value, kind },
        Err(reason) => {
            warn!(resolver = %resolver, node = %node, %reason, "Resolver did not answer content lookup");
            ContentRecord::Unavailable(reason)
        }
    })
}

/// Address record of `name`.
pub async fn get_addr(ctx: &RegistryContext, name: &str) -> RegistryResult<AddrRecord> {
    let node = namehash(name)?;
    let resolver = ctx.registry().resolver(node).await?;
    addr_at(ctx, resolver, node).await
}

/// Content record of `name`, preferring `contenthash` when the resolver
/// supports it.
pub async fn get_content(ctx: &RegistryContext, name: &str) -> RegistryResult<ContentRecord> {
    let node = namehash(name)?;
    let resolver = ctx.registry().resolver(node).await?;
    content_at(ctx, resolver, node).await
}

/// Reverse-record node name of an address: `<hex>.addr.reverse`.
pub fn reverse_name(address: &Address) -> String {
    format!("{}.addr.reverse", address.to_hex())
}

/// Primary name claimed by `address` through its reverse record.
pub async fn get_name(ctx: &RegistryContext, address: &Address) -> RegistryResult<Option<String>> {
    let reverse = reverse_name(address);
    let node = namehash(&reverse)?;
    let resolver = ctx.registry().resolver(node).await?;
    if resolver.is_zero() {
        return Ok(None);
    }

    match soften(ctx.resolvers().name(resolver, node).await)? {
        Ok(name) if !name.is_empty() => Ok(Some(name)),
        Ok(_) => Ok(None),
        Err(reason) => {
            warn!(address = %address, %reason, "Error getting name for reverse record");
            Ok(None)
        }
    }
}

async fn resolver_details(
    ctx: &RegistryContext,
    resolver: Address,
    node: NameHash,
) -> RegistryResult<(AddrRecord, ContentRecord)> {
    futures::try_join!(addr_at(ctx, resolver, node), content_at(ctx, resolver, node))
}

/// Owner, resolver and resolver records of `name`.
pub async fn get_domain_details(ctx: &RegistryContext, name: &str) -> RegistryResult<DomainDetails> {
    let name = normalize_name(name)?;
    let node = namehash(&name)?;
    let (label, parent) = match name.split_once('.') {
        Some((label, parent)) => (label.to_string(), Some(parent.to_string())),
        None => (name.clone(), None),
    };
    let label_hash = label_hash_in(&label)?;

    let registry = ctx.registry();
    let (owner, resolver) = futures::try_join!(registry.owner(node), registry.resolver(node))?;
    let (addr, content) = resolver_details(ctx, resolver, node).await?;

    debug!(name = %name, owner = %owner, resolver = %resolver, "Fetched domain details");

    Ok(DomainDetails {
        name,
        label,
        label_hash,
        parent,
        owner,
        resolver,
        addr,
        content,
    })
}

/// Details of `<label>.<parent>` when its owner is already known, e.g.
/// from a subdomain listing.
pub async fn build_subdomain(
    ctx: &RegistryContext,
    label: &str,
    parent: &str,
    owner: Address,
) -> RegistryResult<DomainDetails> {
    let parent = normalize_name(parent)?;
    let name = normalize_name(&format!("{}.{}", label, parent))?;
    let label = match name.split_once('.') {
        Some((label, _)) => label.to_string(),
        None => name.clone(),
    };
    let label_hash = label_hash_in(&label)?;
    let node = namehash(&name)?;

    let resolver = ctx.registry().resolver(node).await?;
    let (addr, content) = resolver_details(ctx, resolver, node).await?;

    Ok(DomainDetails {
        name,
        label,
        label_hash,
        parent: Some(parent),
        owner,
        resolver,
        addr,
        content,
    })
}
