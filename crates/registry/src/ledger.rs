//! Collaborator interfaces and the explicit registry context.
//!
//! The ledger-access layer, the preimage-recovery service and the local
//! label dictionary are reached only through the traits below. Every
//! operation in this crate receives a [`RegistryContext`] bundling them, so
//! there is no process-wide connection state.

use async_trait::async_trait;
use ensdex_core::{Address, LabelHash, NameHash, RegistryConfig, TxHash};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{RegistryError, RegistryResult};

/// A `NewOwner(node, label, owner)` log emitted by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOwnerLog {
    /// Parent node the subnode was assigned under
    pub node: NameHash,
    /// Label hash of the assigned subnode
    pub label: LabelHash,
    /// Owner assigned by this event
    pub owner: Address,
    pub block_number: u64,
    pub log_index: u64,
}

/// Receipt of a submitted registry transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
}

/// Read access to the registry contract.
#[async_trait]
pub trait RegistryReader: Send + Sync {
    /// Current owner of a node, [`Address::ZERO`] when unowned
    async fn owner(&self, node: NameHash) -> RegistryResult<Address>;

    /// Resolver of a node, [`Address::ZERO`] when unset
    async fn resolver(&self, node: NameHash) -> RegistryResult<Address>;

    /// `NewOwner` logs whose parent topic equals `parent`, from `from_block`
    /// to the chain head, oldest first
    async fn new_owner_logs(
        &self,
        parent: NameHash,
        from_block: u64,
    ) -> RegistryResult<Vec<NewOwnerLog>>;

    /// Block the registry contract was deployed in; no earlier block holds
    /// registry events
    async fn deployment_block(&self) -> RegistryResult<u64>;
}

/// Read access to resolver contracts.
///
/// Calls against an address that is not a resolver fail with
/// [`RegistryError::Contract`].
#[async_trait]
pub trait ResolverReader: Send + Sync {
    async fn addr(&self, resolver: Address, node: NameHash) -> RegistryResult<Address>;

    async fn supports_interface(&self, resolver: Address, interface_id: [u8; 4])
        -> RegistryResult<bool>;

    async fn contenthash(&self, resolver: Address, node: NameHash) -> RegistryResult<Vec<u8>>;

    /// Legacy 32-byte content record
    async fn content(&self, resolver: Address, node: NameHash) -> RegistryResult<Vec<u8>>;

    /// Reverse record name
    async fn name(&self, resolver: Address, node: NameHash) -> RegistryResult<String>;
}

/// Signing and submitting registry and resolver transactions.
#[async_trait]
pub trait RegistryWriter: Send + Sync {
    /// Account the writer signs as
    async fn account(&self) -> RegistryResult<Address>;

    async fn set_owner(&self, node: NameHash, owner: Address) -> RegistryResult<TxReceipt>;

    async fn set_subnode_owner(
        &self,
        parent: NameHash,
        label: LabelHash,
        owner: Address,
    ) -> RegistryResult<TxReceipt>;

    async fn set_resolver(&self, node: NameHash, resolver: Address) -> RegistryResult<TxReceipt>;

    async fn set_addr(
        &self,
        resolver: Address,
        node: NameHash,
        addr: Address,
    ) -> RegistryResult<TxReceipt>;

    async fn set_contenthash(
        &self,
        resolver: Address,
        node: NameHash,
        hash: Vec<u8>,
    ) -> RegistryResult<TxReceipt>;

    /// Legacy 32-byte content record
    async fn set_content(
        &self,
        resolver: Address,
        node: NameHash,
        content: [u8; 32],
    ) -> RegistryResult<TxReceipt>;

    async fn set_name(
        &self,
        resolver: Address,
        node: NameHash,
        name: String,
    ) -> RegistryResult<TxReceipt>;
}

/// External preimage-recovery service.
#[async_trait]
pub trait PreimageService: Send + Sync {
    /// Label text for each hash, `None` when unknown. Same length and order
    /// as `hashes`.
    async fn recover(&self, hashes: &[LabelHash]) -> RegistryResult<Vec<Option<String>>>;
}

/// Offline dictionary of labels known without the preimage service.
pub trait LocalLabels: Send + Sync {
    /// Label text for each hash, `None` when unknown. Same length and order
    /// as `hashes`.
    fn lookup(&self, hashes: &[LabelHash]) -> Vec<Option<String>>;
}

/// Everything a registry operation needs, passed explicitly.
#[derive(Clone)]
pub struct RegistryContext {
    registry: Arc<dyn RegistryReader>,
    resolvers: Arc<dyn ResolverReader>,
    preimage: Arc<dyn PreimageService>,
    local_labels: Arc<dyn LocalLabels>,
    writer: Option<Arc<dyn RegistryWriter>>,
    config: RegistryConfig,
}

impl RegistryContext {
    /// Create a read-only context with the default configuration
    pub fn new(
        registry: Arc<dyn RegistryReader>,
        resolvers: Arc<dyn ResolverReader>,
        preimage: Arc<dyn PreimageService>,
        local_labels: Arc<dyn LocalLabels>,
    ) -> Self {
        Self {
            registry,
            resolvers,
            preimage,
            local_labels,
            writer: None,
            config: RegistryConfig::default_config(),
        }
    }

    /// Attach a writer, enabling the operations in [`crate::admin`]
    pub fn with_writer(mut self, writer: Arc<dyn RegistryWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: RegistryConfig) -> RegistryResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn registry(&self) -> &dyn RegistryReader {
        self.registry.as_ref()
    }

    pub fn resolvers(&self) -> &dyn ResolverReader {
        self.resolvers.as_ref()
    }

    pub fn preimage(&self) -> &dyn PreimageService {
        self.preimage.as_ref()
    }

    pub fn local_labels(&self) -> &dyn LocalLabels {
        self.local_labels.as_ref()
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The writer, or [`RegistryError::NoWriter`] on a read-only context
    pub fn writer(&self) -> RegistryResult<&dyn RegistryWriter> {
        self.writer.as_deref().ok_or(RegistryError::NoWriter)
    }
}

impl fmt::Debug for RegistryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryContext")
            .field("writable", &self.writer.is_some())
            .field("config", &self.config)
            .finish()
    }
}
