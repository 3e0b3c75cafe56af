//! In-memory registry ledger and preimage service.
//!
//! Behaves like the on-ledger registry for the operations this crate uses:
//! subnode assignments emit `NewOwner` logs in block order, resolvers hold
//! per-node records, and writes return receipts. Transport failures can be
//! injected per node or for the whole ledger.

use async_trait::async_trait;
use ensdex_core::{
    keccak256, label_hash_of_normalized, namehash, namehash_with_label_hash, normalize, selector,
    Address, LabelHash, NameHash, TxHash,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

use crate::error::{RegistryError, RegistryResult};
use crate::ledger::{
    NewOwnerLog, PreimageService, RegistryReader, RegistryWriter, ResolverReader, TxReceipt,
};
use crate::records::CONTENTHASH_SIGNATURE;

/// Records held by one resolver contract.
#[derive(Debug, Clone, Default)]
pub struct ResolverRecords {
    pub supports_contenthash: bool,
    pub addrs: HashMap<NameHash, Address>,
    pub contenthashes: HashMap<NameHash, Vec<u8>>,
    pub contents: HashMap<NameHash, Vec<u8>>,
    pub names: HashMap<NameHash, String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    owners: HashMap<NameHash, Address>,
    resolvers: HashMap<NameHash, Address>,
    logs: Vec<NewOwnerLog>,
    head_block: u64,
    resolver_contracts: HashMap<Address, ResolverRecords>,
    failing_nodes: HashSet<NameHash>,
    tx_count: u64,
}

/// In-memory registry.
#[derive(Debug)]
pub struct MemoryRegistry {
    deployment_block: u64,
    account: Address,
    offline: AtomicBool,
    state: RwLock<MemoryState>,
}

impl MemoryRegistry {
    /// Registry deployed at `deployment_block`, writing as `account`.
    /// The root node is owned by `account`.
    pub fn new(deployment_block: u64, account: Address) -> Self {
        let mut state = MemoryState {
            head_block: deployment_block,
            ..MemoryState::default()
        };
        state.owners.insert(NameHash::ROOT, account);

        Self {
            deployment_block,
            account,
            offline: AtomicBool::new(false),
            state: RwLock::new(state),
        }
    }

    fn read(&self) -> RegistryResult<std::sync::RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| RegistryError::Transport("memory registry lock poisoned".to_string()))
    }

    fn write(&self) -> RegistryResult<std::sync::RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| RegistryError::Transport("memory registry lock poisoned".to_string()))
    }

    fn check_online(&self) -> RegistryResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RegistryError::Transport("ledger unreachable".to_string()));
        }
        Ok(())
    }

    fn check_node(state: &MemoryState, node: &NameHash) -> RegistryResult<()> {
        if state.failing_nodes.contains(node) {
            return Err(RegistryError::Transport(format!("request for {} timed out", node)));
        }
        Ok(())
    }

    /// Mine one block holding a single transaction.
    fn mine(state: &mut MemoryState) -> TxReceipt {
        state.head_block += 1;
        state.tx_count += 1;
        TxReceipt {
            tx_hash: TxHash(keccak256(&state.tx_count.to_be_bytes())),
            block_number: state.head_block,
        }
    }

    fn assign_subnode(
        state: &mut MemoryState,
        parent: NameHash,
        label: LabelHash,
        owner: Address,
    ) -> TxReceipt {
        let receipt = Self::mine(state);
        state
            .owners
            .insert(namehash_with_label_hash(&label, &parent), owner);
        state.logs.push(NewOwnerLog {
            node: parent,
            label,
            owner,
            block_number: receipt.block_number,
            log_index: 0,
        });
        receipt
    }

    /// Assign `<label>.<parent>` without going through a writer.
    pub fn register(&self, label: &str, parent: &str, owner: Address) -> RegistryResult<NameHash> {
        let label_hash = label_hash_of_normalized(&normalize(label)?);
        self.register_hashed(label_hash, namehash(parent)?, owner)
    }

    /// Assign a subnode known only by its label hash.
    pub fn register_hashed(
        &self,
        label: LabelHash,
        parent: NameHash,
        owner: Address,
    ) -> RegistryResult<NameHash> {
        let mut state = self.write()?;
        Self::assign_subnode(&mut state, parent, label, owner);
        Ok(namehash_with_label_hash(&label, &parent))
    }

    /// Overwrite the owner of a node without emitting a `NewOwner` log,
    /// like a `Transfer`.
    pub fn transfer(&self, node: NameHash, owner: Address) -> RegistryResult<()> {
        let mut state = self.write()?;
        Self::mine(&mut state);
        state.owners.insert(node, owner);
        Ok(())
    }

    /// Deploy a resolver contract at `address`.
    pub fn deploy_resolver(&self, address: Address, supports_contenthash: bool) -> RegistryResult<()> {
        let mut state = self.write()?;
        state.resolver_contracts.insert(
            address,
            ResolverRecords {
                supports_contenthash,
                ..ResolverRecords::default()
            },
        );
        Ok(())
    }

    /// Mutate the records of a deployed resolver.
    pub fn with_resolver_records<F>(&self, address: Address, update: F) -> RegistryResult<()>
    where
        F: FnOnce(&mut ResolverRecords),
    {
        let mut state = self.write()?;
        let records = state
            .resolver_contracts
            .get_mut(&address)
            .ok_or_else(|| RegistryError::Contract(format!("{} is not a resolver", address)))?;
        update(records);
        Ok(())
    }

    /// Point `node` at `resolver` without going through a writer.
    pub fn point_resolver(&self, node: NameHash, resolver: Address) -> RegistryResult<()> {
        let mut state = self.write()?;
        state.resolvers.insert(node, resolver);
        Ok(())
    }

    /// Fail owner and resolver reads of `node` with a transport error.
    pub fn fail_node(&self, node: NameHash) -> RegistryResult<()> {
        self.write()?.failing_nodes.insert(node);
        Ok(())
    }

    /// Fail every call with a transport error while `offline` is set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn head_block(&self) -> RegistryResult<u64> {
        Ok(self.read()?.head_block)
    }

    fn resolver_call<T, F>(&self, resolver: Address, call: F) -> RegistryResult<T>
    where
        F: FnOnce(&ResolverRecords) -> T,
    {
        self.check_online()?;
        let state = self.read()?;
        let records = state
            .resolver_contracts
            .get(&resolver)
            .ok_or_else(|| RegistryError::Contract(format!("{} is not a resolver", resolver)))?;
        Ok(call(records))
    }

    fn resolver_write<F>(&self, resolver: Address, node: NameHash, update: F) -> RegistryResult<TxReceipt>
    where
        F: FnOnce(&mut ResolverRecords),
    {
        self.check_online()?;
        let mut state = self.write()?;
        if state.owners.get(&node) != Some(&self.account) {
            return Err(RegistryError::Contract(format!("{} is not authorised for {}", self.account, node)));
        }
        let records = state
            .resolver_contracts
            .get_mut(&resolver)
            .ok_or_else(|| RegistryError::Contract(format!("{} is not a resolver", resolver)))?;
        update(records);
        Ok(Self::mine(&mut state))
    }
}

#[async_trait]
impl RegistryReader for MemoryRegistry {
    async fn owner(&self, node: NameHash) -> RegistryResult<Address> {
        self.check_online()?;
        let state = self.read()?;
        Self::check_node(&state, &node)?;
        Ok(state.owners.get(&node).copied().unwrap_or(Address::ZERO))
    }

    async fn resolver(&self, node: NameHash) -> RegistryResult<Address> {
        self.check_online()?;
        let state = self.read()?;
        Self::check_node(&state, &node)?;
        Ok(state.resolvers.get(&node).copied().unwrap_or(Address::ZERO))
    }

    async fn new_owner_logs(
        &self,
        parent: NameHash,
        from_block: u64,
    ) -> RegistryResult<Vec<NewOwnerLog>> {
        self.check_online()?;
        let state = self.read()?;
        Ok(state
            .logs
            .iter()
            .filter(|log| log.node == parent && log.block_number >= from_block)
            .cloned()
            .collect())
    }

    async fn deployment_block(&self) -> RegistryResult<u64> {
        self.check_online()?;
        Ok(self.deployment_block)
    }
}

#[async_trait]
impl ResolverReader for MemoryRegistry {
    async fn addr(&self, resolver: Address, node: NameHash) -> RegistryResult<Address> {
        self.resolver_call(resolver, |records| {
            records.addrs.get(&node).copied().unwrap_or(Address::ZERO)
        })
    }

    async fn supports_interface(
        &self,
        resolver: Address,
        interface_id: [u8; 4],
    ) -> RegistryResult<bool> {
        self.resolver_call(resolver, |records| {
            records.supports_contenthash && interface_id == selector(CONTENTHASH_SIGNATURE)
        })
    }

    async fn contenthash(&self, resolver: Address, node: NameHash) -> RegistryResult<Vec<u8>> {
        self.resolver_call(resolver, |records| {
            records.contenthashes.get(&node).cloned().unwrap_or_default()
        })
    }

    async fn content(&self, resolver: Address, node: NameHash) -> RegistryResult<Vec<u8>> {
        self.resolver_call(resolver, |records| {
            records
                .contents
                .get(&node)
                .cloned()
                .unwrap_or_else(|| vec![0u8; 32])
        })
    }

    async fn name(&self, resolver: Address, node: NameHash) -> RegistryResult<String> {
        self.resolver_call(resolver, |records| {
            records.names.get(&node).cloned().unwrap_or_default()
        })
    }
}

#[async_trait]
impl RegistryWriter for MemoryRegistry {
    async fn account(&self) -> RegistryResult<Address> {
        Ok(self.account)
    }

    async fn set_owner(&self, node: NameHash, owner: Address) -> RegistryResult<TxReceipt> {
        self.check_online()?;
        let mut state = self.write()?;
        if state.owners.get(&node) != Some(&self.account) {
            return Err(RegistryError::Contract(format!("{} is not authorised for {}", self.account, node)));
        }
        let receipt = Self::mine(&mut state);
        state.owners.insert(node, owner);
        Ok(receipt)
    }

    async fn set_subnode_owner(
        &self,
        parent: NameHash,
        label: LabelHash,
        owner: Address,
    ) -> RegistryResult<TxReceipt> {
        self.check_online()?;
        let mut state = self.write()?;
        if state.owners.get(&parent) != Some(&self.account) {
            return Err(RegistryError::Contract(format!("{} is not authorised for {}", self.account, parent)));
        }
        Ok(Self::assign_subnode(&mut state, parent, label, owner))
    }

    async fn set_resolver(&self, node: NameHash, resolver: Address) -> RegistryResult<TxReceipt> {
        self.check_online()?;
        let mut state = self.write()?;
        if state.owners.get(&node) != Some(&self.account) {
            return Err(RegistryError::Contract(format!("{} is not authorised for {}", self.account, node)));
        }
        let receipt = Self::mine(&mut state);
        if resolver.is_zero() {
            state.resolvers.remove(&node);
        } else {
            state.resolvers.insert(node, resolver);
        }
        Ok(receipt)
    }

    async fn set_addr(
        &self,
        resolver: Address,
        node: NameHash,
        addr: Address,
    ) -> RegistryResult<TxReceipt> {
        self.resolver_write(resolver, node, |records| {
            records.addrs.insert(node, addr);
        })
    }

    async fn set_contenthash(
        &self,
        resolver: Address,
        node: NameHash,
        hash: Vec<u8>,
    ) -> RegistryResult<TxReceipt> {
        self.resolver_write(resolver, node, |records| {
            records.contenthashes.insert(node, hash);
        })
    }

    async fn set_content(
        &self,
        resolver: Address,
        node: NameHash,
        content: [u8; 32],
    ) -> RegistryResult<TxReceipt> {
        self.resolver_write(resolver, node, |records| {
            records.contents.insert(node, content.to_vec());
        })
    }

    async fn set_name(
        &self,
        resolver: Address,
        node: NameHash,
        name: String,
    ) -> RegistryResult<TxReceipt> {
        self.resolver_write(resolver, node, |records| {
            records.names.insert(node, name);
        })
    }
}

/// In-memory preimage service backed by a label list.
#[derive(Debug, Default)]
pub struct MemoryPreimage {
    preimages: RwLock<HashMap<LabelHash, String>>,
    batches: Mutex<Vec<usize>>,
    offline: AtomicBool,
}

impl MemoryPreimage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_labels<I, S>(labels: I) -> RegistryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let service = Self::new();
        for label in labels {
            let normalized = normalize(label.as_ref())?;
            service.insert_raw(label_hash_of_normalized(&normalized), normalized)?;
        }
        Ok(service)
    }

    /// Map `label_hash` to arbitrary text, consistent or not.
    pub fn insert_raw(&self, label_hash: LabelHash, text: impl Into<String>) -> RegistryResult<()> {
        self.preimages
            .write()
            .map_err(|_| RegistryError::Transport("preimage lock poisoned".to_string()))?
            .insert(label_hash, text.into());
        Ok(())
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Sizes of the batches served so far, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches
            .lock()
            .map(|batches| batches.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PreimageService for MemoryPreimage {
    async fn recover(&self, hashes: &[LabelHash]) -> RegistryResult<Vec<Option<String>>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RegistryError::Transport("preimage service unreachable".to_string()));
        }
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(hashes.len());
        }
        let preimages = self
            .preimages
            .read()
            .map_err(|_| RegistryError::Transport("preimage lock poisoned".to_string()))?;
        Ok(hashes
            .iter()
            .map(|label_hash| preimages.get(label_hash).cloned())
            .collect())
    }
}
