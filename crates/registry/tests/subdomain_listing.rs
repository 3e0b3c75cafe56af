//! Integration tests for subdomain discovery
//!
//! These tests drive `list_subdomains` against the in-memory registry:
//! - Latest-event deduplication and newest-first ordering
//! - Local/remote label reconciliation and the fallback encoding
//! - Current-owner annotation
//! - Atomic failure, cancellation and preimage batching

use ensdex_core::{fallback_encode, hash_label, namehash, Address, LabelHash, RegistryConfig};
use ensdex_registry::{
    list_subdomains, list_subdomains_cancellable, KnownLabels, MemoryPreimage, MemoryRegistry,
    RegistryContext, RegistryError, RegistryReader,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const ACCOUNT: Address = Address([0xAA; 20]);
const OWNER0: Address = Address([0x10; 20]);
const OWNER1: Address = Address([0x11; 20]);
const OWNER2: Address = Address([0x22; 20]);

struct Fixture {
    registry: Arc<MemoryRegistry>,
    preimage: Arc<MemoryPreimage>,
}

impl Fixture {
    fn new(remote_labels: &[&str]) -> Self {
        let registry = Arc::new(MemoryRegistry::new(1_000, ACCOUNT));
        registry.register("eth", "", ACCOUNT).unwrap();
        registry.register("example", "eth", ACCOUNT).unwrap();
        let preimage = Arc::new(MemoryPreimage::from_labels(remote_labels).unwrap());
        Self { registry, preimage }
    }

    fn context(&self, local_labels: &[&str]) -> RegistryContext {
        RegistryContext::new(
            self.registry.clone(),
            self.registry.clone(),
            self.preimage.clone(),
            Arc::new(KnownLabels::from_labels(local_labels)),
        )
    }
}

#[tokio::test]
async fn test_end_to_end_listing() {
    let fixture = Fixture::new(&["b"]);
    // "a" is registered, "b" is registered, then "a" is re-registered
    fixture.registry.register("a", "example.eth", OWNER0).unwrap();
    fixture.registry.register("b", "example.eth", OWNER2).unwrap();
    fixture.registry.register("a", "example.eth", OWNER1).unwrap();

    let ctx = fixture.context(&["a"]);
    let records = list_subdomains(&ctx, "example.eth").await.unwrap();

    assert_eq!(records.len(), 2);

    assert_eq!(records[0].label, "a");
    assert!(records[0].resolved);
    assert_eq!(records[0].owner, OWNER1);
    assert_eq!(records[0].name, "a.example.eth");
    assert_eq!(records[0].parent, "example.eth");
    assert_eq!(records[0].label_hash, hash_label("a").unwrap());

    assert_eq!(records[1].label, "b");
    assert!(records[1].resolved);
    assert_eq!(records[1].owner, OWNER2);
    assert_eq!(records[1].name, "b.example.eth");
}

#[tokio::test]
async fn test_unresolvable_label_uses_fallback_encoding() {
    let fixture = Fixture::new(&[]);
    let hidden = LabelHash([0x33; 32]);
    fixture
        .registry
        .register_hashed(hidden, namehash("example.eth").unwrap(), OWNER1)
        .unwrap();

    let ctx = fixture.context(&[]);
    let records = list_subdomains(&ctx, "example.eth").await.unwrap();

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert!(!record.resolved);
    assert_eq!(record.label, fallback_encode(&hidden));
    assert_eq!(record.name, format!("{}.example.eth", fallback_encode(&hidden)));
    // the fallback name addresses the same node the event created
    assert_eq!(record.owner, OWNER1);
    assert_eq!(
        fixture
            .registry
            .owner(namehash(&record.name).unwrap())
            .await
            .unwrap(),
        OWNER1
    );
}

#[tokio::test]
async fn test_empty_history_returns_empty_listing() {
    let fixture = Fixture::new(&[]);
    let ctx = fixture.context(&[]);

    let records = list_subdomains(&ctx, "example.eth").await.unwrap();
    assert!(records.is_empty());
    // nothing to recover, so the preimage service is not called
    assert!(fixture.preimage.batch_sizes().is_empty());
}

#[tokio::test]
async fn test_owner_reflects_current_state() {
    let fixture = Fixture::new(&[]);
    let node = fixture.registry.register("a", "example.eth", OWNER0).unwrap();
    fixture.registry.transfer(node, OWNER2).unwrap();

    let ctx = fixture.context(&["a"]);
    let records = list_subdomains(&ctx, "example.eth").await.unwrap();
    assert_eq!(records[0].owner, OWNER2);
}

#[tokio::test]
async fn test_parent_name_is_normalized() {
    let fixture = Fixture::new(&[]);
    fixture.registry.register("a", "example.eth", OWNER0).unwrap();

    let ctx = fixture.context(&["a"]);
    let records = list_subdomains(&ctx, "Example.ETH").await.unwrap();
    assert_eq!(records[0].name, "a.example.eth");
}

#[tokio::test]
async fn test_order_preserved_with_bounded_concurrency() {
    let labels: Vec<String> = (0..20).map(|i| format!("sub{}", i)).collect();
    let fixture = Fixture::new(&[]);
    for label in &labels {
        fixture.registry.register(label, "example.eth", OWNER0).unwrap();
    }

    let mut config = RegistryConfig::default_config();
    config.owner_lookup_concurrency = 3;
    let ctx = fixture
        .context(&labels.iter().map(String::as_str).collect::<Vec<_>>())
        .with_config(config)
        .unwrap();

    let records = list_subdomains(&ctx, "example.eth").await.unwrap();
    let listed: Vec<&str> = records.iter().map(|r| r.label.as_str()).collect();
    let expected: Vec<&str> = labels.iter().rev().map(String::as_str).collect();
    assert_eq!(listed, expected);
}

#[tokio::test]
async fn test_single_owner_failure_fails_listing() {
    let fixture = Fixture::new(&[]);
    fixture.registry.register("a", "example.eth", OWNER0).unwrap();
    let broken = fixture.registry.register("b", "example.eth", OWNER0).unwrap();
    fixture.registry.fail_node(broken).unwrap();

    let ctx = fixture.context(&["a", "b"]);
    let err = list_subdomains(&ctx, "example.eth").await.unwrap_err();

    match &err {
        RegistryError::OwnerLookup { name, .. } => assert_eq!(name, "b.example.eth"),
        other => panic!("expected owner lookup failure, got {:?}", other),
    }
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_preimage_outage_propagates() {
    let fixture = Fixture::new(&[]);
    fixture.registry.register("a", "example.eth", OWNER0).unwrap();
    fixture.preimage.set_offline(true);

    let ctx = fixture.context(&["a"]);
    let err = list_subdomains(&ctx, "example.eth").await.unwrap_err();
    assert!(matches!(err, RegistryError::Transport(_)));
}

#[tokio::test]
async fn test_ledger_outage_propagates() {
    let fixture = Fixture::new(&[]);
    fixture.registry.set_offline(true);

    let ctx = fixture.context(&[]);
    assert!(list_subdomains(&ctx, "example.eth")
        .await
        .unwrap_err()
        .is_transport());
}

#[tokio::test]
async fn test_preimage_batches_are_chunked() {
    let labels = ["l0", "l1", "l2", "l3", "l4"];
    let fixture = Fixture::new(&labels);
    for label in labels {
        fixture.registry.register(label, "example.eth", OWNER0).unwrap();
    }

    let mut config = RegistryConfig::default_config();
    config.preimage_batch_size = 2;
    let ctx = fixture.context(&[]).with_config(config).unwrap();

    let records = list_subdomains(&ctx, "example.eth").await.unwrap();
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.resolved));
    assert_eq!(fixture.preimage.batch_sizes(), vec![2, 2, 1]);
}

#[tokio::test]
async fn test_mismatched_preimage_is_discarded() {
    let fixture = Fixture::new(&[]);
    let node_label = hash_label("real").unwrap();
    fixture
        .registry
        .register_hashed(node_label, namehash("example.eth").unwrap(), OWNER0)
        .unwrap();
    fixture.preimage.insert_raw(node_label, "forged").unwrap();

    let ctx = fixture.context(&[]);
    let records = list_subdomains(&ctx, "example.eth").await.unwrap();
    assert!(!records[0].resolved);
    assert_eq!(records[0].label, fallback_encode(&node_label));
}

#[tokio::test]
async fn test_start_block_override_skips_history() {
    let fixture = Fixture::new(&[]);
    fixture.registry.register("old", "example.eth", OWNER0).unwrap();
    let head = fixture.registry.head_block().unwrap();
    fixture.registry.register("new", "example.eth", OWNER0).unwrap();

    let config = RegistryConfig::default_config().with_start_block(head + 1);
    let ctx = fixture
        .context(&["old", "new"])
        .with_config(config)
        .unwrap();

    let records = list_subdomains(&ctx, "example.eth").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].label, "new");
}

#[tokio::test]
async fn test_cancelled_listing() {
    let fixture = Fixture::new(&[]);
    fixture.registry.register("a", "example.eth", OWNER0).unwrap();

    let ctx = fixture.context(&["a"]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = list_subdomains_cancellable(&ctx, "example.eth", &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Cancelled));
}

#[tokio::test]
async fn test_invalid_parent_name_rejected() {
    let fixture = Fixture::new(&[]);
    let ctx = fixture.context(&[]);
    let err = list_subdomains(&ctx, "example..eth").await.unwrap_err();
    assert!(matches!(err, RegistryError::Core(_)));
}

#[tokio::test]
async fn test_zero_concurrency_config_rejected() {
    let fixture = Fixture::new(&[]);
    let mut config = RegistryConfig::default_config();
    config.owner_lookup_concurrency = 0;
    assert!(fixture.context(&[]).with_config(config).is_err());
}
