//! ensdex Registry
//!
//! Subdomain discovery and name-record access for a hierarchical
//! name-registry ledger.
//!
//! # Architecture
//!
//! ```text
//! list_subdomains(parent)
//!     ├── collector   (NewOwner log replay under the parent node)
//!     ├── dedup       (latest event per label hash, newest first)
//!     ├── reconcile   (local labels ▸ preimage service ▸ fallback encoding)
//!     └── owner fan-out (bounded, order-preserving, cancellable)
//! ```
//!
//! Collaborators (ledger access, preimage recovery, local label dictionary)
//! are reached through the traits in [`ledger`] and handed to every
//! operation in an explicit [`RegistryContext`].

pub mod admin;
pub mod collector;
pub mod dedup;
pub mod error;
pub mod known;
pub mod ledger;
pub mod memory;
pub mod reconcile;
pub mod records;
pub mod subdomains;

pub use collector::{collect, start_block, OwnershipEvent};
pub use dedup::{dedupe, dedupe_by_latest};
pub use error::{RegistryError, RegistryResult};
pub use known::KnownLabels;
pub use ledger::{
    LocalLabels, NewOwnerLog, PreimageService, RegistryContext, RegistryReader, RegistryWriter,
    ResolverReader, TxReceipt,
};
pub use memory::{MemoryPreimage, MemoryRegistry};
pub use reconcile::{merge_labels, reconcile, LabelPrecedence, LabelSource, ReconciledLabel};
pub use records::{AddrRecord, ContentKind, ContentRecord, DomainDetails};
pub use subdomains::{list_subdomains, list_subdomains_cancellable, SubdomainRecord};
