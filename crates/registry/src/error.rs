//! Error types for ensdex registry operations.
//!
//! Transport failures and broken collaborator contracts propagate to the
//! caller. A label without a known preimage is not an error: it surfaces as
//! an unresolved value instead.

use ensdex_core::CoreError;
use thiserror::Error;

/// Errors that can occur in registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Ledger or preimage service unreachable or timed out. Never retried here.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A contract call reverted, e.g. the resolver address is not a resolver
    #[error("Contract call failed: {0}")]
    Contract(String),

    /// Label or name failed normalization or fallback decoding, or the
    /// configuration was rejected
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A label source returned a different number of entries than requested
    #[error("Label source returned {actual} entries for {expected} label hashes")]
    PreimageLengthMismatch { expected: usize, actual: usize },

    /// One owner lookup of a listing failed, failing the whole listing
    #[error("Owner lookup failed for {name}: {source}")]
    OwnerLookup {
        name: String,
        #[source]
        source: Box<RegistryError>,
    },

    /// The name has no resolver to write records to
    #[error("No resolver set for {name}")]
    NoResolver { name: String },

    /// A write was requested on a read-only context
    #[error("No registry writer configured")]
    NoWriter,

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RegistryError {
    /// True for failures of the underlying connection rather than of a call.
    pub fn is_transport(&self) -> bool {
        match self {
            RegistryError::Transport(_) => true,
            RegistryError::OwnerLookup { source, .. } => source.is_transport(),
            _ => false,
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
