//! Core functionality for the ensdex name-registry client.
//!
//! This crate provides the fundamental types, the label codec, and the
//! logging and configuration utilities shared across the ensdex workspace.

pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use codec::{
    fallback_decode, fallback_encode, hash_label, is_fallback_encoded, keccak256, label_hash_in,
    label_hash_of_normalized, namehash, namehash_with_label_hash, normalize, normalize_name,
    parse_name, selector,
};
pub use config::RegistryConfig;
pub use error::{CoreError, Result};
pub use types::{Address, LabelHash, NameHash, TxHash};
