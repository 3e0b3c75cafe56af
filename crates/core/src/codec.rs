//! Label codec: label normalization, label and name hashing, and the
//! bracketed fallback encoding for label hashes without a known preimage.
//!
//! SECURITY: Uses Keccak-256, the registry's native digest.
//!
//! # Fallback encoding
//!
//! An unknown label is displayed as `[` + 64 lowercase hex digits + `]`.
//! Square brackets are rejected by [`normalize`], so a fallback-encoded
//! label can never be mistaken for a registrable one, and [`namehash`]
//! maps an encoded label straight back to the hash it stands for.

use sha3::{Digest, Keccak256};
use unicode_normalization::UnicodeNormalization;

use crate::error::{CoreError, Result};
use crate::types::{LabelHash, NameHash};

const FALLBACK_OPEN: char = '[';
const FALLBACK_CLOSE: char = ']';
const FALLBACK_LEN: usize = 2 + 2 * LabelHash::LEN;

/// Keccak-256 of arbitrary bytes
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Four-byte function selector of a contract method signature,
/// e.g. `contenthash(bytes32)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Normalize a single label: lowercase fold, then Unicode NFC composition.
///
/// # Returns
/// * `Ok(String)` - The normalized label
/// * `Err(CoreError::InvalidLabel)` - Empty, dotted, or uses the reserved
///   fallback brackets
pub fn normalize(label: &str) -> Result<String> {
    let invalid = |reason| CoreError::InvalidLabel {
        label: label.to_string(),
        reason,
    };

    if label.is_empty() {
        return Err(invalid("empty label"));
    }
    if label.contains('.') {
        return Err(invalid("label contains a dot separator"));
    }
    if label.contains(FALLBACK_OPEN) || label.contains(FALLBACK_CLOSE) {
        return Err(invalid("square brackets are reserved for encoded label hashes"));
    }

    let normalized: String = label.to_lowercase().nfc().collect();
    if normalized.is_empty() {
        return Err(invalid("label normalizes to nothing"));
    }
    Ok(normalized)
}

/// Hash an already-normalized label. Callers holding raw user input
/// should use [`hash_label`].
pub fn label_hash_of_normalized(normalized: &str) -> LabelHash {
    LabelHash(keccak256(normalized.as_bytes()))
}

/// Normalize then hash a label.
pub fn hash_label(label: &str) -> Result<LabelHash> {
    let normalized = normalize(label)?;
    Ok(label_hash_of_normalized(&normalized))
}

/// Display placeholder for a label hash whose label is unknown.
pub fn fallback_encode(label_hash: &LabelHash) -> String {
    let mut out = String::with_capacity(FALLBACK_LEN);
    out.push(FALLBACK_OPEN);
    out.push_str(&label_hash.to_hex());
    out.push(FALLBACK_CLOSE);
    out
}

/// Inverse of [`fallback_encode`].
pub fn fallback_decode(encoded: &str) -> Result<LabelHash> {
    let inner = encoded
        .strip_prefix(FALLBACK_OPEN)
        .and_then(|rest| rest.strip_suffix(FALLBACK_CLOSE))
        .ok_or_else(|| CoreError::MalformedLabel(encoded.to_string()))?;

    if inner.len() != 2 * LabelHash::LEN || inner.starts_with("0x") {
        return Err(CoreError::MalformedLabel(encoded.to_string()));
    }

    LabelHash::from_hex(inner).map_err(|_| CoreError::MalformedLabel(encoded.to_string()))
}

/// Whether a label is in the bracketed fallback form.
pub fn is_fallback_encoded(label: &str) -> bool {
    label.len() == FALLBACK_LEN && fallback_decode(label).is_ok()
}

/// Label hash of one label, honouring the fallback form: an encoded label
/// is decoded, anything else is normalized and hashed.
pub fn label_hash_in(label: &str) -> Result<LabelHash> {
    if label.starts_with(FALLBACK_OPEN) {
        return fallback_decode(label);
    }
    hash_label(label)
}

/// Node of `label_hash` directly under `parent`.
pub fn namehash_with_label_hash(label_hash: &LabelHash, parent: &NameHash) -> NameHash {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(parent.as_bytes());
    buf[32..].copy_from_slice(label_hash.as_bytes());
    NameHash(keccak256(&buf))
}

/// Recursive registry name hash of a dotted name.
///
/// The empty name is [`NameHash::ROOT`]. Each label is normalized before
/// hashing; fallback-encoded labels contribute their decoded hash.
pub fn namehash(name: &str) -> Result<NameHash> {
    if name.is_empty() {
        return Ok(NameHash::ROOT);
    }

    name.rsplit('.').try_fold(NameHash::ROOT, |node, label| {
        let label_hash = label_hash_in(label)?;
        Ok(namehash_with_label_hash(&label_hash, &node))
    })
}

/// Split a dotted name into normalized labels. Fallback-encoded labels
/// are kept verbatim.
pub fn parse_name(name: &str) -> Result<Vec<String>> {
    name.split('.')
        .map(|label| {
            if label.starts_with(FALLBACK_OPEN) {
                fallback_decode(label).map(|_| label.to_string())
            } else {
                normalize(label)
            }
        })
        .collect()
}

/// Normalize every label of a dotted name and join them back together.
pub fn normalize_name(name: &str) -> Result<String> {
    Ok(parse_name(name)?.join("."))
}
