//! Offline dictionary of known labels.

use ensdex_core::{label_hash_of_normalized, normalize, LabelHash, RegistryConfig};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::RegistryResult;
use crate::ledger::LocalLabels;

/// Labels the registry itself is built from
pub const SYSTEM_LABELS: &[&str] = &["eth", "addr", "reverse", "resolver"];

/// Label hashes mapped back to their normalized labels.
#[derive(Debug, Clone, Default)]
pub struct KnownLabels {
    labels: HashMap<LabelHash, String>,
}

impl KnownLabels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dictionary seeded with [`SYSTEM_LABELS`]
    pub fn with_defaults() -> Self {
        Self::from_labels(SYSTEM_LABELS)
    }

    /// Build from label strings. Labels that fail normalization are skipped.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut known = Self::new();
        known.extend(labels);
        known
    }

    /// Load a JSON array of label strings.
    pub fn from_json_file(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let labels: Vec<String> = serde_json::from_str(&content)?;
        let known = Self::from_labels(&labels);
        debug!(path = %path.display(), labels = known.len(), "Loaded known labels");
        Ok(known)
    }

    /// System labels plus the file named by `known_labels_path`, if any.
    pub fn from_config(config: &RegistryConfig) -> RegistryResult<Self> {
        let mut known = Self::with_defaults();
        if let Some(path) = config.known_labels_path() {
            known.labels.extend(Self::from_json_file(path)?.labels);
        }
        Ok(known)
    }

    /// Add one label, returning its hash if it normalizes.
    pub fn insert(&mut self, label: &str) -> Option<LabelHash> {
        match normalize(label) {
            Ok(normalized) => {
                let label_hash = label_hash_of_normalized(&normalized);
                self.labels.insert(label_hash, normalized);
                Some(label_hash)
            }
            Err(err) => {
                warn!(label = %label, error = %err, "Skipping invalid known label");
                None
            }
        }
    }

    pub fn extend<I, S>(&mut self, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for label in labels {
            self.insert(label.as_ref());
        }
    }

    pub fn get(&self, label_hash: &LabelHash) -> Option<&str> {
        self.labels.get(label_hash).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl LocalLabels for KnownLabels {
    fn lookup(&self, hashes: &[LabelHash]) -> Vec<Option<String>> {
        hashes
            .iter()
            .map(|label_hash| self.get(label_hash).map(str::to_string))
            .collect()
    }
}
