//! Label reconciliation: merges the local label dictionary with labels
//! recovered by the preimage service.
//!
//! # Precedence
//!
//! Local text wins over remote text when both exist ([`LabelPrecedence`]).
//! The local dictionary is trusted; the preimage service is best-effort and
//! may be stale or adversarial, so remote text is also checked to hash back
//! to the identifier it was returned for.

use ensdex_core::{fallback_encode, label_hash_of_normalized, normalize, LabelHash};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::ledger::RegistryContext;

/// Where a reconciled label's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelSource {
    Local,
    Remote,
    /// Neither source knew the label
    Unresolved,
}

/// A label hash with its recovered text, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledLabel {
    pub label_hash: LabelHash,
    pub text: Option<String>,
    pub source: LabelSource,
}

impl ReconciledLabel {
    pub fn is_resolved(&self) -> bool {
        self.text.is_some()
    }

    /// Label text, or the fallback encoding of the hash when unresolved
    pub fn display_label(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => fallback_encode(&self.label_hash),
        }
    }
}

/// The merge rule between the two label sources.
pub struct LabelPrecedence;

impl LabelPrecedence {
    /// Local text, else remote text, else unresolved. Local text that does
    /// not normalize to a single label counts as absent.
    pub fn merge(
        label_hash: LabelHash,
        local: Option<String>,
        remote: Option<String>,
    ) -> ReconciledLabel {
        let local = local.and_then(|text| accept_local(&label_hash, &text));
        let (text, source) = match (local, remote) {
            (Some(text), _) => (Some(text), LabelSource::Local),
            (None, Some(text)) => (Some(text), LabelSource::Remote),
            (None, None) => (None, LabelSource::Unresolved),
        };
        ReconciledLabel {
            label_hash,
            text,
            source,
        }
    }
}

fn accept_local(label_hash: &LabelHash, text: &str) -> Option<String> {
    match normalize(text) {
        Ok(normalized) => Some(normalized),
        Err(err) => {
            warn!(label_hash = %label_hash, error = %err, "Ignoring invalid local label");
            None
        }
    }
}

fn check_len(expected: usize, actual: usize) -> RegistryResult<()> {
    if expected != actual {
        return Err(RegistryError::PreimageLengthMismatch { expected, actual });
    }
    Ok(())
}

/// Merge per-position local and remote answers for `hashes`.
///
/// Both answer vectors must match `hashes` in length.
pub fn merge_labels(
    hashes: &[LabelHash],
    local: Vec<Option<String>>,
    remote: Vec<Option<String>>,
) -> RegistryResult<Vec<ReconciledLabel>> {
    check_len(hashes.len(), local.len())?;
    check_len(hashes.len(), remote.len())?;

    Ok(hashes
        .iter()
        .zip(local)
        .zip(remote)
        .map(|((label_hash, local), remote)| LabelPrecedence::merge(*label_hash, local, remote))
        .collect())
}

/// Keep remote text only if it normalizes and hashes to `label_hash`.
fn verify_remote(label_hash: &LabelHash, text: Option<String>) -> Option<String> {
    let text = text?;
    match normalize(&text) {
        Ok(normalized) if label_hash_of_normalized(&normalized) == *label_hash => Some(normalized),
        _ => {
            warn!(label_hash = %label_hash, "Discarding preimage that does not match its label hash");
            None
        }
    }
}

/// Query the preimage service with the full batch, chunked by
/// `preimage_batch_size`.
async fn recover_remote(
    ctx: &RegistryContext,
    hashes: &[LabelHash],
) -> RegistryResult<Vec<Option<String>>> {
    let mut recovered = Vec::with_capacity(hashes.len());
    if hashes.is_empty() {
        return Ok(recovered);
    }

    for chunk in hashes.chunks(ctx.config().preimage_batch_size.max(1)) {
        let answers = ctx.preimage().recover(chunk).await?;
        check_len(chunk.len(), answers.len())?;
        recovered.extend(
            chunk
                .iter()
                .zip(answers)
                .map(|(label_hash, text)| verify_remote(label_hash, text)),
        );
    }

    Ok(recovered)
}

/// Reconcile labels for a deduplicated batch of label hashes.
///
/// Output length and order equal `hashes`. Only transport failures and
/// broken same-length contracts are errors; unknown labels come back as
/// [`LabelSource::Unresolved`].
pub async fn reconcile(
    ctx: &RegistryContext,
    hashes: &[LabelHash],
) -> RegistryResult<Vec<ReconciledLabel>> {
    let local = ctx.local_labels().lookup(hashes);
    let remote = recover_remote(ctx, hashes).await?;
    let labels = merge_labels(hashes, local, remote)?;

    let unresolved = labels
        .iter()
        .filter(|label| label.source == LabelSource::Unresolved)
        .count();
    debug!(labels = labels.len(), unresolved, "Reconciled labels");

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn h(n: u8) -> LabelHash {
        LabelHash([n; 32])
    }

    #[test]
    fn test_local_takes_precedence() {
        let merged = LabelPrecedence::merge(h(1), Some("alice".into()), Some("mallory".into()));
        assert_eq!(merged.text.as_deref(), Some("alice"));
        assert_eq!(merged.source, LabelSource::Local);
    }

    #[test]
    fn test_invalid_local_text_counts_as_absent() {
        let merged = LabelPrecedence::merge(h(1), Some("a.b".into()), Some("bob".into()));
        assert_eq!(merged.text.as_deref(), Some("bob"));
        assert_eq!(merged.source, LabelSource::Remote);

        let merged = LabelPrecedence::merge(h(2), Some(String::new()), None);
        assert!(!merged.is_resolved());
        assert_eq!(merged.display_label(), fallback_encode(&h(2)));

        let merged = LabelPrecedence::merge(h(3), Some("Alice".into()), None);
        assert_eq!(merged.text.as_deref(), Some("alice"));
    }

    #[test]
    fn test_merge_example() {
        let merged = merge_labels(
            &[h(1), h(2)],
            vec![Some("alice".into()), None],
            vec![None, Some("bob".into())],
        )
        .unwrap();

        let texts: Vec<Option<&str>> = merged.iter().map(|l| l.text.as_deref()).collect();
        assert_eq!(texts, vec![Some("alice"), Some("bob")]);
        assert_eq!(merged[0].source, LabelSource::Local);
        assert_eq!(merged[1].source, LabelSource::Remote);
    }

    #[test]
    fn test_unresolved_displays_fallback() {
        let merged = LabelPrecedence::merge(h(3), None, None);
        assert!(!merged.is_resolved());
        assert_eq!(merged.source, LabelSource::Unresolved);
        assert_eq!(merged.display_label(), fallback_encode(&h(3)));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = merge_labels(&[h(1), h(2)], vec![None, None], vec![None]).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::PreimageLengthMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_verify_remote_rejects_wrong_preimage() {
        let alice = ensdex_core::hash_label("alice").unwrap();
        assert_eq!(verify_remote(&alice, Some("Alice".into())).as_deref(), Some("alice"));
        assert_eq!(verify_remote(&alice, Some("bob".into())), None);
        assert_eq!(verify_remote(&alice, Some("a.b".into())), None);
        assert_eq!(verify_remote(&alice, None), None);
    }

    fn answers() -> impl Strategy<Value = Vec<(Option<String>, Option<String>)>> {
        proptest::collection::vec(
            (
                proptest::option::of("[a-z]{1,6}"),
                proptest::option::of("[a-z]{1,6}"),
            ),
            0..32,
        )
    }

    proptest! {
        #[test]
        fn prop_merge_preserves_length_order_and_precedence(pairs in answers()) {
            let hashes: Vec<LabelHash> = (0..pairs.len()).map(|i| h(i as u8)).collect();
            let (local, remote): (Vec<_>, Vec<_>) = pairs.iter().cloned().unzip();

            let merged = merge_labels(&hashes, local, remote).unwrap();
            prop_assert_eq!(merged.len(), hashes.len());
            for ((label, hash), (local, remote)) in merged.iter().zip(&hashes).zip(&pairs) {
                prop_assert_eq!(&label.label_hash, hash);
                let expected = local.clone().or_else(|| remote.clone());
                prop_assert_eq!(&label.text, &expected);
            }
        }
    }
}
