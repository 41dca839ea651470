//! Ranked Selection Module
//!
//! Orders BLAST hits by bit score and keeps the top N.
//!
//! # Ordering
//! Bit score, higher first. The sort is stable: hits with equal scores keep
//! their order from the table.
//!
//! # Short result sets
//! With [`TruncationPolicy::DropLastWhenShort`] a non-empty selection that
//! is smaller than N loses its last record. Older tools read the trailing
//! `# BLAST processed` comment as a data row and removed it this way; the
//! reader here never yields that row, so [`TruncationPolicy::KeepAll`] is
//! the default and the drop-last rule exists only for reproducing old runs.

use std::cmp::Ordering;

use crate::blast::AlignmentHit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub enum TruncationPolicy {
    #[default]
    KeepAll,
    DropLastWhenShort,
}

/// Returns the `n` best hits, bit score descending.
pub fn select_top(
    mut hits: Vec<AlignmentHit>,
    n: usize,
    policy: TruncationPolicy,
) -> Vec<AlignmentHit> {
    hits.sort_by(|a, b| b.bit_score.partial_cmp(&a.bit_score).unwrap_or(Ordering::Equal));
    hits.truncate(n);

    if policy == TruncationPolicy::DropLastWhenShort && !hits.is_empty() && hits.len() < n {
        let dropped = hits.pop();
        if let Some(hit) = dropped {
            tracing::debug!("dropped short-selection tail: {}", hit.subject_acc);
        }
    }

    hits
}

/// Subject accession column of a selection, in rank order.
pub fn subject_accessions(hits: &[AlignmentHit]) -> Vec<String> {
    hits.iter().map(|h| h.subject_acc.clone()).collect()
}
