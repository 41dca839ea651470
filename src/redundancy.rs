//! Redundancy Filter Module
//!
//! Removes identical sequences (and isoforms) from the fetched set with
//! EMBOSS `skipredundant`, then validates the survivors.
//!
//! # Two-phase commit
//! 1. The external filter writes into a side artifact; the original FASTA
//!    is never touched.
//! 2. Survivors are counted. At least [`MIN_FILTERED_SEQUENCES`] commits
//!    the artifact; fewer discards it and reverts to the original set.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::seqio::count_sequences;
use crate::tools::ToolSpec;
use crate::workspace::ScopedArtifact;

/// Fewest sequences the downstream alignment statistics accept.
pub const MIN_FILTERED_SEQUENCES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum FilterOutcome {
    /// The filtered set was committed.
    Filtered { path: PathBuf, remaining: usize },
    /// The filter was vetoed; the original set stays in use.
    Reverted { path: PathBuf, remaining: usize },
}

impl FilterOutcome {
    /// The sequence set downstream stages should use.
    pub fn path(&self) -> &Path {
        match self {
            FilterOutcome::Filtered { path, .. } | FilterOutcome::Reverted { path, .. } => path,
        }
    }
}

/// Whether the filter is worth offering for a set of `count` sequences.
pub fn is_applicable(count: usize) -> bool {
    count > MIN_FILTERED_SEQUENCES
}

/// Runs `dedup(original, side)` and keeps or discards its output.
///
/// A failing or silent filter is treated like one that left too few
/// sequences: the side artifact is discarded and the original is used.
pub fn apply<F>(original: &Path, side: ScopedArtifact, dedup: F) -> Result<FilterOutcome>
where
    F: FnOnce(&Path, &Path) -> Result<()>,
{
    if let Err(e) = dedup(original, side.path()) {
        tracing::warn!("redundancy filter failed: {:#}", e);
        return Ok(revert(original, side, 0));
    }

    let remaining = if side.exists() {
        match count_sequences(side.path()) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!("could not read filtered set: {:#}", e);
                0
            }
        }
    } else {
        0
    };
    tracing::info!("Remaining sequences after redundancy filter: {}", remaining);

    if remaining < MIN_FILTERED_SEQUENCES {
        tracing::warn!("Not enough sequences after removing redundant sequences.");
        return Ok(revert(original, side, remaining));
    }

    Ok(FilterOutcome::Filtered {
        path: side.persist(),
        remaining,
    })
}

fn revert(original: &Path, side: ScopedArtifact, remaining: usize) -> FilterOutcome {
    tracing::warn!("Reverting to using original full list of sequences.");
    side.discard();
    FilterOutcome::Reverted {
        path: original.to_path_buf(),
        remaining,
    }
}

/// EMBOSS `skipredundant` at 100% identity, keeping the longer of two
/// identical sequences.
pub fn skipredundant_spec(input: &Path, output: &Path) -> ToolSpec {
    ToolSpec::new("skipredundant").args([
        "-maxthreshold", "100.0",
        "-minthreshold", "100.0",
        "-mode", "2",
        "-gapopen", "0.0",
        "-gapextend", "0.0",
        "-datafile", "EBLOSUM62",
        "-redundant", "",
        "-outseq",
    ])
    .arg(output)
    .arg(input)
}
