//! Accession Normalization Module
//!
//! BLAST may report subjects as composite identifiers such as
//! `gi|99|ref|XP_015140120.1|`. Everything downstream (pullseq lookups,
//! motif reports, the feature table) keys on the bare versioned accession.
//!
//! # Rules
//! - No pipe: the identifier is already canonical and is kept as-is.
//! - Pipes with a database tag (`ref`, `gb`, `sp`, ...): the field after the
//!   last tag.
//! - Pipes without a tag: the text between the first and last pipe (its
//!   last non-empty field when that text still has pipes).
//!
//! A bare accession (`XP_1`) and a versioned one (`XP_1.2`) in the same set
//! collapse into the versioned form.

use rustc_hash::FxHashSet;

/// Deduplicated canonical accessions. Order is not meaningful.
pub type SelectionSet = FxHashSet<String>;

/// Tags that precede an accession in NCBI FASTA-style composite ids.
/// `gi` is absent on purpose: it precedes a numeric GI, not an accession.
const DATABASE_TAGS: [&str; 12] = [
    "ref", "gb", "emb", "dbj", "sp", "tr", "pdb", "pir", "prf", "tpg", "tpe", "tpd",
];

/// Canonical accession for one raw identifier.
pub fn canonical_accession(raw: &str) -> String {
    let raw = raw.trim();
    if !raw.contains('|') {
        return raw.to_string();
    }

    let fields: Vec<&str> = raw.split('|').collect();
    let tagged = fields
        .windows(2)
        .rev()
        .find(|w| DATABASE_TAGS.contains(&w[0]) && !w[1].is_empty())
        .map(|w| w[1]);
    if let Some(acc) = tagged {
        return acc.to_string();
    }

    let first = raw.find('|').unwrap_or(0);
    let last = raw.rfind('|').unwrap_or(raw.len());
    let inner = if last > first { &raw[first + 1..last] } else { "" };

    inner
        .split('|')
        .rev()
        .chain(fields.iter().copied())
        .find(|f| !f.is_empty())
        .unwrap_or("")
        .to_string()
}

/// Canonicalizes and deduplicates a batch of raw identifiers.
pub fn normalize<I, S>(raw_ids: I) -> SelectionSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set: SelectionSet = raw_ids
        .into_iter()
        .map(|id| canonical_accession(id.as_ref()))
        .filter(|id| !id.is_empty())
        .collect();

    let versioned_bases: FxHashSet<String> = set
        .iter()
        .filter_map(|id| split_version(id).map(|(base, _)| base.to_string()))
        .collect();
    set.retain(|id| split_version(id).is_some() || !versioned_bases.contains(id));

    set
}

/// Splits `XP_1.2` into (`XP_1`, `2`). `None` for versionless ids.
fn split_version(id: &str) -> Option<(&str, &str)> {
    let (base, version) = id.rsplit_once('.')?;
    if base.is_empty() || version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((base, version))
}
