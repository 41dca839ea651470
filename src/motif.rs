//! Motif Report Aggregation Module
//!
//! Scans each selected protein for PROSITE motifs (pullseq + EMBOSS
//! `patmatmotifs`) and folds the per-protein reports into one table.
//!
//! # Report markers
//! ```text
//! Length = 7                          -> length  (field 3)
//! Start = position 26 of sequence     -> start   (field 4)
//! End = position 32 of sequence       -> end     (field 4)
//! Motif = ATP_GTP_A                   -> motif   (field 3)
//! ```
//! A marker is any body line containing the token; `#` header lines (which
//! echo the command line and output path) are skipped. When a report lists
//! several motifs the last one wins. Missing markers leave the attribute empty; a
//! report with zero motifs is a valid report.
//!
//! # Failures
//! A protein whose report cannot be produced or read becomes an
//! [`FeatureEntry::Excluded`] row. It never stops the other proteins.

use anyhow::{Context, Result};
use rayon::prelude::*;
use rustc_hash::FxHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::PathBuf;

use crate::seqio::read_to_string;
use crate::tools::{ToolRunner, ToolSpec};
use crate::workspace::{ScopedArtifact, Workspace};

// ============================================================================
// Records
// ============================================================================

/// Attributes extracted from one motif report.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct FeatureRecord {
    pub identifier: String,
    pub feature_name: Option<String>,
    pub length: Option<usize>,
    pub start: Option<usize>,
    pub end: Option<usize>,
}

/// One row of the feature table.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum FeatureEntry {
    Found(FeatureRecord),
    Excluded { identifier: String, reason: String },
}

impl FeatureEntry {
    pub fn identifier(&self) -> &str {
        match self {
            FeatureEntry::Found(r) => &r.identifier,
            FeatureEntry::Excluded { identifier, .. } => identifier,
        }
    }

    pub fn is_excluded(&self) -> bool {
        matches!(self, FeatureEntry::Excluded { .. })
    }
}

/// Feature rows keyed by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct FeatureTable {
    entries: BTreeMap<String, FeatureEntry>,
}

impl FeatureTable {
    pub fn insert(&mut self, entry: FeatureEntry) {
        self.entries.insert(entry.identifier().to_string(), entry);
    }

    pub fn get(&self, identifier: &str) -> Option<&FeatureEntry> {
        self.entries.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureEntry> {
        self.entries.values()
    }

    pub fn excluded(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|e| e.is_excluded()).map(|e| e.identifier())
    }

    /// Writes the table as TSV: `Identifier Motif Length Start End Status`.
    /// Absent attributes are empty cells.
    pub fn write_table<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "Identifier\tMotif\tLength\tStart\tEnd\tStatus")?;
        for entry in self.iter() {
            match entry {
                FeatureEntry::Found(r) => writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}\tok",
                    r.identifier,
                    r.feature_name.as_deref().unwrap_or(""),
                    cell(r.length),
                    cell(r.start),
                    cell(r.end),
                )?,
                FeatureEntry::Excluded { identifier, .. } => {
                    writeln!(out, "{}\t\t\t\t\texcluded", identifier)?
                }
            }
        }
        Ok(())
    }
}

fn cell(value: Option<usize>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// ============================================================================
// Report Parsing
// ============================================================================

/// Extracts the recognized markers from a report's text.
pub fn parse_report(identifier: &str, text: &str) -> FeatureRecord {
    let mut record = FeatureRecord {
        identifier: identifier.to_string(),
        ..FeatureRecord::default()
    };

    for line in text.lines() {
        if line.trim_start().starts_with('#') {
            continue;
        }
        if line.contains("Length") {
            if let Some(v) = numeric_field(identifier, line, "Length", 2) {
                record.length = Some(v);
            }
        }
        if line.contains("Start") {
            if let Some(v) = numeric_field(identifier, line, "Start", 3) {
                record.start = Some(v);
            }
        }
        if line.contains("End") {
            if let Some(v) = numeric_field(identifier, line, "End", 3) {
                record.end = Some(v);
            }
        }
        if line.contains("Motif") {
            match line.split_whitespace().nth(2) {
                Some(name) => record.feature_name = Some(name.to_string()),
                None => malformed(identifier, "Motif", line),
            }
        }
    }

    record
}

fn numeric_field(identifier: &str, line: &str, marker: &str, index: usize) -> Option<usize> {
    let value = line.split_whitespace().nth(index).and_then(|f| f.parse().ok());
    if value.is_none() {
        malformed(identifier, marker, line);
    }
    value
}

fn malformed(identifier: &str, marker: &str, line: &str) {
    tracing::warn!(
        "{}: malformed {} line in motif report, leaving it empty: {:?}",
        identifier,
        marker,
        line.trim()
    );
}

// ============================================================================
// Aggregation
// ============================================================================

/// Produces the motif report for one identifier.
pub trait ReportSource: Sync {
    /// Returns the report file, removed when the guard drops.
    fn produce(&self, identifier: &str) -> Result<ScopedArtifact>;
}

/// Builds the table for `identifiers`, one entry per identifier.
///
/// With `parallel`, reports are produced on the rayon pool; each report is
/// independent so the resulting table is identical.
pub fn aggregate(identifiers: &[String], source: &dyn ReportSource, parallel: bool) -> FeatureTable {
    let entries: Vec<FeatureEntry> = if parallel {
        identifiers.par_iter().map(|id| collect_one(id, source)).collect()
    } else {
        identifiers.iter().map(|id| collect_one(id, source)).collect()
    };

    let mut table = FeatureTable::default();
    for entry in entries {
        table.insert(entry);
    }
    table
}

fn collect_one(identifier: &str, source: &dyn ReportSource) -> FeatureEntry {
    let report = source.produce(identifier).and_then(|artifact| {
        let text = read_to_string(artifact.path())?;
        Ok(parse_report(identifier, &text))
    });

    match report {
        Ok(record) => FeatureEntry::Found(record),
        Err(e) => {
            tracing::warn!(
                "Unable to produce motif report for accession number {}; excluded from table: {:#}",
                identifier,
                e
            );
            FeatureEntry::Excluded {
                identifier: identifier.to_string(),
                reason: format!("{:#}", e),
            }
        }
    }
}

/// pullseq + patmatmotifs, one scratch directory entry per identifier.
pub struct PatmatmotifsSource<'a> {
    pub runner: &'a dyn ToolRunner,
    pub workspace: &'a Workspace,
    /// Aligned FASTA that pullseq extracts from.
    pub aligned: PathBuf,
    pub pullseq: String,
}

impl ReportSource for PatmatmotifsSource<'_> {
    fn produce(&self, identifier: &str) -> Result<ScopedArtifact> {
        let stem = file_stem(identifier);

        let id_file = self.workspace.artifact(format!("{}.id", stem));
        std::fs::write(id_file.path(), format!("{}\n", identifier))
            .with_context(|| format!("Failed to write {}", id_file.path().display()))?;

        let fasta = self.workspace.artifact(format!("{}.fasta", stem));
        self.runner.invoke(
            &ToolSpec::new(&self.pullseq)
                .current_dir(self.workspace.base())
                .arg("-i")
                .arg(&self.aligned)
                .arg("-n")
                .arg(id_file.path())
                .stdout_to(fasta.path()),
        )?;

        let report = self.workspace.artifact(format!("{}.motif", stem));
        self.runner.invoke(
            &ToolSpec::new("patmatmotifs")
                .current_dir(self.workspace.base())
                .arg(fasta.path())
                .arg("-outfile")
                .arg(report.path()),
        )?;

        Ok(report)
    }
}

/// Identifier made safe for use as a file name.
///
/// Identifiers that needed rewriting get a hash suffix so `a/b` and `a_b`
/// never share scratch files.
fn file_stem(identifier: &str) -> String {
    let stem: String = identifier
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    if stem == identifier {
        return stem;
    }

    let mut hasher = FxHasher::default();
    identifier.hash(&mut hasher);
    format!("{}_{:016x}", stem, hasher.finish())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolFailure;
    use crate::tools::fake::{stdout, FakeRunner};

    const REPORT: &str = "\
########################################
# Program: patmatmotifs
# Report_format: dbmotif
########################################

#=======================================
#
# Sequence: XP_015140120.1     from: 1   to: 480
# HitCount: 2
#
#=======================================

Length = 8
Start = position 35 of sequence
End = position 42 of sequence

Motif = PKC_PHOSPHO_SITE

Length = 17
Start = position 101 of sequence
End = position 117 of sequence

Motif = ATP_GTP_A
";

    #[test]
    fn test_parse_report_last_motif_wins() {
        let r = parse_report("XP_015140120.1", REPORT);
        assert_eq!(r.identifier, "XP_015140120.1");
        assert_eq!(r.feature_name.as_deref(), Some("ATP_GTP_A"));
        assert_eq!(r.length, Some(17));
        assert_eq!(r.start, Some(101));
        assert_eq!(r.end, Some(117));
    }

    #[test]
    fn test_parse_report_without_motifs() {
        let text = "# Sequence: NP_1.1     from: 1   to: 90\n# HitCount: 0\n";
        let r = parse_report("NP_1.1", text);
        assert_eq!(r, FeatureRecord { identifier: "NP_1.1".into(), ..Default::default() });
    }

    #[test]
    fn test_parse_report_malformed_fields() {
        let text = "Length = many\nStart = position\nEnd = position x of sequence\nMotif =\n";
        let r = parse_report("A", text);
        assert_eq!(r.length, None);
        assert_eq!(r.start, None);
        assert_eq!(r.end, None);
        assert_eq!(r.feature_name, None);
    }

    #[test]
    fn test_parse_report_ignores_header_paths() {
        let text = "\
########################################
# Program: patmatmotifs
# Commandline: patmatmotifs
#    -outfile /data/Motif_Length_End_Start/XP_9.1.motif
# Report_file: /data/Motif_Length_End_Start/XP_9.1.motif
########################################

#=======================================
#
# Sequence: XP_9.1     from: 1   to: 120
# HitCount: 0
#
#=======================================
";
        let r = parse_report("XP_9.1", text);
        assert_eq!(r, FeatureRecord { identifier: "XP_9.1".into(), ..Default::default() });
    }

    #[test]
    fn test_file_stem_keeps_distinct_ids_apart() {
        assert_eq!(file_stem("XP_1.1"), "XP_1.1");
        assert_eq!(file_stem("a_b"), "a_b");
        assert_ne!(file_stem("a/b"), file_stem("a_b"));
        assert_ne!(file_stem("a/b"), file_stem("a|b"));
        assert_eq!(file_stem("a/b"), file_stem("a/b"));
        assert!(file_stem("a/b").starts_with("a_b_"));
        assert!(!file_stem("gi|1|ref|XP_1.1|").contains('|'));
    }

    /// Writes canned reports into a workspace; ids listed in `missing` never
    /// materialize, ids in `failing` make the tool fail.
    struct CannedSource {
        ws: Workspace,
        missing: Vec<&'static str>,
        failing: Vec<&'static str>,
    }

    impl ReportSource for CannedSource {
        fn produce(&self, identifier: &str) -> Result<ScopedArtifact> {
            if self.failing.contains(&identifier) {
                anyhow::bail!("pullseq found no sequence");
            }
            let artifact = self.ws.artifact(format!("{}.motif", identifier));
            if !self.missing.contains(&identifier) {
                std::fs::write(artifact.path(), REPORT)?;
            }
            Ok(artifact)
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_aggregate_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let source = CannedSource {
            ws: Workspace::new(dir.path(), false).unwrap(),
            missing: vec!["B.1"],
            failing: vec!["C.1"],
        };
        let requested = ids(&["A.1", "B.1", "C.1", "D.1"]);

        for parallel in [false, true] {
            let table = aggregate(&requested, &source, parallel);
            assert_eq!(table.len(), 4);
            assert!(matches!(table.get("A.1"), Some(FeatureEntry::Found(_))));
            assert!(table.get("B.1").unwrap().is_excluded());
            assert!(table.get("C.1").unwrap().is_excluded());
            assert_eq!(table.excluded().collect::<Vec<_>>(), vec!["B.1", "C.1"]);
        }

        // reports are scratch files
        assert!(!dir.path().join("A.1.motif").exists());
    }

    #[test]
    fn test_aggregate_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = CannedSource {
            ws: Workspace::new(dir.path(), false).unwrap(),
            missing: vec![],
            failing: vec![],
        };
        assert!(aggregate(&[], &source, true).is_empty());
    }

    #[test]
    fn test_write_table() {
        let mut table = FeatureTable::default();
        table.insert(FeatureEntry::Found(FeatureRecord {
            identifier: "XP_2.1".into(),
            feature_name: Some("ATP_GTP_A".into()),
            length: Some(8),
            start: Some(10),
            end: Some(17),
        }));
        table.insert(FeatureEntry::Found(FeatureRecord {
            identifier: "XP_1.1".into(),
            ..Default::default()
        }));
        table.insert(FeatureEntry::Excluded {
            identifier: "XP_3.1".into(),
            reason: "missing".into(),
        });

        let mut out = Vec::new();
        table.write_table(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Identifier\tMotif\tLength\tStart\tEnd\tStatus");
        assert_eq!(lines[1], "XP_1.1\t\t\t\t\tok");
        assert_eq!(lines[2], "XP_2.1\tATP_GTP_A\t8\t10\t17\tok");
        assert_eq!(lines[3], "XP_3.1\t\t\t\t\texcluded");
    }

    #[test]
    fn test_patmatmotifs_source_runs_both_tools() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), false).unwrap();
        let runner = FakeRunner::new(|spec: &ToolSpec| {
            if spec.program == "patmatmotifs" {
                let out = spec.args.last().unwrap();
                std::fs::write(out, REPORT).unwrap();
            }
            stdout("")
        });
        let source = PatmatmotifsSource {
            runner: &runner,
            workspace: &ws,
            aligned: ws.path("set.aligned"),
            pullseq: "pullseq".into(),
        };

        let table = aggregate(&ids(&["gi_odd/name"]), &source, false);
        assert!(matches!(table.get("gi_odd/name"), Some(FeatureEntry::Found(_))));
        assert_eq!(runner.programs(), vec!["pullseq", "patmatmotifs"]);
    }

    #[test]
    fn test_patmatmotifs_failure_excludes() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), false).unwrap();
        let runner = FakeRunner::new(|spec: &ToolSpec| {
            Err(ToolFailure::NonZeroExit {
                program: spec.program.clone(),
                code: Some(1),
                stderr: String::new(),
            })
        });
        let source = PatmatmotifsSource {
            runner: &runner,
            workspace: &ws,
            aligned: ws.path("set.aligned"),
            pullseq: "pullseq".into(),
        };
        let table = aggregate(&ids(&["XP_1.1"]), &source, false);
        assert!(table.get("XP_1.1").unwrap().is_excluded());
    }
}
