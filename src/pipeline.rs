//! Pipeline Driver Module
//!
//! Runs one search end to end.
//!
//! # Stages
//! ```text
//! search → docsum parse → threshold gate → FASTA fetch → redundancy filter
//!   → clustalo / cons / makeblastdb / blastp → top-N by bit score
//!   → accession normalization → conservation plot (plotcon)
//!   → per-accession motif reports (patmatmotifs) → feature table
//!   → transmembrane prediction (tmap) → run summary
//! ```
//!
//! Failures of the core path abort the run. The conservation plot and the
//! transmembrane report are side outputs: their failures are recorded as
//! warnings in the [`RunSummary`] and the run continues.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::accession::normalize;
use crate::blast::BlastTabReader;
use crate::config::PipelineConfig;
use crate::docsum::{parse_docsum, CountSummary, DocsumSource, SearchResultRecord};
use crate::error::{PipelineError, ToolFailure};
use crate::gate::{evaluate, GateOutcome};
use crate::motif::{aggregate, FeatureTable, PatmatmotifsSource};
use crate::prompt::{Confirm, Decision, PromptError};
use crate::query::SearchQuery;
use crate::ranking::{select_top, subject_accessions};
use crate::redundancy::{self, FilterOutcome};
use crate::tools::{ToolRunner, ToolSpec};
use crate::workspace::{write_id_list, ScopedArtifact, Workspace};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// Run Summary
// ============================================================================

/// Everything one run decided and produced.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunSummary {
    pub started_at: String,
    pub finished_at: String,
    pub run_name: String,
    pub term: String,
    pub counts: Option<CountSummary>,
    pub gate: Option<GateOutcome>,
    pub filter: Option<FilterOutcome>,
    pub hits_total: usize,
    /// Canonical accessions of the top hits, sorted.
    pub selected: Vec<String>,
    pub features: FeatureTable,
    pub outputs: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl RunSummary {
    fn new(term: &str, run_name: &str) -> Self {
        let now = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        Self {
            started_at: now.clone(),
            finished_at: now,
            run_name: run_name.to_string(),
            term: term.to_string(),
            counts: None,
            gate: None,
            filter: None,
            hits_total: 0,
            selected: Vec::new(),
            features: FeatureTable::default(),
            outputs: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn excluded(&self) -> Vec<&str> {
        self.features.excluded().collect()
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.finished_at = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run summary: {}", path.display()))?;
        Ok(())
    }
}

/// Files written by the alignment and BLAST stage.
#[derive(Debug, Clone)]
struct ConservedAnalysis {
    aligned: PathBuf,
    blast_results: PathBuf,
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    runner: &'a dyn ToolRunner,
    source: &'a dyn DocsumSource,
    workspace: Workspace,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        runner: &'a dyn ToolRunner,
        source: &'a dyn DocsumSource,
    ) -> Result<Self> {
        let workspace = Workspace::new(&config.outdir, config.keep_temp)?;
        Ok(Self {
            config,
            runner,
            source,
            workspace,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    fn tool(&self, program: &str) -> ToolSpec {
        ToolSpec::new(program).current_dir(self.workspace.base())
    }

    /// Runs every stage for `query`, naming outputs after `run_name`.
    ///
    /// Expected aborts (no results, too little data, declined or cancelled
    /// confirmations) come back as [`PipelineError`] inside the error.
    pub fn run(
        &self,
        query: &SearchQuery,
        run_name: &str,
        confirmer: &mut dyn Confirm,
    ) -> Result<RunSummary> {
        let term = query.term();
        let mut summary = RunSummary::new(&term, run_name);

        tracing::info!("Conducting search: {}", term);
        let records = self.search(&term)?;
        let counts = CountSummary::from_records(&records);
        summary.counts = Some(counts);

        let gate = evaluate(&counts, &self.config.policy, confirmer);
        summary.gate = Some(gate.clone());
        let gate = gate.into_result()?;
        let cap = gate.alignment_cap(&counts, &self.config.policy);

        let fasta = self.fetch_fasta(&term, run_name)?;
        summary.outputs.push(fasta.clone());

        let filter = self.filter_redundant(&fasta, run_name, counts.total_results, confirmer)?;
        let sequences = match filter {
            Some(ref outcome) => outcome.path().to_path_buf(),
            None => fasta,
        };
        if let Some(FilterOutcome::Filtered { ref path, .. }) = filter {
            summary.outputs.push(path.clone());
        }
        summary.filter = filter;

        let analysis = self.conserved_sequence_analysis(&sequences, run_name, cap)?;
        summary.outputs.push(analysis.aligned.clone());
        summary.outputs.push(analysis.blast_results.clone());

        let hits = BlastTabReader::open(&analysis.blast_results)?.collect::<Result<Vec<_>>>()?;
        summary.hits_total = hits.len();
        tracing::info!("Finding top {} of {} BLAST hits by bit score", self.config.top_n, hits.len());

        let top = select_top(hits, self.config.top_n, self.config.truncation);
        let mut selected: Vec<String> = normalize(subject_accessions(&top)).into_iter().collect();
        selected.sort();
        summary.selected = selected.clone();

        if selected.is_empty() {
            summary.warn("BLAST search returned no hits; skipping plot, motif and transmembrane stages".into());
            self.finish(&mut summary)?;
            return Ok(summary);
        }

        let top_fasta = self.extract_top(&analysis.aligned, &selected, run_name)?;

        match self.plot_conservation(top_fasta.path(), run_name) {
            Ok(plot) => summary.outputs.push(plot),
            Err(e) => summary.warn(format!("conservation plot failed: {:#}", e)),
        }

        tracing::info!("Searching for protein motifs in {} sequences...", selected.len());
        let source = PatmatmotifsSource {
            runner: self.runner,
            workspace: &self.workspace,
            aligned: analysis.aligned.clone(),
            pullseq: self.config.pullseq.clone(),
        };
        summary.features = aggregate(&selected, &source, self.config.parallel_reports());
        let table_path = self.workspace.path(format!("{}.motifs.tsv", run_name));
        let mut out = BufWriter::new(
            File::create(&table_path)
                .with_context(|| format!("Failed to create {}", table_path.display()))?,
        );
        summary.features.write_table(&mut out)?;
        summary.outputs.push(table_path);

        match self.predict_transmembrane(top_fasta.path(), run_name) {
            Ok(report) => summary.outputs.push(report),
            Err(e) => summary.warn(format!("transmembrane prediction failed: {:#}", e)),
        }

        self.finish(&mut summary)?;
        Ok(summary)
    }

    fn finish(&self, summary: &mut RunSummary) -> Result<()> {
        let path = self.workspace.path(format!("{}.summary.json", summary.run_name));
        summary.outputs.push(path.clone());
        summary.save(&path)
    }

    /// Fetches and parses the docsum. Tool failures other than a missing
    /// binary count as "no results".
    fn search(&self, term: &str) -> Result<Vec<SearchResultRecord>> {
        let text = match self.source.fetch_docsum(term) {
            Ok(text) => text,
            Err(e @ ToolFailure::NotFound { .. }) => return Err(PipelineError::Tool(e).into()),
            Err(e) => {
                tracing::debug!("search failed: {}", e);
                return Err(PipelineError::NoResults { term: term.to_string() }.into());
            }
        };

        let records = parse_docsum(&text);
        if records.is_empty() {
            return Err(PipelineError::NoResults { term: term.to_string() }.into());
        }
        Ok(records)
    }

    fn fetch_fasta(&self, term: &str, run_name: &str) -> Result<PathBuf> {
        let path = self.workspace.path(run_name);
        tracing::info!("Fetching FASTA files from NCBI protein database...");
        self.source.fetch_fasta(term, &path).map_err(PipelineError::Tool)?;

        let non_empty = std::fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);
        if !non_empty {
            return Err(PipelineError::MissingArtifact {
                stage: "FASTA fetch".into(),
                path,
            }
            .into());
        }
        Ok(path)
    }

    /// Offers the redundancy filter when the set is large enough; `None`
    /// when it was not run.
    fn filter_redundant(
        &self,
        fasta: &Path,
        run_name: &str,
        count: usize,
        confirmer: &mut dyn Confirm,
    ) -> Result<Option<FilterOutcome>> {
        if !redundancy::is_applicable(count) {
            return Ok(None);
        }

        let wanted = match self.config.remove_redundant {
            Some(choice) => choice,
            None => {
                let question = "Do you wish to remove duplicate sequences? \
                                This will also remove isoforms of the same protein. Y/N: ";
                match confirmer.confirm(question) {
                    Ok(decision) => decision == Decision::Yes,
                    Err(PromptError::Io(e)) => return Err(e.into()),
                    Err(_) => {
                        return Err(PipelineError::Cancelled {
                            stage: "redundancy filter".into(),
                        }
                        .into())
                    }
                }
            }
        };
        if !wanted {
            return Ok(None);
        }

        tracing::info!("Removing redundant sequences...");
        let side = self.workspace.artifact(format!("{}.keep", run_name));
        let outcome = redundancy::apply(fasta, side, |input, output| {
            let spec = redundancy::skipredundant_spec(input, output).current_dir(self.workspace.base());
            self.runner.invoke(&spec)?;
            Ok(())
        })?;
        Ok(Some(outcome))
    }

    /// Alignment, consensus and BLAST of the consensus against the set.
    fn conserved_sequence_analysis(
        &self,
        sequences: &Path,
        run_name: &str,
        max_sequences: usize,
    ) -> Result<ConservedAnalysis> {
        let aligned = self.workspace.path(format!("{}.aligned", run_name));
        let consensus = self.workspace.path(format!("{}.con", run_name));
        let blast_results = self.workspace.path(format!("{}.blast", run_name));

        tracing::info!("Aligning sequences...");
        self.runner.invoke(
            &self
                .tool("clustalo")
                .arg("--force")
                .arg("--threads")
                .arg(self.config.threads.to_string())
                .arg("--maxnumseq")
                .arg(max_sequences.to_string())
                .arg("-i")
                .arg(sequences)
                .arg("-o")
                .arg(&aligned),
        )?;

        tracing::info!("Finding consensus sequence...");
        self.runner.invoke(
            &self
                .tool("cons")
                .args(["-datafile", "EBLOSUM62", "-sequence"])
                .arg(&aligned)
                .arg("-outseq")
                .arg(&consensus),
        )?;

        tracing::info!("Constructing BLAST database...");
        self.runner.invoke(
            &self
                .tool("makeblastdb")
                .arg("-in")
                .arg(sequences)
                .args(["-dbtype", "prot", "-out"])
                .arg(sequences),
        )?;

        tracing::info!("Conducting BLAST search with consensus sequence...");
        self.runner.invoke(
            &self
                .tool("blastp")
                .arg("-db")
                .arg(sequences)
                .arg("-query")
                .arg(&consensus)
                .args(["-outfmt", "7"])
                .stdout_to(&blast_results),
        )?;

        if !blast_results.exists() {
            return Err(PipelineError::MissingArtifact {
                stage: "blastp".into(),
                path: blast_results,
            }
            .into());
        }

        Ok(ConservedAnalysis {
            aligned,
            blast_results,
        })
    }

    /// Pulls the selected sequences out of the alignment into a scratch FASTA.
    fn extract_top(&self, aligned: &Path, selected: &[String], run_name: &str) -> Result<ScopedArtifact> {
        let id_list = self.workspace.artifact(format!("{}.top", run_name));
        write_id_list(id_list.path(), selected)?;

        let top_fasta = self.workspace.artifact(format!("{}.top.fasta", run_name));
        tracing::info!("Fetching top {} sequences from the alignment...", selected.len());
        self.runner.invoke(
            &self
                .tool(&self.config.pullseq)
                .arg("-i")
                .arg(aligned)
                .arg("-n")
                .arg(id_list.path())
                .stdout_to(top_fasta.path()),
        )?;
        Ok(top_fasta)
    }

    fn plot_conservation(&self, top_fasta: &Path, run_name: &str) -> Result<PathBuf> {
        let plot = self.workspace.path(format!("{}.plot", run_name));
        self.runner.invoke(
            &self
                .tool("plotcon")
                .arg("-sequence")
                .arg(top_fasta)
                .arg("-goutfile")
                .arg(&plot)
                .args(["-scorefile", "EBLOSUM62", "-winsize", "4", "-graph", "ps"]),
        )?;
        Ok(plot.with_extension("plot.ps"))
    }

    fn predict_transmembrane(&self, top_fasta: &Path, run_name: &str) -> Result<PathBuf> {
        let report = self.workspace.path(format!("{}.tmap", run_name));
        let plot = self.workspace.path(format!("{}.tmap.plot", run_name));
        self.runner.invoke(
            &self
                .tool("tmap")
                .arg(top_fasta)
                .arg("-out")
                .arg(&report)
                .arg("-goutfile")
                .arg(&plot)
                .args(["-graph", "ps"]),
        )?;
        Ok(report)
    }
}

/// Default run name derived from the query: lowercase, spaces to `_`.
pub fn default_run_name(query: &SearchQuery) -> String {
    format!("{}_{}", query.protein_family, query.taxon)
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-') { c } else { '_' })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::AutoConfirm;
    use crate::tools::fake::{stdout, FakeRunner};
    use crate::tools::ToolOutput;
    use std::fs;
    use std::sync::Mutex;

    const BLAST_TABLE: &str = "# BLASTP 2.12.0+\n# Query: EMBOSS_001\n# Database: set\n# Fields: ...\n# 4 hits found\n\
        EMBOSS_001\tgi|1|ref|XP_1.1|\t90\t100\t10\t0\t1\t100\t1\t100\t1e-50\t300\n\
        EMBOSS_001\tXP_2.1\t85\t100\t15\t0\t1\t100\t1\t100\t1e-40\t250\n\
        EMBOSS_001\tXP_1.1\t80\t50\t10\t0\t1\t50\t51\t100\t1e-10\t90\n\
        EMBOSS_001\tXP_3.1\t70\t100\t30\t1\t1\t100\t1\t100\t1e-5\t60\n\
        # BLAST processed 1 queries\n";

    const MOTIF_REPORT: &str = "Length = 8\nStart = position 3 of sequence\n\
        End = position 10 of sequence\nMotif = PKC_PHOSPHO_SITE\n";

    struct FakeNcbi {
        docsum: String,
        fasta: String,
    }

    impl DocsumSource for FakeNcbi {
        fn fetch_docsum(&self, _term: &str) -> Result<String, ToolFailure> {
            if self.docsum.is_empty() {
                return Err(ToolFailure::NonZeroExit {
                    program: "esearch".into(),
                    code: Some(1),
                    stderr: String::new(),
                });
            }
            Ok(self.docsum.clone())
        }

        fn fetch_fasta(&self, _term: &str, output: &Path) -> Result<(), ToolFailure> {
            fs::write(output, &self.fasta).map_err(|e| ToolFailure::Spawn {
                program: "efetch".into(),
                source: e,
            })
        }
    }

    fn docsum(n: usize, species: usize) -> String {
        (0..n)
            .map(|i| {
                format!(
                    "<Title>kinase [Species {}]</Title><AccessionVersion>XP_{}.1</AccessionVersion>\n",
                    i % species,
                    i
                )
            })
            .collect()
    }

    fn fasta(n: usize) -> String {
        (0..n).map(|i| format!(">XP_{}.1\nMKVLA\n", i)).collect()
    }

    /// Emulates the external tools by writing their expected outputs.
    fn emulate(spec: &ToolSpec, tmap_fails: bool) -> Result<ToolOutput, ToolFailure> {
        let arg_after = |flag: &str| {
            spec.args
                .iter()
                .position(|a| a == flag)
                .and_then(|i| spec.args.get(i + 1))
                .cloned()
        };
        // a child process resolves relative paths against its own cwd
        let write = |path: Option<std::ffi::OsString>, body: &str| {
            if let Some(p) = path {
                let cwd = spec.current_dir.clone().unwrap_or_default();
                fs::write(cwd.join(p), body).unwrap();
            }
        };

        match spec.program.as_str() {
            "skipredundant" => write(arg_after("-outseq"), &fasta(2)),
            "clustalo" => write(arg_after("-o"), &fasta(5)),
            "cons" => write(arg_after("-outseq"), ">EMBOSS_001\nMKVLA\n"),
            "blastp" => write(spec.stdout_path.clone().map(Into::into), BLAST_TABLE),
            "pullseq" => write(spec.stdout_path.clone().map(Into::into), &fasta(1)),
            "patmatmotifs" => {
                let fasta_in = spec.args[0].to_string_lossy().to_string();
                if !fasta_in.contains("XP_3.1") {
                    write(arg_after("-outfile"), MOTIF_REPORT);
                }
            }
            "tmap" if tmap_fails => {
                return Err(ToolFailure::NonZeroExit {
                    program: "tmap".into(),
                    code: Some(1),
                    stderr: "boom".into(),
                })
            }
            _ => {}
        }
        stdout("")
    }

    /// Files each tool reads, resolved the way the child process would.
    fn input_paths(spec: &ToolSpec) -> Vec<PathBuf> {
        let after = |flag: &str| {
            spec.args
                .iter()
                .position(|a| a == flag)
                .and_then(|i| spec.args.get(i + 1))
                .cloned()
        };
        let inputs = match spec.program.as_str() {
            "skipredundant" => vec![spec.args.last().cloned()],
            "clustalo" => vec![after("-i")],
            "cons" | "plotcon" => vec![after("-sequence")],
            "makeblastdb" => vec![after("-in")],
            "blastp" => vec![after("-query")],
            "pullseq" => vec![after("-i"), after("-n")],
            "patmatmotifs" | "tmap" => vec![spec.args.first().cloned()],
            _ => vec![],
        };
        let cwd = spec.current_dir.clone().unwrap_or_default();
        inputs.into_iter().flatten().map(|p| cwd.join(p)).collect()
    }

    fn config(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            outdir: dir.to_path_buf(),
            threads: 1,
            remove_redundant: Some(true),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_full_run() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let runner = FakeRunner::new(|spec: &ToolSpec| emulate(spec, true));
        let ncbi = FakeNcbi { docsum: docsum(5, 2), fasta: fasta(5) };
        let pipeline = Pipeline::new(&cfg, &runner, &ncbi).unwrap();
        let query = SearchQuery::new("kinase", "Aves").unwrap();

        let summary = pipeline.run(&query, "kinase_aves", &mut AutoConfirm(Decision::Yes)).unwrap();

        assert_eq!(summary.counts, Some(CountSummary { total_results: 5, distinct_species: 2 }));
        assert_eq!(summary.gate, Some(GateOutcome::Proceed));
        // skipredundant left 2 sequences: reverted
        assert!(matches!(summary.filter, Some(FilterOutcome::Reverted { remaining: 2, .. })));
        assert!(!dir.path().join("kinase_aves.keep").exists());

        assert_eq!(summary.hits_total, 4);
        assert_eq!(summary.selected, vec!["XP_1.1", "XP_2.1", "XP_3.1"]);
        assert_eq!(summary.features.len(), 3);
        assert_eq!(summary.excluded(), vec!["XP_3.1"]);
        assert_eq!(summary.warnings.len(), 1);
        assert!(summary.warnings[0].contains("transmembrane"));

        let table = fs::read_to_string(dir.path().join("kinase_aves.motifs.tsv")).unwrap();
        assert_eq!(table.lines().count(), 4);
        assert!(dir.path().join("kinase_aves.summary.json").exists());
        // scratch files are gone
        assert!(!dir.path().join("kinase_aves.top").exists());
        assert!(!dir.path().join("kinase_aves.top.fasta").exists());

        let programs = runner.programs();
        assert_eq!(programs[0], "skipredundant");
        assert!(programs.contains(&"plotcon".to_string()));
        assert_eq!(programs.iter().filter(|p| *p == "patmatmotifs").count(), 3);
    }

    #[test]
    fn test_relative_outdir_paths_resolve_for_tools() {
        let cwd_tmp = tempfile::tempdir_in(".").unwrap();
        let relative = PathBuf::from(cwd_tmp.path().file_name().unwrap()).join("runs");
        let cfg = config(&relative);
        let problems = Mutex::new(Vec::new());
        let runner = FakeRunner::new(|spec: &ToolSpec| {
            if !spec.current_dir.as_deref().is_some_and(Path::is_absolute) {
                problems.lock().unwrap().push(format!("{}: relative working directory", spec.program));
            }
            for path in input_paths(spec) {
                if !path.exists() {
                    problems.lock().unwrap().push(format!("{}: {}", spec.program, path.display()));
                }
            }
            emulate(spec, false)
        });
        let ncbi = FakeNcbi { docsum: docsum(5, 2), fasta: fasta(5) };
        let pipeline = Pipeline::new(&cfg, &runner, &ncbi).unwrap();
        let query = SearchQuery::new("kinase", "Aves").unwrap();

        let summary = pipeline.run(&query, "run", &mut AutoConfirm(Decision::Yes)).unwrap();

        let problems = problems.lock().unwrap().clone();
        assert!(problems.is_empty(), "{:?}", problems);
        assert_eq!(summary.excluded(), vec!["XP_3.1"]);
        assert!(summary.warnings.is_empty());
        assert!(relative.join("run.motifs.tsv").exists());
        assert!(relative.join("run.summary.json").exists());

        let programs = runner.programs();
        for tool in ["clustalo", "cons", "makeblastdb", "blastp", "plotcon", "tmap"] {
            assert!(programs.iter().any(|p| p == tool), "{} not run", tool);
        }
    }

    #[test]
    fn test_no_results_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let runner = FakeRunner::new(|_: &ToolSpec| stdout(""));
        let ncbi = FakeNcbi { docsum: String::new(), fasta: String::new() };
        let pipeline = Pipeline::new(&cfg, &runner, &ncbi).unwrap();
        let query = SearchQuery::new("nothing", "Aves").unwrap();

        let err = pipeline.run(&query, "x", &mut AutoConfirm(Decision::Yes)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoResults { .. })
        ));
        assert!(runner.programs().is_empty());
    }

    #[test]
    fn test_insufficient_data_aborts_before_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let runner = FakeRunner::new(|_: &ToolSpec| stdout(""));
        let ncbi = FakeNcbi { docsum: docsum(2, 1), fasta: fasta(2) };
        let pipeline = Pipeline::new(&cfg, &runner, &ncbi).unwrap();
        let query = SearchQuery::new("kinase", "Aves").unwrap();

        let err = pipeline.run(&query, "x", &mut AutoConfirm(Decision::Yes)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InsufficientData { found: 2, required: 3 })
        ));
        assert!(!dir.path().join("x").exists());
    }

    #[test]
    fn test_declined_gate_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.policy.max_species = 1;
        let runner = FakeRunner::new(|_: &ToolSpec| stdout(""));
        let ncbi = FakeNcbi { docsum: docsum(4, 3), fasta: fasta(4) };
        let pipeline = Pipeline::new(&cfg, &runner, &ncbi).unwrap();
        let query = SearchQuery::new("kinase", "Aves").unwrap();

        let err = pipeline.run(&query, "x", &mut AutoConfirm(Decision::No)).unwrap_err();
        let pipeline_err = err.downcast_ref::<PipelineError>().unwrap();
        assert!(matches!(pipeline_err, PipelineError::Declined { .. }));
        assert!(pipeline_err.is_expected_abort());
    }

    #[test]
    fn test_default_run_name() {
        let q = SearchQuery::new("ABC transporter", "Mammalia").unwrap();
        assert_eq!(default_run_name(&q), "abc_transporter_mammalia");
    }
}
