//! Pipeline configuration.
//!
//! Built once from the command line and read-only for the rest of the run.

use std::path::PathBuf;

use crate::gate::ThresholdPolicy;
use crate::ranking::TruncationPolicy;

/// Where docsum and FASTA downloads come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, serde::Serialize)]
pub enum SearchBackend {
    /// EDirect command-line tools (`esearch | efetch`).
    #[default]
    Edirect,
    /// NCBI E-utilities over HTTPS.
    Eutils,
}

/// Settings for one or more pipeline runs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub policy: ThresholdPolicy,
    /// Number of top BLAST hits carried into the motif and plotting stages.
    pub top_n: usize,
    pub threads: usize,
    /// Path or name of the pullseq binary.
    pub pullseq: String,
    pub backend: SearchBackend,
    pub truncation: TruncationPolicy,
    /// `Some(decision)` skips the redundancy prompt.
    pub remove_redundant: Option<bool>,
    /// Answer every confirmation with yes.
    pub assume_yes: bool,
    /// `None` re-prompts forever on invalid answers.
    pub prompt_retries: Option<usize>,
    pub keep_temp: bool,
    pub outdir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            policy: ThresholdPolicy::default(),
            top_n: 250,
            threads: 16,
            pullseq: "pullseq".to_string(),
            backend: SearchBackend::default(),
            truncation: TruncationPolicy::default(),
            remove_redundant: None,
            assume_yes: false,
            prompt_retries: None,
            keep_temp: false,
            outdir: PathBuf::from("."),
        }
    }
}

impl PipelineConfig {
    /// Report generation fans out over rayon when more than one thread is
    /// available.
    pub fn parallel_reports(&self) -> bool {
        self.threads > 1
    }
}
