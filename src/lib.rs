//! protscout - Protein Family Survey Pipeline
//!
//! Searches the NCBI protein database for a protein family within a
//! taxonomic group, ranks the fetched sequences against their consensus and
//! aggregates per-protein PROSITE motif reports into one table.
//!
//! # Modules
//! - `docsum`: docsum parsing, result counts and NCBI search backends
//! - `query`: search term construction and input validation
//! - `prompt`: yes/no decisions and terminal prompting
//! - `gate`: result-count thresholds and confirmations
//! - `tools`: external program invocation
//! - `seqio`: plain/gzip text and FASTA readers
//! - `workspace`: run directory and scoped intermediate files
//! - `redundancy`: skipredundant filter with revert on too few survivors
//! - `blast`: BLAST tabular (`-outfmt 7`) parsing
//! - `ranking`: top-N hit selection by bit score
//! - `accession`: canonical accession extraction and deduplication
//! - `motif`: motif report parsing and feature table aggregation
//! - `config`: pipeline settings
//! - `error`: run-level failure types
//! - `pipeline`: end-to-end driver and run summary

pub mod accession;
pub mod blast;
pub mod config;
pub mod docsum;
pub mod error;
pub mod gate;
pub mod motif;
pub mod pipeline;
pub mod prompt;
pub mod query;
pub mod ranking;
pub mod redundancy;
pub mod seqio;
pub mod tools;
pub mod workspace;
