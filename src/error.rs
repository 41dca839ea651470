//! Run-level failure taxonomy.
//!
//! Failures local to one identifier never show up here; they become
//! excluded rows in the feature table. Everything in this module aborts the
//! whole run with a user-visible message.

use std::path::PathBuf;

/// Failure reported by an external tool invocation.
#[derive(Debug, thiserror::Error)]
pub enum ToolFailure {
    /// Program is not on `PATH`.
    #[error("{program} not found in PATH. Please install it or add it to your PATH.")]
    NotFound { program: String },

    /// Program exists but could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Program ran and exited unsuccessfully.
    #[error("{program} failed (exit code: {code:?}): {stderr}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Program succeeded but produced nothing usable.
    #[error("{program} produced no output")]
    NoOutput { program: String },

    /// HTTP request to a remote service failed.
    #[error("request to {service} failed: {message}")]
    Remote { service: String, message: String },
}

/// Conditions that abort an entire pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The search returned zero matches, or the search tool itself failed.
    #[error("There were no results for search: {term}")]
    NoResults { term: String },

    /// Counts fell below the policy minimum.
    #[error("Not enough sequences to conduct analysis ({found} found, {required} required)")]
    InsufficientData { found: usize, required: usize },

    /// The user declined a confirmation.
    #[error("Search has been cancelled at {stage}")]
    Declined { stage: String },

    /// Input was interrupted (EOF / ctrl-D) or retries were exhausted.
    #[error("Input cancelled at {stage}")]
    Cancelled { stage: String },

    /// A stage's expected artifact never materialized.
    #[error("{stage} did not produce {}", path.display())]
    MissingArtifact { stage: String, path: PathBuf },

    #[error(transparent)]
    Tool(#[from] ToolFailure),
}

impl PipelineError {
    /// True for aborts that are a normal outcome (user choice or empty data)
    /// rather than a malfunction.
    pub fn is_expected_abort(&self) -> bool {
        matches!(
            self,
            PipelineError::NoResults { .. }
                | PipelineError::InsufficientData { .. }
                | PipelineError::Declined { .. }
                | PipelineError::Cancelled { .. }
        )
    }
}
