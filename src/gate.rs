//! Threshold Gate Module
//!
//! Decides whether a search result is worth analysing.
//!
//! # Rules (first match wins)
//! 1. `total_results < min_sequences` → abort, without asking
//! 2. `total_results > max_sequences` → ask; abort if declined
//! 3. `distinct_species > max_species` → ask; abort if declined
//! 4. otherwise proceed
//!
//! Rules 2 and 3 are both asked when both ceilings are exceeded.

use crate::docsum::CountSummary;
use crate::error::PipelineError;
use crate::prompt::{Confirm, Decision, PromptError};

/// Count limits for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ThresholdPolicy {
    pub max_sequences: usize,
    pub max_species: usize,
    pub min_sequences: usize,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            max_sequences: 1000,
            max_species: 300,
            min_sequences: 3,
        }
    }
}

/// A ceiling the user agreed to exceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum GateWarning {
    TooManySequences { found: usize, limit: usize },
    TooManySpecies { found: usize, limit: usize },
}

impl GateWarning {
    fn question(&self) -> String {
        match self {
            GateWarning::TooManySequences { limit, .. } => format!(
                "Warning! Search resulted in more than {} sequences.\n do you wish to continue? Y/N: ",
                limit
            ),
            GateWarning::TooManySpecies { limit, .. } => format!(
                "Warning! Search resulted in more than {} species.\n do you wish to continue? Y/N: ",
                limit
            ),
        }
    }

    fn stage(&self) -> &'static str {
        match self {
            GateWarning::TooManySequences { .. } => "sequence count check",
            GateWarning::TooManySpecies { .. } => "species count check",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum AbortReason {
    InsufficientData { found: usize, required: usize },
    Declined(GateWarning),
    Cancelled(GateWarning),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum GateOutcome {
    Proceed,
    ProceedWithWarning { confirmed: Vec<GateWarning> },
    Abort(AbortReason),
}

impl GateOutcome {
    pub fn is_proceed(&self) -> bool {
        !matches!(self, GateOutcome::Abort(_))
    }

    /// Converts an abort into the matching run-level error.
    pub fn into_result(self) -> Result<Self, PipelineError> {
        match self {
            GateOutcome::Abort(AbortReason::InsufficientData { found, required }) => {
                Err(PipelineError::InsufficientData { found, required })
            }
            GateOutcome::Abort(AbortReason::Declined(w)) => {
                Err(PipelineError::Declined { stage: w.stage().into() })
            }
            GateOutcome::Abort(AbortReason::Cancelled(w)) => {
                Err(PipelineError::Cancelled { stage: w.stage().into() })
            }
            proceed => Ok(proceed),
        }
    }

    /// Sequence cap handed to the aligner. Raised to the full result size
    /// when the user accepted more than `max_sequences`.
    pub fn alignment_cap(&self, summary: &CountSummary, policy: &ThresholdPolicy) -> usize {
        match self {
            GateOutcome::ProceedWithWarning { confirmed }
                if confirmed
                    .iter()
                    .any(|w| matches!(w, GateWarning::TooManySequences { .. })) =>
            {
                summary.total_results.max(policy.max_sequences)
            }
            _ => policy.max_sequences,
        }
    }
}

/// Applies the gate rules. The only side effects are `confirmer` calls.
pub fn evaluate(
    summary: &CountSummary,
    policy: &ThresholdPolicy,
    confirmer: &mut dyn Confirm,
) -> GateOutcome {
    tracing::info!(
        "Number of Sequences: {}, Number of Species: {}",
        summary.total_results,
        summary.distinct_species
    );

    if summary.total_results < policy.min_sequences {
        return GateOutcome::Abort(AbortReason::InsufficientData {
            found: summary.total_results,
            required: policy.min_sequences,
        });
    }

    let mut pending = Vec::new();
    if summary.total_results > policy.max_sequences {
        pending.push(GateWarning::TooManySequences {
            found: summary.total_results,
            limit: policy.max_sequences,
        });
    }
    if summary.distinct_species > policy.max_species {
        pending.push(GateWarning::TooManySpecies {
            found: summary.distinct_species,
            limit: policy.max_species,
        });
    }

    if pending.is_empty() {
        return GateOutcome::Proceed;
    }

    for warning in &pending {
        match confirmer.confirm(&warning.question()) {
            Ok(Decision::Yes) => {}
            Ok(Decision::No) => return GateOutcome::Abort(AbortReason::Declined(*warning)),
            Err(PromptError::Io(e)) => {
                tracing::warn!("confirmation failed: {}", e);
                return GateOutcome::Abort(AbortReason::Cancelled(*warning));
            }
            Err(_) => return GateOutcome::Abort(AbortReason::Cancelled(*warning)),
        }
    }

    GateOutcome::ProceedWithWarning { confirmed: pending }
}
