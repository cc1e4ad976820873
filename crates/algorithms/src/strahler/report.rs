//! Per-iteration and per-order records returned by the Strahler engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Counts of one pruning iteration, or of the root region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Iteration index starting at 1; 0 for the root record
    pub iteration: usize,
    pub trees: usize,
    pub branches: usize,
    /// End-points outside the root region
    pub endpoints: usize,
    /// Junction clusters; root junctions are subtracted at iteration 1
    pub junctions: usize,
    pub triples: usize,
    pub quadruples: usize,
    pub mean_branch_length: f64,
    pub note: String,
}

/// Measurements of all branches of one Strahler order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order: usize,
    /// Branches, or trees when isolated voxels are kept
    pub branch_count: usize,
    pub mean_branch_length: f64,
    /// Branch count of the previous order divided by this one; NaN for order 1
    pub ramification_ratio: f64,
    pub unit: String,
    pub note: String,
}

/// Structured output of a Strahler analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub iterations: Vec<IterationRecord>,
    pub orders: Vec<OrderRecord>,
    /// Present when a root region was given
    pub root: Option<IterationRecord>,
}

impl Report {
    /// Highest order reached
    pub fn max_order(&self) -> usize {
        self.orders.last().map_or(0, |o| o.order)
    }

    /// Branch count per order, lowest order first
    pub fn branch_counts(&self) -> Vec<usize> {
        self.orders.iter().map(|o| o.branch_count).collect()
    }
}

/// Recoverable analysis failures, reported through the result notes
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    #[error("InvalidInput: {0}")]
    InvalidInput(String),

    #[error("MissingIntensity: {0}")]
    MissingIntensity(String),

    #[error("UnresolvedLoop: unsolved loop(s) at iteration {iteration}")]
    UnresolvedLoop { iteration: usize },

    #[error("NoEndpoints: no end-points at iteration {iteration}")]
    NoEndpoints { iteration: usize },

    #[error("IterationLimit: analysis truncated after {iterations} iteration(s) with {junctions} junction(s) left")]
    IterationLimit { iterations: usize, junctions: usize },
}

impl Diagnostic {
    /// Short kind name
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::InvalidInput(_) => "InvalidInput",
            Diagnostic::MissingIntensity(_) => "MissingIntensity",
            Diagnostic::UnresolvedLoop { .. } => "UnresolvedLoop",
            Diagnostic::NoEndpoints { .. } => "NoEndpoints",
            Diagnostic::IterationLimit { .. } => "IterationLimit",
        }
    }

    /// Whether the label image and report are still complete
    pub fn is_truncation(&self) -> bool {
        matches!(self, Diagnostic::IterationLimit { .. })
    }
}

/// Render diagnostics one per line
pub(crate) fn render_notes(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
