//! The risk-fusion pipeline: metadata heuristics, embedding duplicates,
//! score fusion and status reconciliation.

pub mod duplicates;
pub mod fusion;
pub mod heuristic;
pub mod reconcile;

pub use duplicates::{DuplicateDetector, DuplicateIndex};
pub use fusion::{FusedScore, ScoreFuser};
pub use heuristic::HeuristicScorer;
pub use reconcile::{ReconcileOutcome, Reconciler};
