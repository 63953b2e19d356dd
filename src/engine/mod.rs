//! Strategy combination and execution engine.

pub mod applicability;
pub mod attempt;
pub mod combinations;

pub use applicability::{
    ApplicableStrategies, FilterError, filter_applicable, is_applicable, url_scheme,
};
pub use attempt::{AttemptReport, execute_attempt};
pub use combinations::{CandidateSet, CandidateSets, Subsets, enumerate_candidates};
