//! # Scoring
//!
//! Multi-judge consensus over five-criterion judgment vectors.

pub mod consensus;

pub use consensus::{
    AgreementLevel, AgreementThresholds, ConsensusResult, ConsensusScorer, Criterion,
    CriterionSummary, CriterionWeights, Judgment, JudgmentVector, Rank,
};
