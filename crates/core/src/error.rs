//! # Error Taxonomy
//!
//! Typed errors for every stage of the pipeline. Only [`PipelineError`]
//! crosses the `run_pipeline` boundary. Classification and node failures
//! are recovered where they happen; an [`AggregationError`] ends the run
//! and is reported in the outcome.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of the completion service backing the classifier and experts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("API key not set: expected environment variable {0}")]
    MissingApiKey(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode provider response: {0}")]
    Decode(String),

    #[error("provider returned an empty answer")]
    EmptyAnswer,
}

/// Why the classifier fell back to the default plan
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassificationError {
    #[error("classification service failed: {0}")]
    Service(#[from] ServiceError),

    #[error("answer is not a list of strings: {0}")]
    NotAList(String),

    #[error("answer named no known task kind")]
    NoKnownKinds,
}

/// Planning cannot proceed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanningError {
    #[error("agent pool is empty: no expert registered for any task kind")]
    EmptyPool,
}

/// A single expert invocation failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpertError {
    #[error("expert {expert} failed: {source}")]
    Service {
        expert: String,
        #[source]
        source: ServiceError,
    },

    #[error("expert {0} produced no output")]
    EmptyOutput(String),

    #[error("expert {expert} timed out after {secs}s")]
    Timeout { expert: String, secs: u64 },

    #[error("expert {expert} rejected the request: {reason}")]
    Rejected { expert: String, reason: String },
}

/// Judgments could not be merged
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregationError {
    #[error("no judgments to aggregate")]
    NoJudgments,

    #[error("judgment {index} has {len} criteria, expected 5")]
    WrongLength { index: usize, len: usize },

    #[error("judgment {index} criterion {criterion} = {value} is outside [1, 10]")]
    OutOfRange {
        index: usize,
        criterion: usize,
        value: f64,
    },

    #[error("evaluation from {source_node} could not be parsed: {reason}")]
    Unparseable { source_node: String, reason: String },
}

/// Invalid pipeline configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("max_rounds must be at least 1")]
    ZeroRounds,

    #[error("criterion weights must be finite and non-negative")]
    NegativeWeight,

    #[error("criterion weights must sum to 1.0, got {0}")]
    WeightSum(f64),

    #[error("agreement thresholds must satisfy 0 <= high <= medium, got high={high} medium={medium}")]
    Thresholds { high: f64, medium: f64 },
}

/// Fatal pipeline errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Planning(#[from] PlanningError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Unknown catalog name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown task kind: {0}")]
pub struct UnknownTaskKind(pub String);
