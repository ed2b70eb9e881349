//! # Matforge Core
//!
//! Orchestration logic for a panel of material-design experts: which experts
//! must run, in what order, how their judgments merge into one score, and
//! when the pipeline loops back with feedback.
//!
//! ## Architecture
//!
//! - `skills/` - Expert capability, completion service, prompts, default roster
//! - `models` - LLM provider and per-agent model configuration
//! - `scoring/` - Multi-judge consensus scoring
//! - `state/` - Run report persistence
//! - `swarm/` - Catalog, classifier, planner, driver and iteration control
//!
//! ## Usage
//!
//! ```rust,ignore
//! use matforge_core::skills::{classifier_service, create_agent_pool};
//! use matforge_core::swarm::{run_pipeline, CoordinatorConfig, TaskClassifier};
//!
//! let models = AgentModels::default();
//! let pool = create_agent_pool(&models)?;
//! let classifier = TaskClassifier::new(classifier_service(&models)?);
//! let outcome = run_pipeline("Design a catalyst for phenol removal", CoordinatorConfig::default(), pool, classifier).await?;
//! ```

pub mod error;
pub mod models;
pub mod scoring;
pub mod skills;
pub mod state;
pub mod swarm;

pub use error::{
    AggregationError, ClassificationError, ConfigError, ExpertError, PipelineError,
    PlanningError, ServiceError,
};
pub use swarm::{run_pipeline, CoordinatorConfig, PipelineOutcome};
