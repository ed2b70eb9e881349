//! # Swarm Orchestration
//!
//! Coordinates the expert pipeline.
//!
//! ## Pipeline Flow
//!
//! ```text
//! Requirement → Classifier → Planner → Driver → Consensus Scorer → Iteration Controller
//!                               ↑                                          │
//!                               └────────── requirement + feedback ────────┘
//! ```

pub mod catalog;
pub mod classifier;
pub mod coordinator;
pub mod driver;
pub mod events;
pub mod pipeline;
pub mod planner;

pub use catalog::{AgentPool, TaskKind};
pub use classifier::TaskClassifier;
pub use coordinator::{
    run_pipeline, Coordinator, CoordinatorConfig, PipelineOutcome, RoundSummary, WorkflowMode,
};
pub use driver::{ExecutionDriver, ExecutionReport, NodeReport};
pub use events::{EventLog, SwarmEvent, SwarmEventKind};
pub use pipeline::{IterationState, PipelineStage, RoundDecision, Termination};
pub use planner::{plan, ExecutionPlan, NodeId, NodeOutcome, TaskNode, Upstream};
