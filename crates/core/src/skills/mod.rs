//! # Matforge Skills
//!
//! Expert capabilities and the services behind them.
//!
//! ## Architecture
//!
//! ```text
//! AgentPool
//!   └── Expert (LlmExpert + prompt)
//!         └── CompletionService (ChatClient → OpenAI-compatible endpoint)
//! ```
//!
//! ## Default Roster
//!
//! - `designer` - proposes a candidate material
//! - `evaluator_a/b/c` - independent five-criterion scoring panel
//! - `final_validator` - merges panel evaluations into the final report
//! - `mechanism_expert`, `synthesis_expert`, `operation_expert` - follow-on analyses

pub mod expert;
pub mod llm_client;
pub mod llm_expert;
pub mod prompts;

// Artifact Registry (structured expert outputs)
pub mod artifact_registry;

// Agent Definitions (compose prompts and services into experts)
pub mod agent_definitions;

// Re-exports for convenience
pub use artifact_registry::{parse_judgment, EvaluationArtifact};
pub use expert::{render_context, CompletionService, Expert, ExpertHandle, UpstreamArtifact};
pub use llm_client::ChatClient;
pub use llm_expert::LlmExpert;

// Agent factory functions
pub use agent_definitions::{
    classifier_service, create_agent_pool, create_agent_pool_with, designer_agent,
    evaluator_agent, final_validator_agent, mechanism_agent, operation_agent, synthesis_agent,
};
