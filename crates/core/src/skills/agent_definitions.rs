//! # Agent Definitions
//!
//! The default expert roster and the factory that turns it into an
//! [`AgentPool`]. Each agent gets its own completion service so that
//! per-agent model settings apply.

use std::sync::Arc;

use crate::error::ServiceError;
use crate::models::AgentModels;
use crate::swarm::catalog::{AgentPool, TaskKind};

use super::expert::{CompletionService, ExpertHandle};
use super::llm_client::ChatClient;
use super::llm_expert::LlmExpert;
use super::prompts;

/// Reviewing focus of each evaluator on the default panel
pub const EVALUATOR_PANEL: &[(&str, &str)] = &[
    (
        "evaluator_a",
        "You are reviewer A. Weigh catalytic activity, kinetics and removal efficiency most carefully.",
    ),
    (
        "evaluator_b",
        "You are reviewer B. Weigh cost, scalability and process engineering most carefully.",
    ),
    (
        "evaluator_c",
        "You are reviewer C. Weigh environmental impact, leaching and long-term stability most carefully.",
    ),
];

/// The Designer
///
/// First agent of every round. Proposes the candidate material.
pub fn designer_agent(service: Arc<dyn CompletionService>) -> ExpertHandle {
    Arc::new(LlmExpert::new("designer", TaskKind::Design, prompts::DESIGNER, service))
}

/// One reviewer of the evaluation panel
pub fn evaluator_agent(id: &str, focus: &str, service: Arc<dyn CompletionService>) -> ExpertHandle {
    Arc::new(LlmExpert::new(
        id,
        TaskKind::Evaluate,
        prompts::evaluator_prompt(focus),
        service,
    ))
}

/// The Final Validator
///
/// Merges the panel's evaluations into the report returned to the user.
pub fn final_validator_agent(service: Arc<dyn CompletionService>) -> ExpertHandle {
    Arc::new(LlmExpert::new(
        "final_validator",
        TaskKind::Finalize,
        prompts::FINAL_VALIDATOR,
        service,
    ))
}

pub fn mechanism_agent(service: Arc<dyn CompletionService>) -> ExpertHandle {
    Arc::new(LlmExpert::new(
        "mechanism_expert",
        TaskKind::Mechanism,
        prompts::MECHANISM,
        service,
    ))
}

pub fn synthesis_agent(service: Arc<dyn CompletionService>) -> ExpertHandle {
    Arc::new(LlmExpert::new(
        "synthesis_expert",
        TaskKind::Synthesis,
        prompts::SYNTHESIS,
        service,
    ))
}

pub fn operation_agent(service: Arc<dyn CompletionService>) -> ExpertHandle {
    Arc::new(LlmExpert::new(
        "operation_expert",
        TaskKind::OperationAdvice,
        prompts::OPERATION,
        service,
    ))
}

/// Build the default pool, asking `service_for` for each agent's backend
pub fn create_agent_pool_with<F>(mut service_for: F) -> Result<AgentPool, ServiceError>
where
    F: FnMut(&str) -> Result<Arc<dyn CompletionService>, ServiceError>,
{
    let mut pool = AgentPool::new();
    pool.register(designer_agent(service_for("designer")?));
    for &(id, focus) in EVALUATOR_PANEL {
        pool.register(evaluator_agent(id, focus, service_for(id)?));
    }
    pool.register(final_validator_agent(service_for("final_validator")?));
    pool.register(mechanism_agent(service_for("mechanism_expert")?));
    pool.register(synthesis_agent(service_for("synthesis_expert")?));
    pool.register(operation_agent(service_for("operation_expert")?));

    tracing::debug!(experts = pool.len(), "Agent pool created");
    Ok(pool)
}

/// Build the default pool over HTTP chat clients
pub fn create_agent_pool(models: &AgentModels) -> Result<AgentPool, ServiceError> {
    create_agent_pool_with(|agent_id| {
        let client = ChatClient::new(models.resolve(agent_id))?;
        Ok(Arc::new(client) as Arc<dyn CompletionService>)
    })
}

/// Chat client for the classifier
pub fn classifier_service(models: &AgentModels) -> Result<Arc<dyn CompletionService>, ServiceError> {
    Ok(Arc::new(ChatClient::new(models.resolve("classifier"))?))
}
