//! # LLM Expert
//!
//! An [`Expert`] that answers by sending its system prompt and the rendered
//! context to a [`CompletionService`].

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ExpertError;
use crate::swarm::catalog::TaskKind;

use super::expert::{render_context, CompletionService, Expert, UpstreamArtifact};

/// Expert backed by a completion service
pub struct LlmExpert {
    name: String,
    kind: TaskKind,
    system_prompt: String,
    service: Arc<dyn CompletionService>,
}

impl LlmExpert {
    pub fn new(
        name: impl Into<String>,
        kind: TaskKind,
        system_prompt: impl Into<String>,
        service: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            system_prompt: system_prompt.into(),
            service,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

#[async_trait]
impl Expert for LlmExpert {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> TaskKind {
        self.kind
    }

    async fn invoke(
        &self,
        requirement: &str,
        upstream: &[UpstreamArtifact],
    ) -> Result<String, ExpertError> {
        let prompt = render_context(requirement, upstream);
        self.service
            .complete(&self.system_prompt, &prompt)
            .await
            .map_err(|source| ExpertError::Service {
                expert: self.name.clone(),
                source,
            })
    }
}
