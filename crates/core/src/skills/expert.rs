//! # Expert Capability
//!
//! The two seams every external collaborator plugs into:
//!
//! - [`Expert`] - an opaque worker registered for one [`TaskKind`]
//! - [`CompletionService`] - a text completion backend (classifier, LLM experts)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{ExpertError, ServiceError};
use crate::swarm::catalog::TaskKind;

/// Context handed to an expert from one upstream node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamArtifact {
    /// Label of the producing node, or `requirement` for the placeholder
    pub source: String,
    /// Artifact text
    pub text: String,
}

impl UpstreamArtifact {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }
}

/// A worker that turns a requirement plus upstream context into an artifact
#[async_trait]
pub trait Expert: Send + Sync {
    /// Identity/role used for roster de-duplication and logging
    fn name(&self) -> &str;

    /// The task kind this expert is registered for
    fn kind(&self) -> TaskKind;

    /// Produce an artifact or signal failure
    async fn invoke(
        &self,
        requirement: &str,
        upstream: &[UpstreamArtifact],
    ) -> Result<String, ExpertError>;
}

impl fmt::Debug for dyn Expert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expert")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

/// Shared handle to a registered expert
pub type ExpertHandle = Arc<dyn Expert>;

/// A text completion backend
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Complete `prompt` under the given system instructions
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ServiceError>;
}

/// Render the requirement followed by every upstream artifact.
pub fn render_context(requirement: &str, upstream: &[UpstreamArtifact]) -> String {
    let mut out = format!("## Requirement\n{}\n", requirement.trim());
    for artifact in upstream {
        out.push_str(&format!(
            "\n## Upstream: {}\n{}\n",
            artifact.source,
            artifact.text.trim()
        ));
    }
    out
}
