//! # Run Report
//!
//! Serialisable record of a finished pipeline run, written as
//! `workflow_result_<timestamp>.json`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::swarm::coordinator::PipelineOutcome;

/// A pipeline run as persisted to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// When the report was created
    pub created_at: DateTime<Utc>,
    /// Requirement as supplied by the caller
    pub requirement: String,
    /// Outcome including rounds and events
    pub outcome: PipelineOutcome,
}

impl RunReport {
    pub fn new(requirement: &str, outcome: PipelineOutcome) -> Self {
        Self {
            created_at: Utc::now(),
            requirement: requirement.to_string(),
            outcome,
        }
    }

    /// File name derived from the creation time
    pub fn file_name(&self) -> String {
        format!(
            "workflow_result_{}.json",
            self.created_at.format("%Y%m%d_%H%M%S")
        )
    }

    /// Write the report into `dir`, creating it if needed
    pub async fn save(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        let path = dir.join(self.file_name());
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write run report {}", path.display()))?;

        tracing::info!(path = %path.display(), "Run report saved");
        Ok(path)
    }

    /// Read a report back
    pub async fn load(path: &Path) -> Result<Self> {
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read run report {}", path.display()))?;
        serde_json::from_str(&data).context("Failed to parse run report")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swarm::catalog::TaskKind;
    use crate::swarm::pipeline::Termination;

    fn outcome() -> PipelineOutcome {
        PipelineOutcome {
            final_artifact: Some("report".into()),
            consensus: None,
            scoring_error: None,
            round_count: 1,
            resolved: true,
            termination: Termination::Unscored,
            incomplete: false,
            kinds: vec![TaskKind::Mechanism],
            rounds: Vec::new(),
            events: Vec::new(),
        }
    }

    #[test]
    fn test_file_name() {
        let report = RunReport::new("req", outcome());
        let name = report.file_name();
        assert!(name.starts_with("workflow_result_"));
        assert!(name.ends_with(".json"));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("matforge-report-{}", std::process::id()));
        let report = RunReport::new("explain Fenton", outcome());

        let path = report.save(&dir).await.unwrap();
        let loaded = RunReport::load(&path).await.unwrap();

        assert_eq!(loaded.requirement, "explain Fenton");
        assert_eq!(loaded.outcome.kinds, vec![TaskKind::Mechanism]);
        assert_eq!(loaded.outcome.termination, Termination::Unscored);

        let json = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(json.contains("\"termination\": \"unscored\""));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
