//! # Task Catalog
//!
//! The closed set of task kinds and the [`AgentPool`] that maps each kind to
//! its registered experts. The pool is filled once during setup and read
//! only while a run is in progress.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::UnknownTaskKind;
use crate::skills::expert::ExpertHandle;

/// A category of work in the fixed catalog
///
/// Variant order is the canonical execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    /// Propose a candidate material
    Design,
    /// Score the candidate on the five criteria
    Evaluate,
    /// Merge evaluations into a validated report
    Finalize,
    /// Reaction mechanism analysis
    Mechanism,
    /// Synthesis route
    Synthesis,
    /// Operating recommendations
    OperationAdvice,
}

impl TaskKind {
    /// Every kind in canonical order
    pub const ALL: [TaskKind; 6] = [
        TaskKind::Design,
        TaskKind::Evaluate,
        TaskKind::Finalize,
        TaskKind::Mechanism,
        TaskKind::Synthesis,
        TaskKind::OperationAdvice,
    ];

    /// The default kind used whenever classification cannot decide
    pub const DEFAULT: TaskKind = TaskKind::Design;

    /// Canonical catalog name
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Design => "design",
            TaskKind::Evaluate => "evaluate",
            TaskKind::Finalize => "finalize",
            TaskKind::Mechanism => "mechanism",
            TaskKind::Synthesis => "synthesis",
            TaskKind::OperationAdvice => "operation-advice",
        }
    }

    /// Kinds that may be requested in isolation as follow-on work
    pub fn is_downstream_only(&self) -> bool {
        matches!(
            self,
            TaskKind::Mechanism | TaskKind::Synthesis | TaskKind::OperationAdvice
        )
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = UnknownTaskKind;

    /// Accepts canonical names and the legacy role names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "design" | "material-design" => Ok(TaskKind::Design),
            "evaluate" | "evaluation" => Ok(TaskKind::Evaluate),
            "finalize" | "final-validation" => Ok(TaskKind::Finalize),
            "mechanism" | "mechanism-analysis" => Ok(TaskKind::Mechanism),
            "synthesis" | "synthesis-method" => Ok(TaskKind::Synthesis),
            "operation-advice" | "operation" | "operation-suggestion" => {
                Ok(TaskKind::OperationAdvice)
            }
            _ => Err(UnknownTaskKind(s.to_string())),
        }
    }
}

/// Registry of expert handles per task kind
#[derive(Debug, Clone, Default)]
pub struct AgentPool {
    experts: BTreeMap<TaskKind, Vec<ExpertHandle>>,
}

impl AgentPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an expert under its own kind
    pub fn register(&mut self, expert: ExpertHandle) -> &mut Self {
        self.experts.entry(expert.kind()).or_default().push(expert);
        self
    }

    /// Builder-style registration
    pub fn with(mut self, expert: ExpertHandle) -> Self {
        self.register(expert);
        self
    }

    /// All handles registered for `kind`, in registration order
    pub fn handles(&self, kind: TaskKind) -> &[ExpertHandle] {
        self.experts.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First registered handle for `kind`
    pub fn first(&self, kind: TaskKind) -> Option<&ExpertHandle> {
        self.handles(kind).first()
    }

    /// First handle of the first registered kind in canonical order
    pub fn first_any(&self) -> Option<&ExpertHandle> {
        self.experts.values().find_map(|handles| handles.first())
    }

    /// Kinds that have at least one handle
    pub fn registered_kinds(&self) -> Vec<TaskKind> {
        self.experts
            .iter()
            .filter(|(_, handles)| !handles.is_empty())
            .map(|(kind, _)| *kind)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.experts.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ExpertError;
    use crate::skills::expert::{Expert, UpstreamArtifact};
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Expert that echoes a fixed string
    pub(crate) struct StaticExpert {
        pub name: String,
        pub kind: TaskKind,
        pub output: String,
    }

    #[async_trait]
    impl Expert for StaticExpert {
        fn name(&self) -> &str {
            &self.name
        }

        fn kind(&self) -> TaskKind {
            self.kind
        }

        async fn invoke(
            &self,
            _requirement: &str,
            _upstream: &[UpstreamArtifact],
        ) -> Result<String, ExpertError> {
            Ok(self.output.clone())
        }
    }

    pub(crate) fn static_expert(name: &str, kind: TaskKind) -> ExpertHandle {
        Arc::new(StaticExpert {
            name: name.to_string(),
            kind,
            output: format!("{} output", name),
        })
    }

    #[test]
    fn test_parse_canonical_and_legacy_names() {
        assert_eq!("design".parse::<TaskKind>(), Ok(TaskKind::Design));
        assert_eq!("Evaluation".parse::<TaskKind>(), Ok(TaskKind::Evaluate));
        assert_eq!(
            "final_validation".parse::<TaskKind>(),
            Ok(TaskKind::Finalize)
        );
        assert_eq!(
            "operation_advice".parse::<TaskKind>(),
            Ok(TaskKind::OperationAdvice)
        );
        assert_eq!(
            " mechanism_analysis ".parse::<TaskKind>(),
            Ok(TaskKind::Mechanism)
        );
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!("designs".parse::<TaskKind>().is_err());
        assert!("literature".parse::<TaskKind>().is_err());
        assert!("".parse::<TaskKind>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for kind in TaskKind::ALL {
            assert_eq!(kind.to_string().parse::<TaskKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_downstream_only() {
        assert!(TaskKind::Mechanism.is_downstream_only());
        assert!(TaskKind::OperationAdvice.is_downstream_only());
        assert!(!TaskKind::Finalize.is_downstream_only());
    }

    #[test]
    fn test_pool_registration_order() {
        let pool = AgentPool::new()
            .with(static_expert("evaluator_a", TaskKind::Evaluate))
            .with(static_expert("designer", TaskKind::Design))
            .with(static_expert("evaluator_b", TaskKind::Evaluate));

        assert_eq!(pool.len(), 3);
        let names: Vec<_> = pool
            .handles(TaskKind::Evaluate)
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(names, vec!["evaluator_a", "evaluator_b"]);
        // canonical order, not registration order
        assert_eq!(pool.first_any().map(|e| e.name()), Some("designer"));
        assert!(pool.first(TaskKind::Synthesis).is_none());
        assert_eq!(
            pool.registered_kinds(),
            vec![TaskKind::Design, TaskKind::Evaluate]
        );
    }

    #[test]
    fn test_empty_pool() {
        let pool = AgentPool::new();
        assert!(pool.is_empty());
        assert!(pool.first_any().is_none());
        assert!(pool.handles(TaskKind::Design).is_empty());
    }
}
