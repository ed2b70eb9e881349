//! # Execution Driver
//!
//! Runs a plan strictly in order, one node at a time. A failed node blocks
//! its dependants (transitively); unrelated nodes still run.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::error::ExpertError;
use crate::skills::expert::UpstreamArtifact;

use super::catalog::TaskKind;
use super::events::{EventLog, SwarmEvent, SwarmEventKind};
use super::planner::{ExecutionPlan, NodeOutcome, TaskNode, Upstream, PLACEHOLDER_LABEL};

/// Outcome of one node, detached from the plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReport {
    pub label: String,
    pub kind: TaskKind,
    pub expert: String,
    #[serde(flatten)]
    pub outcome: NodeOutcome,
}

/// Per-node results of one round, in plan order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub nodes: Vec<NodeReport>,
}

impl ExecutionReport {
    /// Outcome by node label
    pub fn outcome(&self, label: &str) -> Option<&NodeOutcome> {
        self.nodes
            .iter()
            .find(|n| n.label == label)
            .map(|n| &n.outcome)
    }

    /// Completed artifacts of `kind` as (label, text)
    pub fn completed(&self, kind: TaskKind) -> Vec<(&str, &str)> {
        self.nodes
            .iter()
            .filter(|n| n.kind == kind)
            .filter_map(|n| n.outcome.artifact().map(|a| (n.label.as_str(), a)))
            .collect()
    }

    pub fn planned(&self, kind: TaskKind) -> bool {
        self.nodes.iter().any(|n| n.kind == kind)
    }

    /// Every node completed
    pub fn is_complete(&self) -> bool {
        self.nodes.iter().all(|n| n.outcome.is_completed())
    }

    /// The artifact to hand back: finalize, else design, else the last completed node
    pub fn primary_artifact(&self) -> Option<&str> {
        [TaskKind::Finalize, TaskKind::Design]
            .into_iter()
            .find_map(|kind| self.completed(kind).first().map(|(_, text)| *text))
            .or_else(|| {
                self.nodes
                    .iter()
                    .rev()
                    .find_map(|n| n.outcome.artifact())
            })
    }
}

/// Sequential plan executor
#[derive(Debug, Clone, Default)]
pub struct ExecutionDriver {
    node_timeout: Option<Duration>,
}

impl ExecutionDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any expert call that takes longer than `limit`
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.node_timeout = Some(limit);
        self
    }

    /// Drive every node of `plan` and collect the outcomes
    pub async fn run(&self, plan: &ExecutionPlan, round: u32, events: &mut EventLog) -> ExecutionReport {
        for node in &plan.nodes {
            let outcome = match gather_upstream(plan, node) {
                Err(blocked_by) => {
                    tracing::warn!(
                        node = %node.label,
                        blocked_by = %blocked_by,
                        "Skipping node with incomplete upstream"
                    );
                    events
                        .emit(
                            SwarmEvent::new(SwarmEventKind::NodeSkipped, node.expert.name())
                                .in_round(round)
                                .with_data(json!({ "node": node.label, "blocked_by": blocked_by })),
                        )
                        .await;
                    NodeOutcome::Skipped { blocked_by }
                }
                Ok(context) => self.invoke(plan, node, &context, round, events).await,
            };

            if !node.record(outcome) {
                tracing::warn!(node = %node.label, "Node already had an outcome, keeping the first");
            }
        }

        ExecutionReport {
            nodes: plan
                .nodes
                .iter()
                .filter_map(|node| {
                    node.outcome().map(|outcome| NodeReport {
                        label: node.label.clone(),
                        kind: node.kind,
                        expert: node.expert.name().to_string(),
                        outcome: outcome.clone(),
                    })
                })
                .collect(),
        }
    }

    async fn invoke(
        &self,
        plan: &ExecutionPlan,
        node: &TaskNode,
        context: &[UpstreamArtifact],
        round: u32,
        events: &mut EventLog,
    ) -> NodeOutcome {
        let expert = node.expert.name();
        tracing::info!(node = %node.label, expert, "Running node");
        events
            .emit(
                SwarmEvent::new(SwarmEventKind::NodeStarted, expert)
                    .in_round(round)
                    .with_data(json!({ "node": node.label, "kind": node.kind })),
            )
            .await;

        let call = node.expert.invoke(&plan.requirement, context);
        let result = match self.node_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or_else(|_| {
                    Err(ExpertError::Timeout {
                        expert: expert.to_string(),
                        secs: limit.as_secs(),
                    })
                }),
            None => call.await,
        };
        let result = result.and_then(|text| {
            if text.trim().is_empty() {
                Err(ExpertError::EmptyOutput(expert.to_string()))
            } else {
                Ok(text)
            }
        });

        match result {
            Ok(artifact) => {
                tracing::debug!(node = %node.label, chars = artifact.len(), "Node completed");
                events
                    .emit(
                        SwarmEvent::new(SwarmEventKind::NodeCompleted, expert)
                            .in_round(round)
                            .with_data(json!({ "node": node.label, "chars": artifact.len() })),
                    )
                    .await;
                NodeOutcome::Completed { artifact }
            }
            Err(e) => {
                tracing::warn!(node = %node.label, error = %e, "Node failed");
                events
                    .emit(
                        SwarmEvent::new(SwarmEventKind::NodeFailed, expert)
                            .in_round(round)
                            .with_data(json!({ "node": node.label, "error": e.to_string() })),
                    )
                    .await;
                NodeOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Upstream artifacts for `node`, or the label of the first upstream node that did not complete.
fn gather_upstream(plan: &ExecutionPlan, node: &TaskNode) -> Result<Vec<UpstreamArtifact>, String> {
    node.upstream
        .iter()
        .map(|up| match up {
            Upstream::Placeholder => Ok(UpstreamArtifact::new(PLACEHOLDER_LABEL, &plan.requirement)),
            Upstream::Node(id) => {
                let source = plan.node(*id).ok_or_else(|| id.to_string())?;
                source
                    .outcome()
                    .and_then(NodeOutcome::artifact)
                    .map(|text| UpstreamArtifact::new(&source.label, text))
                    .ok_or_else(|| source.label.clone())
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::skills::expert::{Expert, ExpertHandle};
    use crate::swarm::catalog::tests::static_expert;
    use crate::swarm::catalog::AgentPool;
    use crate::swarm::planner::plan;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Expert that always fails
    pub(crate) struct BrokenExpert {
        pub name: String,
        pub kind: TaskKind,
    }

    #[async_trait]
    impl Expert for BrokenExpert {
        fn name(&self) -> &str {
            &self.name
        }

        fn kind(&self) -> TaskKind {
            self.kind
        }

        async fn invoke(&self, _: &str, _: &[UpstreamArtifact]) -> Result<String, ExpertError> {
            Err(ExpertError::Rejected {
                expert: self.name.clone(),
                reason: "model unavailable".into(),
            })
        }
    }

    /// Expert that records what it was given
    struct RecordingExpert {
        kind: TaskKind,
        seen: Mutex<Vec<(String, Vec<UpstreamArtifact>)>>,
    }

    #[async_trait]
    impl Expert for RecordingExpert {
        fn name(&self) -> &str {
            "recorder"
        }

        fn kind(&self) -> TaskKind {
            self.kind
        }

        async fn invoke(&self, requirement: &str, upstream: &[UpstreamArtifact]) -> Result<String, ExpertError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push((requirement.to_string(), upstream.to_vec()));
            }
            Ok("recorded".into())
        }
    }

    /// Expert that never answers
    struct SlowExpert;

    #[async_trait]
    impl Expert for SlowExpert {
        fn name(&self) -> &str {
            "slow"
        }

        fn kind(&self) -> TaskKind {
            TaskKind::Design
        }

        async fn invoke(&self, _: &str, _: &[UpstreamArtifact]) -> Result<String, ExpertError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("late".into())
        }
    }

    fn broken(name: &str, kind: TaskKind) -> ExpertHandle {
        Arc::new(BrokenExpert {
            name: name.to_string(),
            kind,
        })
    }

    #[tokio::test]
    async fn test_runs_all_nodes_in_order() {
        let pool = AgentPool::new()
            .with(static_expert("designer", TaskKind::Design))
            .with(static_expert("evaluator_a", TaskKind::Evaluate))
            .with(static_expert("validator", TaskKind::Finalize));
        let plan = plan(&[TaskKind::Design, TaskKind::Evaluate, TaskKind::Finalize], &pool, "req").unwrap();
        let mut events = EventLog::default();

        let report = ExecutionDriver::new().run(&plan, 0, &mut events).await;

        assert!(report.is_complete());
        assert_eq!(report.nodes.len(), 3);
        assert_eq!(report.primary_artifact(), Some("validator output"));
        assert_eq!(
            events
                .events()
                .iter()
                .filter(|e| e.kind == SwarmEventKind::NodeCompleted)
                .count(),
            3
        );
    }

    #[tokio::test]
    async fn test_failure_skips_only_dependants() {
        let pool = AgentPool::new()
            .with(static_expert("designer", TaskKind::Design))
            .with(broken("evaluator_a", TaskKind::Evaluate))
            .with(static_expert("evaluator_b", TaskKind::Evaluate))
            .with(static_expert("validator", TaskKind::Finalize))
            .with(static_expert("synthesis", TaskKind::Synthesis));
        let kinds = [
            TaskKind::Design,
            TaskKind::Evaluate,
            TaskKind::Finalize,
            TaskKind::Synthesis,
        ];
        let plan = plan(&kinds, &pool, "req").unwrap();
        let mut events = EventLog::default();

        let report = ExecutionDriver::new().run(&plan, 0, &mut events).await;

        assert!(report.outcome("design").unwrap().is_completed());
        assert!(matches!(report.outcome("evaluate#1"), Some(NodeOutcome::Failed { .. })));
        assert!(report.outcome("evaluate#2").unwrap().is_completed());
        assert_eq!(
            report.outcome("finalize"),
            Some(&NodeOutcome::Skipped {
                blocked_by: "evaluate#1".into()
            })
        );
        // transitively blocked through finalize
        assert_eq!(
            report.outcome("synthesis"),
            Some(&NodeOutcome::Skipped {
                blocked_by: "finalize".into()
            })
        );
        assert!(!report.is_complete());
        assert_eq!(report.primary_artifact(), Some("designer output"));
        assert_eq!(report.completed(TaskKind::Evaluate).len(), 1);
    }

    #[tokio::test]
    async fn test_independent_node_runs_after_failure() {
        let pool = AgentPool::new()
            .with(broken("designer", TaskKind::Design))
            .with(static_expert("mechanism", TaskKind::Mechanism));
        // mechanism alone depends only on the placeholder
        let plan = plan(&[TaskKind::Mechanism], &pool, "req").unwrap();
        let report = ExecutionDriver::new().run(&plan, 0, &mut EventLog::default()).await;
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_upstream_context_is_passed() {
        let recorder = Arc::new(RecordingExpert {
            kind: TaskKind::Evaluate,
            seen: Mutex::new(Vec::new()),
        });
        let pool = AgentPool::new()
            .with(static_expert("designer", TaskKind::Design))
            .with(recorder.clone());
        let plan = plan(&[TaskKind::Design, TaskKind::Evaluate], &pool, "treat dye effluent").unwrap();

        ExecutionDriver::new().run(&plan, 0, &mut EventLog::default()).await;

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "treat dye effluent");
        assert_eq!(seen[0].1, vec![UpstreamArtifact::new("design", "designer output")]);
    }

    #[tokio::test]
    async fn test_placeholder_context_is_requirement() {
        let recorder = Arc::new(RecordingExpert {
            kind: TaskKind::Mechanism,
            seen: Mutex::new(Vec::new()),
        });
        let pool = AgentPool::new().with(recorder.clone());
        let plan = plan(&[TaskKind::Mechanism], &pool, "explain Fenton").unwrap();

        ExecutionDriver::new().run(&plan, 0, &mut EventLog::default()).await;

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].1, vec![UpstreamArtifact::new(PLACEHOLDER_LABEL, "explain Fenton")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_node_failure() {
        let pool = AgentPool::new().with(Arc::new(SlowExpert));
        let plan = plan(&[TaskKind::Design], &pool, "req").unwrap();

        let report = ExecutionDriver::new()
            .with_timeout(Duration::from_secs(5))
            .run(&plan, 0, &mut EventLog::default())
            .await;

        match report.outcome("design") {
            Some(NodeOutcome::Failed { reason }) => assert!(reason.contains("timed out")),
            other => panic!("expected timeout failure, got {:?}", other),
        }
    }
}
