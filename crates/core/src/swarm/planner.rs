//! # Execution Planner
//!
//! Builds a linear plan of [`TaskNode`]s from the classified kinds.
//!
//! ```text
//! design ──→ evaluate#1..n ──→ finalize ──→ mechanism / synthesis / operation-advice
//!   └──────────────────────────────↗
//! ```
//!
//! Missing predecessors are replaced by the placeholder artifact, which is
//! the raw requirement text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::error::PlanningError;
use crate::skills::expert::ExpertHandle;

use super::catalog::{AgentPool, TaskKind};

/// Label used for the placeholder upstream artifact
pub const PLACEHOLDER_LABEL: &str = "requirement";

/// Position of a node within its plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a node's input comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    /// Artifact of an earlier node
    Node(NodeId),
    /// Raw requirement text
    Placeholder,
}

/// What happened when a node was driven
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeOutcome {
    Completed { artifact: String },
    Failed { reason: String },
    Skipped { blocked_by: String },
}

impl NodeOutcome {
    pub fn artifact(&self) -> Option<&str> {
        match self {
            NodeOutcome::Completed { artifact } => Some(artifact),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, NodeOutcome::Completed { .. })
    }
}

/// One unit of planned work
#[derive(Debug, Clone)]
pub struct TaskNode {
    pub id: NodeId,
    pub kind: TaskKind,
    /// Unique label within the plan (`design`, `evaluate#2`, ...)
    pub label: String,
    pub expert: ExpertHandle,
    pub upstream: Vec<Upstream>,
    outcome: OnceLock<NodeOutcome>,
}

impl TaskNode {
    fn new(id: NodeId, kind: TaskKind, label: String, expert: ExpertHandle, upstream: Vec<Upstream>) -> Self {
        Self {
            id,
            kind,
            label,
            expert,
            upstream,
            outcome: OnceLock::new(),
        }
    }

    /// Outcome once the driver has visited this node
    pub fn outcome(&self) -> Option<&NodeOutcome> {
        self.outcome.get()
    }

    /// Record the outcome. Returns false if one was already recorded.
    pub(crate) fn record(&self, outcome: NodeOutcome) -> bool {
        self.outcome.set(outcome).is_ok()
    }
}

/// Ordered nodes for one round
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    /// Requirement text for this round, also the placeholder artifact
    pub requirement: String,
    pub nodes: Vec<TaskNode>,
    /// De-duplicated experts taking part in this round
    pub roster: Vec<ExpertHandle>,
}

impl ExecutionPlan {
    pub fn node(&self, id: NodeId) -> Option<&TaskNode> {
        self.nodes.get(id.0)
    }

    pub fn nodes_of(&self, kind: TaskKind) -> impl Iterator<Item = &TaskNode> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    pub fn has(&self, kind: TaskKind) -> bool {
        self.nodes_of(kind).next().is_some()
    }

    pub fn roster_names(&self) -> Vec<&str> {
        self.roster.iter().map(|e| e.name()).collect()
    }
}

/// Build the plan for `kinds`.
///
/// Kinds run in canonical catalog order so every edge points backwards.
/// The evaluate kind expands into one node per registered evaluator.
pub fn plan(
    kinds: &[TaskKind],
    pool: &AgentPool,
    requirement: &str,
) -> Result<ExecutionPlan, PlanningError> {
    if pool.is_empty() {
        return Err(PlanningError::EmptyPool);
    }

    let mut ordered: Vec<TaskKind> = TaskKind::ALL
        .into_iter()
        .filter(|k| kinds.contains(k))
        .collect();
    if ordered.is_empty() {
        ordered.push(TaskKind::DEFAULT);
    }

    let mut nodes: Vec<TaskNode> = Vec::new();
    for kind in ordered {
        let experts = assign(kind, pool)?;
        let panel = experts.len() > 1;

        for (i, expert) in experts.into_iter().enumerate() {
            let id = NodeId(nodes.len());
            let label = if panel {
                format!("{}#{}", kind, i + 1)
            } else {
                kind.to_string()
            };
            let upstream = edges(kind, &nodes);
            nodes.push(TaskNode::new(id, kind, label, expert, upstream));
        }
    }

    let mut roster: Vec<ExpertHandle> = Vec::new();
    for node in &nodes {
        if !roster.iter().any(|e| e.name() == node.expert.name()) {
            roster.push(node.expert.clone());
        }
    }

    tracing::debug!(
        nodes = nodes.len(),
        roster = roster.len(),
        "Built execution plan"
    );

    Ok(ExecutionPlan {
        requirement: requirement.to_string(),
        nodes,
        roster,
    })
}

/// Experts for a kind: the whole panel for evaluate, the first handle otherwise.
fn assign(kind: TaskKind, pool: &AgentPool) -> Result<Vec<ExpertHandle>, PlanningError> {
    let registered = pool.handles(kind);
    if kind == TaskKind::Evaluate && !registered.is_empty() {
        return Ok(registered.to_vec());
    }
    if let Some(expert) = registered.first() {
        return Ok(vec![expert.clone()]);
    }

    let substitute = pool.first_any().ok_or(PlanningError::EmptyPool)?;
    tracing::warn!(
        kind = %kind,
        substitute = substitute.name(),
        "No expert registered for kind, substituting"
    );
    Ok(vec![substitute.clone()])
}

fn edges(kind: TaskKind, built: &[TaskNode]) -> Vec<Upstream> {
    let first = |k: TaskKind| built.iter().find(|n| n.kind == k).map(|n| Upstream::Node(n.id));
    let design = first(TaskKind::Design);

    match kind {
        TaskKind::Design => Vec::new(),
        TaskKind::Evaluate => vec![design.unwrap_or(Upstream::Placeholder)],
        TaskKind::Finalize => {
            let mut up = vec![design.unwrap_or(Upstream::Placeholder)];
            up.extend(
                built
                    .iter()
                    .filter(|n| n.kind == TaskKind::Evaluate)
                    .map(|n| Upstream::Node(n.id)),
            );
            up
        }
        TaskKind::Mechanism | TaskKind::Synthesis | TaskKind::OperationAdvice => {
            vec![first(TaskKind::Finalize)
                .or(design)
                .unwrap_or(Upstream::Placeholder)]
        }
    }
}
