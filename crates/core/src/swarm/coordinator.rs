//! # Swarm Coordinator
//!
//! Runs the whole pipeline for one requirement: classify once, then loop
//! plan → execute → score → decide until a round is accepted or the
//! iteration budget says stop. Every round plans a fresh node graph.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::{AggregationError, ConfigError, PipelineError, PlanningError};
use crate::scoring::consensus::{AgreementThresholds, ConsensusResult, ConsensusScorer, CriterionWeights};
use crate::skills::artifact_registry::parse_judgment;

use super::catalog::{AgentPool, TaskKind};
use super::classifier::TaskClassifier;
use super::driver::{ExecutionDriver, ExecutionReport};
use super::events::{EventLog, SwarmEvent, SwarmEventKind};
use super::pipeline::{IterationState, RoundDecision, Termination};
use super::planner;

/// How the kind set is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowMode {
    /// Classify the requirement
    #[default]
    Autonomous,
    /// Run the full catalog without classification
    Preset,
}

/// Configuration for the coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Maximum iteration rounds
    pub max_rounds: u32,
    /// Minimum aggregate score for acceptance
    pub min_acceptable_score: f64,
    /// Criterion weights for the aggregate
    pub weights: CriterionWeights,
    /// SD cut-offs for agreement levels
    pub agreement: AgreementThresholds,
    /// Workflow mode (autonomous, preset)
    pub mode: WorkflowMode,
    /// Per-node timeout in seconds
    pub node_timeout_secs: Option<u64>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            min_acceptable_score: 7.0,
            weights: CriterionWeights::default(),
            agreement: AgreementThresholds::default(),
            mode: WorkflowMode::Autonomous,
            node_timeout_secs: None,
        }
    }
}

impl CoordinatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rounds == 0 {
            return Err(ConfigError::ZeroRounds);
        }
        self.weights.validate()?;
        self.agreement.validate()
    }
}

/// Record of one round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round: u32,
    /// Requirement text the round ran with
    pub requirement: String,
    pub report: ExecutionReport,
    pub consensus: Option<ConsensusResult>,
    /// Feedback carried into the next round
    pub feedback: Option<String>,
    /// Why the round's judgments could not be merged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring_error: Option<AggregationError>,
}

/// Result of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    /// Primary artifact of the last round
    pub final_artifact: Option<String>,
    /// Consensus of the most recent round that was scored
    pub consensus: Option<ConsensusResult>,
    /// Set when the run stopped because the last round could not be scored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring_error: Option<AggregationError>,
    pub round_count: u32,
    pub resolved: bool,
    pub termination: Termination,
    /// Some node of the last round did not complete
    pub incomplete: bool,
    /// Kinds the requirement was classified into
    pub kinds: Vec<TaskKind>,
    pub rounds: Vec<RoundSummary>,
    pub events: Vec<SwarmEvent>,
}

/// The swarm coordinator
pub struct Coordinator {
    config: CoordinatorConfig,
    pool: AgentPool,
    classifier: TaskClassifier,
    event_tx: Option<mpsc::Sender<SwarmEvent>>,
}

impl Coordinator {
    /// Create a coordinator over a fully populated pool
    pub fn new(config: CoordinatorConfig, pool: AgentPool, classifier: TaskClassifier) -> Self {
        Self {
            config,
            pool,
            classifier,
            event_tx: None,
        }
    }

    /// Set event channel for streaming events
    pub fn with_event_channel(mut self, tx: mpsc::Sender<SwarmEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Run the pipeline for `requirement`
    #[tracing::instrument(skip_all, fields(requirement_preview = %requirement.chars().take(50).collect::<String>()))]
    pub async fn run(&self, requirement: &str) -> Result<PipelineOutcome, PipelineError> {
        self.config.validate()?;
        if self.pool.is_empty() {
            return Err(PlanningError::EmptyPool.into());
        }

        let mut events = EventLog::new(self.event_tx.clone());
        events
            .emit(SwarmEvent::new(SwarmEventKind::PipelineStarted, "coordinator"))
            .await;

        let kinds = self.select_kinds(requirement, &mut events).await;
        tracing::info!(kinds = ?kinds, "Task kinds selected");

        let scorer = ConsensusScorer::new(self.config.weights, self.config.agreement);
        let mut driver = ExecutionDriver::new();
        if let Some(secs) = self.config.node_timeout_secs {
            driver = driver.with_timeout(Duration::from_secs(secs));
        }

        let mut state = IterationState::new(requirement, self.config.max_rounds);
        let mut rounds: Vec<RoundSummary> = Vec::new();

        loop {
            let round = state.round;
            let round_requirement = state.requirement();

            let plan = planner::plan(&kinds, &self.pool, &round_requirement)?;
            events
                .emit(
                    SwarmEvent::new(SwarmEventKind::PlanBuilt, "planner")
                        .in_round(round)
                        .with_data(json!({
                            "nodes": plan.nodes.iter().map(|n| n.label.as_str()).collect::<Vec<_>>(),
                            "roster": plan.roster_names(),
                        })),
                )
                .await;

            let report = driver.run(&plan, round, &mut events).await;
            drop(plan);

            let (consensus, scoring_error) = match self.score_round(&scorer, &report) {
                Ok(consensus) => (consensus, None),
                Err(e) => {
                    tracing::error!(round, error = %e, "Scoring failed, stopping");
                    events
                        .emit(
                            SwarmEvent::new(SwarmEventKind::ScoringFailed, "scorer")
                                .in_round(round)
                                .with_data(json!({ "error": e.to_string() })),
                        )
                        .await;
                    (None, Some(e))
                }
            };
            let decision = match &consensus {
                None if scoring_error.is_some() => state.stop(Termination::ScoringFailed),
                None if !report.planned(TaskKind::Evaluate) && report.is_complete() => {
                    state.stop(Termination::Unscored)
                }
                None => state.stop(Termination::Incomplete),
                Some(result) => {
                    state.scored();
                    events
                        .emit(
                            SwarmEvent::new(SwarmEventKind::RoundScored, "scorer")
                                .in_round(round)
                                .with_data(json!({ "aggregate": result.aggregate, "rank": result.rank })),
                        )
                        .await;
                    tracing::info!(round, aggregate = result.aggregate, rank = %result.rank, "Round scored");

                    let accepted = result.rank.is_acceptable()
                        && result.aggregate >= self.config.min_acceptable_score;
                    let feedback = if accepted {
                        None
                    } else {
                        extract_feedback(result, self.config.min_acceptable_score)
                    };
                    state.decide(accepted, feedback)
                }
            };

            let carried = match &decision {
                RoundDecision::Redesign { .. } => state.feedback.last().cloned(),
                RoundDecision::Stop(_) => None,
            };
            rounds.push(RoundSummary {
                round,
                requirement: round_requirement,
                report,
                consensus,
                feedback: carried.clone(),
                scoring_error,
            });

            match decision {
                RoundDecision::Redesign { .. } => {
                    tracing::warn!(round, "Round rejected, redesigning with feedback");
                    events
                        .emit(
                            SwarmEvent::new(SwarmEventKind::RoundRejected, "coordinator")
                                .in_round(round)
                                .with_data(json!({ "feedback": carried })),
                        )
                        .await;
                }
                RoundDecision::Stop(termination) => {
                    tracing::info!(round, termination = ?termination, "Pipeline finished");
                    break;
                }
            }
        }

        let termination = state.termination.unwrap_or(Termination::Incomplete);
        events
            .emit(
                SwarmEvent::new(SwarmEventKind::PipelineCompleted, "coordinator")
                    .with_data(json!({ "termination": termination, "rounds": state.round_count() })),
            )
            .await;

        let last = rounds.last();
        Ok(PipelineOutcome {
            final_artifact: last.and_then(|r| r.report.primary_artifact().map(str::to_string)),
            consensus: rounds.iter().rev().find_map(|r| r.consensus.clone()),
            scoring_error: last.and_then(|r| r.scoring_error.clone()),
            round_count: state.round_count(),
            resolved: termination.is_resolved(),
            termination,
            incomplete: last.map_or(true, |r| !r.report.is_complete()),
            kinds,
            rounds,
            events: events.into_events(),
        })
    }

    async fn select_kinds(&self, requirement: &str, events: &mut EventLog) -> Vec<TaskKind> {
        if self.config.mode == WorkflowMode::Preset {
            return TaskKind::ALL.to_vec();
        }

        match self.classifier.try_classify(requirement).await {
            Ok(kinds) => {
                events
                    .emit(
                        SwarmEvent::new(SwarmEventKind::ClassificationCompleted, "classifier")
                            .with_data(json!({ "kinds": kinds })),
                    )
                    .await;
                kinds
            }
            Err(e) => {
                tracing::warn!("Classification fell back to default: {}", e);
                events
                    .emit(
                        SwarmEvent::new(SwarmEventKind::ClassificationFellBack, "classifier")
                            .with_data(json!({ "error": e.to_string() })),
                    )
                    .await;
                vec![TaskKind::DEFAULT]
            }
        }
    }

    /// Consensus over every completed evaluation, or None when there is none
    fn score_round(
        &self,
        scorer: &ConsensusScorer,
        report: &ExecutionReport,
    ) -> Result<Option<ConsensusResult>, AggregationError> {
        let evaluations = report.completed(TaskKind::Evaluate);
        if evaluations.is_empty() {
            return Ok(None);
        }

        let judgments = evaluations
            .iter()
            .map(|(label, text)| parse_judgment(label, text))
            .collect::<Result<Vec<_>, _>>()?;
        scorer.score(&judgments).map(Some)
    }
}

/// Comments on criteria scoring below `threshold`, else the judges' recommendations.
pub fn extract_feedback(consensus: &ConsensusResult, threshold: f64) -> Option<String> {
    let mut lines: Vec<String> = consensus
        .flagged_below(threshold)
        .into_iter()
        .filter(|c| !c.rationale.is_empty())
        .map(|c| format!("- {} (mean {:.1}): {}", c.criterion, c.mean, c.rationale.join("; ")))
        .collect();

    if lines.is_empty() {
        lines = consensus
            .recommendations
            .iter()
            .map(|r| format!("- {}", r))
            .collect();
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Run the pipeline once with a fresh coordinator
pub async fn run_pipeline(
    requirement: &str,
    config: CoordinatorConfig,
    pool: AgentPool,
    classifier: TaskClassifier,
) -> Result<PipelineOutcome, PipelineError> {
    Coordinator::new(config, pool, classifier).run(requirement).await
}
