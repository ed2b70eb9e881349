//! # Iteration Stages
//!
//! The per-run state machine owned by the coordinator.
//!
//! ```text
//! Draft → Scored → Accepted ────────────→ Terminal
//!                └ NeedsRevision → Redesign → Draft
//!                                └──────────→ Terminal
//! ```

use serde::{Deserialize, Serialize};

/// Stage of the iteration loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Experts are producing this round's artifacts
    Draft,
    /// Consensus computed for the round
    Scored,
    /// Round met the acceptance predicate
    Accepted,
    /// Round was rejected
    NeedsRevision,
    /// Feedback folded into the next requirement
    Redesign,
    /// No further rounds
    Terminal,
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Consensus met the acceptance predicate
    Accepted,
    /// Rejected with no usable feedback
    NotImprovable,
    /// Round budget used up
    Exhausted,
    /// Nothing to score; every node completed
    Unscored,
    /// Evaluation was planned but produced no judgment
    Incomplete,
    /// Judgments could not be merged
    ScoringFailed,
}

impl Termination {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Termination::Accepted | Termination::Unscored)
    }
}

/// What the controller decided after a scored round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundDecision {
    Stop(Termination),
    /// Run another round with this requirement
    Redesign { requirement: String },
}

/// Heading placed between the original requirement and the feedback
pub const FEEDBACK_HEADING: &str = "Improvement suggestions from previous rounds:";

/// Iteration state: round counter, feedback, stage
#[derive(Debug, Clone)]
pub struct IterationState {
    /// Current stage
    pub stage: PipelineStage,
    /// 0-based round index
    pub round: u32,
    /// Maximum number of rounds
    pub max_rounds: u32,
    /// Feedback accumulated over all rejected rounds
    pub feedback: Vec<String>,
    /// How the loop ended, once terminal
    pub termination: Option<Termination>,
    original: String,
}

impl IterationState {
    pub fn new(requirement: &str, max_rounds: u32) -> Self {
        Self {
            stage: PipelineStage::Draft,
            round: 0,
            max_rounds,
            feedback: Vec::new(),
            termination: None,
            original: requirement.to_string(),
        }
    }

    /// Requirement text for the current round
    pub fn requirement(&self) -> String {
        if self.feedback.is_empty() {
            return self.original.clone();
        }
        format!(
            "{}\n\n{}\n{}",
            self.original,
            FEEDBACK_HEADING,
            self.feedback.join("\n")
        )
    }

    /// Draft → Scored
    pub fn scored(&mut self) {
        if self.stage == PipelineStage::Draft {
            self.stage = PipelineStage::Scored;
        }
    }

    /// Decide the next step after scoring.
    ///
    /// `feedback` is only consulted when the round was not accepted.
    pub fn decide(&mut self, accepted: bool, feedback: Option<String>) -> RoundDecision {
        if accepted {
            self.stage = PipelineStage::Accepted;
            return self.stop(Termination::Accepted);
        }

        self.stage = PipelineStage::NeedsRevision;
        let Some(feedback) = feedback.filter(|f| !f.trim().is_empty()) else {
            return self.stop(Termination::NotImprovable);
        };
        if self.round + 1 >= self.max_rounds {
            return self.stop(Termination::Exhausted);
        }

        self.stage = PipelineStage::Redesign;
        self.feedback.push(feedback.trim().to_string());
        self.round += 1;
        self.stage = PipelineStage::Draft;
        RoundDecision::Redesign {
            requirement: self.requirement(),
        }
    }

    /// End the loop without scoring
    pub fn stop(&mut self, termination: Termination) -> RoundDecision {
        self.stage = PipelineStage::Terminal;
        self.termination = Some(termination);
        RoundDecision::Stop(termination)
    }

    pub fn is_terminal(&self) -> bool {
        self.stage == PipelineStage::Terminal
    }

    pub fn is_accepted(&self) -> bool {
        self.termination == Some(Termination::Accepted)
    }

    /// Rounds executed so far
    pub fn round_count(&self) -> u32 {
        self.round + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_first_round() {
        let mut state = IterationState::new("req", 3);
        state.scored();
        assert_eq!(state.stage, PipelineStage::Scored);

        assert_eq!(
            state.decide(true, None),
            RoundDecision::Stop(Termination::Accepted)
        );
        assert!(state.is_terminal());
        assert!(state.is_accepted());
        assert_eq!(state.round_count(), 1);
    }

    #[test]
    fn test_rejection_loop_until_exhausted() {
        let mut state = IterationState::new("req", 3);

        // First rejection - redesign
        state.scored();
        let decision = state.decide(false, Some("raise activity".into()));
        assert_eq!(
            decision,
            RoundDecision::Redesign {
                requirement: format!("req\n\n{}\nraise activity", FEEDBACK_HEADING)
            }
        );
        assert_eq!(state.stage, PipelineStage::Draft);
        assert_eq!(state.round, 1);

        // Second rejection - feedback accumulates
        state.scored();
        let decision = state.decide(false, Some("cut cost".into()));
        assert_eq!(
            decision,
            RoundDecision::Redesign {
                requirement: format!("req\n\n{}\nraise activity\ncut cost", FEEDBACK_HEADING)
            }
        );

        // Third rejection - exhausted
        state.scored();
        assert_eq!(
            state.decide(false, Some("still low".into())),
            RoundDecision::Stop(Termination::Exhausted)
        );
        assert!(state.is_terminal());
        assert_eq!(state.round_count(), 3);
        assert!(!Termination::Exhausted.is_resolved());
    }

    #[test]
    fn test_empty_feedback_is_not_improvable() {
        let mut state = IterationState::new("req", 3);
        state.scored();
        assert_eq!(
            state.decide(false, Some("   ".into())),
            RoundDecision::Stop(Termination::NotImprovable)
        );
        assert_eq!(state.round_count(), 1);
        assert_eq!(state.requirement(), "req");
    }

    #[test]
    fn test_missing_feedback_on_last_round_is_not_improvable() {
        let mut state = IterationState::new("req", 2);
        state.scored();
        state.decide(false, Some("raise activity".into()));

        state.scored();
        assert_eq!(
            state.decide(false, None),
            RoundDecision::Stop(Termination::NotImprovable)
        );
        assert_eq!(state.round_count(), 2);
        assert!(!Termination::ScoringFailed.is_resolved());
    }

    #[test]
    fn test_single_round_budget() {
        let mut state = IterationState::new("req", 1);
        state.scored();
        assert_eq!(
            state.decide(false, Some("more".into())),
            RoundDecision::Stop(Termination::Exhausted)
        );
    }
}
