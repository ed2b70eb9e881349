//! # Consensus Scorer
//!
//! Merges independent five-criterion judgments into one weighted aggregate,
//! a per-criterion agreement measure and a categorical [`Rank`].
//!
//! Inputs are validated, never repaired: a judgment with the wrong number of
//! criteria or a value outside `[1, 10]` is an [`AggregationError`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AggregationError, ConfigError};

/// Number of scored criteria
pub const CRITERIA: usize = 5;

/// Lowest and highest admissible score
pub const SCORE_RANGE: (f64, f64) = (1.0, 10.0);

/// Variance below this is treated as exact agreement
const VARIANCE_NOISE: f64 = 1e-12;

/// Scored criteria, in judgment-vector order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Catalytic / primary performance
    Performance,
    Economic,
    Environmental,
    Technical,
    Structural,
}

impl Criterion {
    pub const ALL: [Criterion; CRITERIA] = [
        Criterion::Performance,
        Criterion::Economic,
        Criterion::Environmental,
        Criterion::Technical,
        Criterion::Structural,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Criterion::Performance => "catalytic performance",
            Criterion::Economic => "economic feasibility",
            Criterion::Environmental => "environmental friendliness",
            Criterion::Technical => "technical feasibility",
            Criterion::Structural => "structural soundness",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Weight of each criterion in the aggregate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriterionWeights {
    pub performance: f64,
    pub economic: f64,
    pub environmental: f64,
    pub technical: f64,
    pub structural: f64,
}

impl Default for CriterionWeights {
    fn default() -> Self {
        Self {
            performance: 0.5,
            economic: 0.1,
            environmental: 0.1,
            technical: 0.1,
            structural: 0.2,
        }
    }
}

impl CriterionWeights {
    pub fn as_array(&self) -> [f64; CRITERIA] {
        [
            self.performance,
            self.economic,
            self.environmental,
            self.technical,
            self.structural,
        ]
    }

    /// Weights must be non-negative and sum to one
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = self.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::NegativeWeight);
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ConfigError::WeightSum(sum));
        }
        Ok(())
    }
}

/// Standard-deviation cut-offs for the agreement level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgreementThresholds {
    /// SD at or below this is high agreement
    pub high_max_sd: f64,
    /// SD at or below this is medium agreement
    pub medium_max_sd: f64,
}

impl Default for AgreementThresholds {
    fn default() -> Self {
        Self {
            high_max_sd: 1.0,
            medium_max_sd: 2.0,
        }
    }
}

impl AgreementThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = self.high_max_sd >= 0.0 && self.high_max_sd <= self.medium_max_sd;
        if !ordered {
            return Err(ConfigError::Thresholds {
                high: self.high_max_sd,
                medium: self.medium_max_sd,
            });
        }
        Ok(())
    }

    pub fn level(&self, std_dev: f64) -> AgreementLevel {
        if std_dev <= self.high_max_sd {
            AgreementLevel::High
        } else if std_dev <= self.medium_max_sd {
            AgreementLevel::Medium
        } else {
            AgreementLevel::Low
        }
    }
}

/// Categorical agreement between judges on one criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementLevel {
    High,
    Medium,
    Low,
}

/// Categorical rank of a consensus
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Invalid,
    Poor,
    Average,
    Good,
    Excellent,
}

impl Rank {
    /// Classify from the aggregate and the per-criterion means (first match wins)
    pub fn classify(aggregate: f64, means: &[f64]) -> Rank {
        let all_at_least = |floor: f64| means.iter().all(|m| *m >= floor);

        if means.iter().any(|m| *m <= SCORE_RANGE.0) || aggregate < 2.0 {
            Rank::Invalid
        } else if aggregate < 4.0 {
            Rank::Poor
        } else if aggregate < 6.0 {
            Rank::Average
        } else if aggregate >= 8.0 && all_at_least(8.0) {
            Rank::Excellent
        } else if all_at_least(6.0) {
            Rank::Good
        } else {
            Rank::Average
        }
    }

    /// Poor and Invalid can never be accepted
    pub fn is_acceptable(&self) -> bool {
        !matches!(self, Rank::Poor | Rank::Invalid)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rank::Invalid => "invalid",
            Rank::Poor => "poor",
            Rank::Average => "average",
            Rank::Good => "good",
            Rank::Excellent => "excellent",
        };
        f.write_str(s)
    }
}

/// Raw criterion scores from one judge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JudgmentVector(pub Vec<f64>);

impl From<Vec<f64>> for JudgmentVector {
    fn from(scores: Vec<f64>) -> Self {
        Self(scores)
    }
}

impl<const N: usize> From<[f64; N]> for JudgmentVector {
    fn from(scores: [f64; N]) -> Self {
        Self(scores.to_vec())
    }
}

/// A judgment plus the judge's free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    pub evaluator: String,
    pub vector: JudgmentVector,
    /// Per-criterion comments, aligned with [`Criterion::ALL`]
    #[serde(default)]
    pub comments: Vec<String>,
    #[serde(default)]
    pub recommendations: Option<String>,
}

impl Judgment {
    pub fn bare(evaluator: impl Into<String>, vector: JudgmentVector) -> Self {
        Self {
            evaluator: evaluator.into(),
            vector,
            comments: Vec::new(),
            recommendations: None,
        }
    }
}

/// Merged statistics for one criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionSummary {
    pub criterion: Criterion,
    pub mean: f64,
    pub std_dev: f64,
    /// `1 - SD / mean`, or 0 when the mean is 0
    pub consistency: f64,
    pub agreement: AgreementLevel,
    /// Judges' comments on this criterion
    pub rationale: Vec<String>,
}

/// Outcome of merging all judgments of a round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub criteria: Vec<CriterionSummary>,
    /// Weighted aggregate of the means, two decimals
    pub aggregate: f64,
    pub rank: Rank,
    /// Number of judgments merged
    pub judgments: usize,
    pub recommendations: Vec<String>,
}

impl ConsensusResult {
    pub fn means(&self) -> Vec<f64> {
        self.criteria.iter().map(|c| c.mean).collect()
    }

    pub fn consistency(&self) -> Vec<f64> {
        self.criteria.iter().map(|c| c.consistency).collect()
    }

    /// Criteria whose mean falls below `threshold`
    pub fn flagged_below(&self, threshold: f64) -> Vec<&CriterionSummary> {
        self.criteria.iter().filter(|c| c.mean < threshold).collect()
    }
}

/// Weighted consensus over judgment vectors
#[derive(Debug, Clone, Default)]
pub struct ConsensusScorer {
    weights: CriterionWeights,
    thresholds: AgreementThresholds,
}

impl ConsensusScorer {
    pub fn new(weights: CriterionWeights, thresholds: AgreementThresholds) -> Self {
        Self {
            weights,
            thresholds,
        }
    }

    /// Score bare vectors with no rationale
    pub fn score_vectors(&self, vectors: &[JudgmentVector]) -> Result<ConsensusResult, AggregationError> {
        let judgments: Vec<Judgment> = vectors
            .iter()
            .enumerate()
            .map(|(i, v)| Judgment::bare(format!("judge{}", i + 1), v.clone()))
            .collect();
        self.score(&judgments)
    }

    pub fn score(&self, judgments: &[Judgment]) -> Result<ConsensusResult, AggregationError> {
        validate(judgments)?;

        let n = judgments.len() as f64;
        let weights = self.weights.as_array();
        let mut criteria = Vec::with_capacity(CRITERIA);

        for (idx, criterion) in Criterion::ALL.into_iter().enumerate() {
            let values: Vec<f64> = judgments.iter().map(|j| j.vector.0[idx]).collect();
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std_dev = if variance < VARIANCE_NOISE {
                0.0
            } else {
                variance.sqrt()
            };
            let consistency = if mean > 0.0 { 1.0 - std_dev / mean } else { 0.0 };

            let rationale = judgments
                .iter()
                .filter_map(|j| j.comments.get(idx))
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();

            criteria.push(CriterionSummary {
                criterion,
                mean,
                std_dev,
                consistency,
                agreement: self.thresholds.level(std_dev),
                rationale,
            });
        }

        let weighted: f64 = criteria
            .iter()
            .zip(weights)
            .map(|(c, w)| c.mean * w)
            .sum();
        let aggregate = round2(weighted);
        let means: Vec<f64> = criteria.iter().map(|c| c.mean).collect();
        let rank = Rank::classify(aggregate, &means);

        let recommendations = judgments
            .iter()
            .filter_map(|j| j.recommendations.as_deref())
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();

        tracing::debug!(aggregate, rank = %rank, judgments = judgments.len(), "Consensus computed");

        Ok(ConsensusResult {
            criteria,
            aggregate,
            rank,
            judgments: judgments.len(),
            recommendations,
        })
    }
}

fn validate(judgments: &[Judgment]) -> Result<(), AggregationError> {
    if judgments.is_empty() {
        return Err(AggregationError::NoJudgments);
    }
    for (index, judgment) in judgments.iter().enumerate() {
        let scores = &judgment.vector.0;
        if scores.len() != CRITERIA {
            return Err(AggregationError::WrongLength {
                index,
                len: scores.len(),
            });
        }
        let (lo, hi) = SCORE_RANGE;
        if let Some((criterion, value)) = scores
            .iter()
            .enumerate()
            .find(|(_, v)| !(lo..=hi).contains(*v))
        {
            return Err(AggregationError::OutOfRange {
                index,
                criterion,
                value: *value,
            });
        }
    }
    Ok(())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn scorer() -> ConsensusScorer {
        ConsensusScorer::default()
    }

    #[test]
    fn test_single_judgment_aggregate() {
        let result = scorer()
            .score_vectors(&[JudgmentVector::from([8.0, 7.0, 9.0, 7.0, 8.0])])
            .unwrap();

        assert_eq!(result.aggregate, 7.9);
        assert_eq!(result.rank, Rank::Good);
        // one judge: no spread
        assert!(result.consistency().iter().all(|c| *c == 1.0));
    }

    #[test]
    fn test_floor_rule_beats_aggregate() {
        let result = scorer()
            .score_vectors(&[JudgmentVector::from([1.0, 10.0, 10.0, 10.0, 10.0])])
            .unwrap();

        assert_eq!(result.aggregate, 5.5);
        assert_eq!(result.rank, Rank::Invalid);
    }

    #[test]
    fn test_identical_judgments_fully_consistent() {
        let v = JudgmentVector::from([7.3, 6.1, 8.7, 5.9, 9.2]);
        let result = scorer()
            .score_vectors(&[v.clone(), v.clone(), v])
            .unwrap();

        for c in &result.criteria {
            assert_eq!(c.std_dev, 0.0);
            assert_eq!(c.consistency, 1.0);
            assert_eq!(c.agreement, AgreementLevel::High);
        }
    }

    #[test]
    fn test_mean_and_population_sd() {
        let result = scorer()
            .score_vectors(&[
                JudgmentVector::from([6.0, 5.0, 5.0, 5.0, 4.0]),
                JudgmentVector::from([8.0, 5.0, 5.0, 5.0, 8.0]),
            ])
            .unwrap();

        let perf = &result.criteria[0];
        assert_eq!(perf.mean, 7.0);
        assert_eq!(perf.std_dev, 1.0);
        assert!((perf.consistency - (1.0 - 1.0 / 7.0)).abs() < 1e-12);
        assert_eq!(perf.agreement, AgreementLevel::High);

        let structural = &result.criteria[4];
        assert_eq!(structural.mean, 6.0);
        assert_eq!(structural.std_dev, 2.0);
        assert_eq!(structural.agreement, AgreementLevel::Medium);

        // 0.5*7 + 0.1*5*3 + 0.2*6
        assert_eq!(result.aggregate, 6.2);
        assert_eq!(result.rank, Rank::Average);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let four = scorer().score_vectors(&[JudgmentVector::from([5.0, 5.0, 5.0, 5.0])]);
        assert_eq!(
            assert_err!(four),
            AggregationError::WrongLength { index: 0, len: 4 }
        );

        let six = scorer().score_vectors(&[
            JudgmentVector::from([5.0; 5]),
            JudgmentVector::from([5.0; 6]),
        ]);
        assert_eq!(
            assert_err!(six),
            AggregationError::WrongLength { index: 1, len: 6 }
        );
    }

    #[test]
    fn test_out_of_range_not_clamped() {
        let err = scorer()
            .score_vectors(&[JudgmentVector::from([5.0, 5.0, 11.0, 5.0, 5.0])])
            .unwrap_err();
        assert_eq!(
            err,
            AggregationError::OutOfRange {
                index: 0,
                criterion: 2,
                value: 11.0
            }
        );

        assert_err!(scorer().score_vectors(&[JudgmentVector::from([0.5, 5.0, 5.0, 5.0, 5.0])]));
        assert_err!(scorer().score_vectors(&[JudgmentVector::from([f64::NAN, 5.0, 5.0, 5.0, 5.0])]));
    }

    #[test]
    fn test_no_judgments() {
        assert_eq!(scorer().score(&[]).unwrap_err(), AggregationError::NoJudgments);
    }

    #[test]
    fn test_rank_bands() {
        assert_eq!(Rank::classify(1.9, &[2.0; 5]), Rank::Invalid);
        assert_eq!(Rank::classify(3.99, &[3.0; 5]), Rank::Poor);
        assert_eq!(Rank::classify(5.0, &[5.0; 5]), Rank::Average);
        assert_eq!(Rank::classify(7.0, &[7.0; 5]), Rank::Good);
        assert_eq!(Rank::classify(9.0, &[9.0; 5]), Rank::Excellent);
        // high aggregate, one criterion below 8 but above 6
        assert_eq!(Rank::classify(8.5, &[10.0, 7.0, 8.0, 8.0, 8.0]), Rank::Good);
        // good aggregate, one criterion below 6
        assert_eq!(Rank::classify(7.0, &[9.0, 5.0, 5.0, 5.0, 7.0]), Rank::Average);
        assert_eq!(Rank::classify(8.2, &[10.0, 4.0, 9.0, 9.0, 6.0]), Rank::Average);
    }

    #[test]
    fn test_aggregate_stays_in_score_range() {
        let weights = [
            CriterionWeights::default(),
            CriterionWeights {
                performance: 0.2,
                economic: 0.2,
                environmental: 0.2,
                technical: 0.2,
                structural: 0.2,
            },
            CriterionWeights {
                performance: 1.0,
                economic: 0.0,
                environmental: 0.0,
                technical: 0.0,
                structural: 0.0,
            },
        ];
        let vectors = [[1.0; 5], [10.0; 5], [1.0, 10.0, 3.5, 9.0, 2.0]];

        for w in weights {
            assert_ok!(w.validate());
            let scorer = ConsensusScorer::new(w, AgreementThresholds::default());
            for v in vectors {
                let result = scorer.score_vectors(&[JudgmentVector::from(v)]).unwrap();
                assert!((1.0..=10.0).contains(&result.aggregate));
            }
        }
    }

    #[test]
    fn test_weight_validation() {
        let mut w = CriterionWeights::default();
        w.structural = 0.3;
        assert!(matches!(w.validate(), Err(ConfigError::WeightSum(_))));

        w.structural = 0.2;
        w.economic = -0.1;
        assert_eq!(w.validate(), Err(ConfigError::NegativeWeight));
    }

    #[test]
    fn test_rationale_and_recommendations_collected() {
        let judgments = vec![
            Judgment {
                evaluator: "A".into(),
                vector: JudgmentVector::from([6.0, 8.0, 8.0, 8.0, 8.0]),
                comments: vec!["low quantum yield".into(), "".into()],
                recommendations: Some("dope with N".into()),
            },
            Judgment {
                evaluator: "B".into(),
                vector: JudgmentVector::from([5.0, 8.0, 8.0, 8.0, 8.0]),
                comments: vec!["fast recombination".into()],
                recommendations: None,
            },
        ];
        let result = scorer().score(&judgments).unwrap();

        assert_eq!(
            result.criteria[0].rationale,
            vec!["low quantum yield", "fast recombination"]
        );
        assert!(result.criteria[1].rationale.is_empty());
        assert_eq!(result.recommendations, vec!["dope with N"]);
        let flagged: Vec<_> = result
            .flagged_below(7.0)
            .iter()
            .map(|c| c.criterion)
            .collect();
        assert_eq!(flagged, vec![Criterion::Performance]);
    }
}
