//! # Artifact Registry
//!
//! Structured artifact types exchanged between experts. Evaluators embed an
//! [`EvaluationArtifact`] as JSON somewhere in their free-text answer.

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::OnceLock;

use crate::error::AggregationError;
use crate::scoring::consensus::{Judgment, JudgmentVector};

/// One evaluator's judgment of a candidate material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EvaluationArtifact {
    /// Evaluator identity (A, B, C, ...)
    #[serde(default)]
    pub evaluator: Option<String>,
    /// Five scores in [1, 10]: catalytic performance, economic feasibility,
    /// environmental friendliness, technical feasibility, structural soundness
    pub scores: Vec<f64>,
    /// One comment per score, same order
    #[serde(default)]
    pub comments: Vec<String>,
    #[serde(default, deserialize_with = "text_or_list")]
    #[schemars(with = "Option<String>")]
    pub pros: Option<String>,
    #[serde(default, deserialize_with = "text_or_list")]
    #[schemars(with = "Option<String>")]
    pub cons: Option<String>,
    /// Concrete changes that would raise the scores
    #[serde(default, deserialize_with = "text_or_list")]
    #[schemars(with = "Option<String>")]
    pub recommendations: Option<String>,
}

/// Older evaluators wrap results in an envelope
#[derive(Debug, Deserialize)]
struct ResultsEnvelope {
    #[serde(default)]
    evaluator: Option<String>,
    results: Vec<EvaluationArtifact>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrList {
    Text(String),
    List(Vec<String>),
}

fn text_or_list<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<TextOrList> = Option::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        TextOrList::Text(s) => s,
        TextOrList::List(items) => items.join("; "),
    }))
}

/// Start of a JSON object with at least one key
fn object_start() -> Option<&'static Regex> {
    static OBJECT_START: OnceLock<Option<Regex>> = OnceLock::new();
    OBJECT_START
        .get_or_init(|| Regex::new(r#"\{\s*""#).ok())
        .as_ref()
}

impl EvaluationArtifact {
    /// Locate and decode the artifact inside free text.
    ///
    /// Each candidate object start is decoded as one complete JSON value, so
    /// text before or after the object (braces included) is ignored.
    pub fn extract(text: &str) -> Result<Self, String> {
        let locator = object_start().ok_or_else(|| "JSON locator unavailable".to_string())?;
        let mut last_error = None;

        for candidate in locator.find_iter(text) {
            let mut values = serde_json::Deserializer::from_str(&text[candidate.start()..])
                .into_iter::<serde_json::Value>();
            let Some(Ok(value)) = values.next() else {
                continue;
            };
            match Self::from_value(value) {
                Ok(artifact) => return Ok(artifact),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| "no JSON object found".to_string()))
    }

    fn from_value(value: serde_json::Value) -> Result<Self, String> {
        if let Ok(artifact) = serde_json::from_value::<EvaluationArtifact>(value.clone()) {
            return Ok(artifact);
        }

        let envelope: ResultsEnvelope = serde_json::from_value(value)
            .map_err(|e| format!("invalid evaluation JSON: {}", e))?;
        let mut artifact = envelope
            .results
            .into_iter()
            .next()
            .ok_or_else(|| "evaluation has no results".to_string())?;
        if artifact.evaluator.is_none() {
            artifact.evaluator = envelope.evaluator;
        }
        Ok(artifact)
    }

    /// JSON schema embedded in evaluator prompts
    pub fn schema_json() -> String {
        let schema = schemars::schema_for!(EvaluationArtifact);
        serde_json::to_string_pretty(&schema).unwrap_or_default()
    }

    pub fn into_judgment(self, fallback_name: &str) -> Judgment {
        let mut recommendations = self.recommendations;
        if let Some(cons) = self.cons.filter(|c| !c.trim().is_empty()) {
            recommendations = Some(match recommendations {
                Some(r) => format!("{} (weaknesses: {})", r, cons),
                None => format!("Address weaknesses: {}", cons),
            });
        }

        Judgment {
            evaluator: self.evaluator.unwrap_or_else(|| fallback_name.to_string()),
            vector: JudgmentVector(self.scores),
            comments: self.comments,
            recommendations,
        }
    }
}

/// Parse an evaluate node's artifact into a judgment
pub fn parse_judgment(source_node: &str, text: &str) -> Result<Judgment, AggregationError> {
    EvaluationArtifact::extract(text)
        .map(|artifact| artifact.into_judgment(source_node))
        .map_err(|reason| AggregationError::Unparseable {
            source_node: source_node.to_string(),
            reason,
        })
}
