//! Default prompt templates bundled at compile time.

use super::artifact_registry::EvaluationArtifact;

/// Classifier - routes a requirement to task kinds
pub const CLASSIFIER: &str = include_str!("defaults/classifier.md");

/// Designer - proposes a candidate material
pub const DESIGNER: &str = include_str!("defaults/designer.md");

/// Evaluator - scores a candidate on five criteria (`{focus}`, `{schema}` placeholders)
pub const EVALUATOR: &str = include_str!("defaults/evaluator.md");

/// Final Validator - merges panel evaluations into a report
pub const FINAL_VALIDATOR: &str = include_str!("defaults/final_validator.md");

/// Mechanism - reaction mechanism and kinetics
pub const MECHANISM: &str = include_str!("defaults/mechanism.md");

/// Synthesis - preparation route
pub const SYNTHESIS: &str = include_str!("defaults/synthesis.md");

/// Operation - operating recommendations
pub const OPERATION: &str = include_str!("defaults/operation.md");

/// Evaluator prompt with its reviewing focus and the artifact schema filled in
pub fn evaluator_prompt(focus: &str) -> String {
    EVALUATOR
        .replace("{focus}", focus)
        .replace("{schema}", &EvaluationArtifact::schema_json())
}

/// All default prompts with their slugs
pub fn all_defaults() -> Vec<(&'static str, &'static str)> {
    vec![
        ("classifier", CLASSIFIER),
        ("designer", DESIGNER),
        ("evaluator", EVALUATOR),
        ("final_validator", FINAL_VALIDATOR),
        ("mechanism", MECHANISM),
        ("synthesis", SYNTHESIS),
        ("operation", OPERATION),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_prompts_non_empty() {
        for (slug, content) in all_defaults() {
            assert!(!content.is_empty(), "Prompt '{}' should not be empty", slug);
            assert!(content.len() > 50, "Prompt '{}' seems too short", slug);
        }
    }

    #[test]
    fn test_evaluator_placeholders_filled() {
        let prompt = evaluator_prompt("Focus on cost.");
        assert!(prompt.contains("Focus on cost."));
        assert!(prompt.contains("\"scores\""));
        assert!(!prompt.contains("{focus}"));
        assert!(!prompt.contains("{schema}"));
    }

    #[test]
    fn test_classifier_lists_every_kind() {
        for kind in crate::swarm::catalog::TaskKind::ALL {
            assert!(
                CLASSIFIER.contains(&format!("\"{}\"", kind)),
                "classifier prompt should mention {}",
                kind
            );
        }
    }
}
