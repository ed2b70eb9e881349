//! # Task Classifier
//!
//! Turns a free-text requirement into the ordered set of [`TaskKind`]s
//! needed to satisfy it.
//!
//! ```text
//! requirement ─┬─ empty ──────────────────────────────→ [design]
//!              ├─ CompletionService → parse → validate ─┐
//!              └─ (offline) KeywordRules ───────────────┴→ normalize → kinds
//! ```
//!
//! Any failure on the service path is a visible [`ClassificationError`]
//! branch that degrades to `[design]`.

use std::sync::Arc;

use crate::error::ClassificationError;
use crate::skills::expert::CompletionService;
use crate::skills::prompts;

use super::catalog::TaskKind;

/// Phrases signalling that an existing material is under evaluation
const EXISTING_MATERIAL_MARKERS: &[&str] = &[
    "existing material",
    "existing catalyst",
    "given material",
    "this material",
    "current material",
    "evaluate the material",
    "已有材料",
    "现有材料",
    "给定材料",
    "该材料",
    "这种材料",
];

/// One row of the keyword rule table
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    /// Kinds implied when any keyword matches
    pub implies: &'static [TaskKind],
    /// Case-insensitive substrings
    pub keywords: &'static [&'static str],
    /// Only applies when evaluation was already implied
    pub requires_evaluation: bool,
}

/// Deterministic keyword → kind table
pub const KEYWORD_RULES: &[KeywordRule] = &[
    KeywordRule {
        implies: &[TaskKind::Evaluate, TaskKind::Finalize],
        keywords: &[
            "评估", "评价", "性能", "evaluate", "evaluation", "assess", "performance",
        ],
        requires_evaluation: false,
    },
    KeywordRule {
        implies: &[TaskKind::Mechanism],
        keywords: &["机理", "机制", "反应", "mechanism", "reaction", "pathway"],
        requires_evaluation: true,
    },
    KeywordRule {
        implies: &[TaskKind::Synthesis],
        keywords: &["合成", "制备", "工艺", "synthesis", "synthesize", "preparation", "prepare"],
        requires_evaluation: false,
    },
    KeywordRule {
        implies: &[TaskKind::OperationAdvice],
        keywords: &["操作", "运行", "应用", "operation", "operating", "application"],
        requires_evaluation: false,
    },
];

/// Apply the keyword rule table. Design is always implied.
pub fn infer_kinds(requirement: &str) -> Vec<TaskKind> {
    let text = requirement.to_lowercase();
    let mut kinds = vec![TaskKind::Design];

    for rule in KEYWORD_RULES {
        if rule.requires_evaluation && !kinds.contains(&TaskKind::Evaluate) {
            continue;
        }
        if rule.keywords.iter().any(|k| text.contains(k)) {
            for kind in rule.implies {
                push_unique(&mut kinds, *kind);
            }
        }
    }

    kinds
}

/// Whether the requirement explicitly evaluates an existing material
pub fn mentions_existing_material(requirement: &str) -> bool {
    let text = requirement.to_lowercase();
    EXISTING_MATERIAL_MARKERS.iter().any(|m| text.contains(m))
}

/// Parse a raw service answer into catalog kinds, dropping unknown names.
pub fn parse_answer(answer: &str) -> Result<Vec<TaskKind>, ClassificationError> {
    let body = strip_code_fence(answer.trim());
    let names: Vec<String> = serde_json::from_str(body)
        .or_else(|_| serde_json::from_str(&body.replace('\'', "\"")))
        .map_err(|_| ClassificationError::NotAList(preview(answer)))?;

    let mut kinds = Vec::new();
    for name in &names {
        match name.parse::<TaskKind>() {
            Ok(kind) => push_unique(&mut kinds, kind),
            Err(e) => tracing::warn!(name = %name, "Dropping classifier answer: {}", e),
        }
    }

    if kinds.is_empty() {
        return Err(ClassificationError::NoKnownKinds);
    }
    Ok(kinds)
}

/// Apply the design-insertion rules to a validated kind set
pub fn normalize(mut kinds: Vec<TaskKind>, requirement: &str) -> Vec<TaskKind> {
    if let [only] = kinds.as_slice() {
        if only.is_downstream_only() {
            return kinds;
        }
    }

    let needs_design = (kinds.contains(&TaskKind::Evaluate)
        || kinds.contains(&TaskKind::Finalize))
        && !kinds.contains(&TaskKind::Design);

    if needs_design && !mentions_existing_material(requirement) {
        kinds.insert(0, TaskKind::Design);
    }
    kinds
}

/// Requirement classifier with an optional completion service
#[derive(Clone)]
pub struct TaskClassifier {
    service: Option<Arc<dyn CompletionService>>,
}

impl TaskClassifier {
    /// Classifier backed by a completion service
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service: Some(service),
        }
    }

    /// Classifier that only uses the keyword rule table
    pub fn offline() -> Self {
        Self { service: None }
    }

    /// Classify a requirement. Never fails.
    pub async fn classify(&self, requirement: &str) -> Vec<TaskKind> {
        match self.try_classify(requirement).await {
            Ok(kinds) => kinds,
            Err(e) => {
                tracing::warn!("Classification fell back to default: {}", e);
                vec![TaskKind::DEFAULT]
            }
        }
    }

    /// Classify, exposing the failure branch
    pub async fn try_classify(
        &self,
        requirement: &str,
    ) -> Result<Vec<TaskKind>, ClassificationError> {
        if requirement.trim().is_empty() {
            return Ok(vec![TaskKind::DEFAULT]);
        }

        let kinds = match &self.service {
            Some(service) => {
                let prompt = format!("Requirement:\n{}", requirement.trim());
                let answer = service.complete(prompts::CLASSIFIER, &prompt).await?;
                tracing::debug!(answer = %preview(&answer), "Classifier answer");
                parse_answer(&answer)?
            }
            None => infer_kinds(requirement),
        };

        Ok(normalize(kinds, requirement))
    }
}

fn push_unique(kinds: &mut Vec<TaskKind>, kind: TaskKind) {
    if !kinds.contains(&kind) {
        kinds.push(kind);
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn preview(text: &str) -> String {
    text.chars().take(80).collect()
}
