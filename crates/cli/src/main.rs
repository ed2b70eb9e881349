mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use matforge_core::scoring::{ConsensusResult, ConsensusScorer, Judgment, JudgmentVector};
use matforge_core::skills::{classifier_service, create_agent_pool, EvaluationArtifact};
use matforge_core::state::RunReport;
use matforge_core::swarm::{
    Coordinator, PipelineOutcome, SwarmEvent, SwarmEventKind, TaskClassifier, WorkflowMode,
};

use config::Settings;

#[derive(Parser, Clone)]
#[command(author, version, about = "Matforge - multi-expert catalyst design pipeline")]
struct Args {
    /// Config file (defaults to .matforge/config.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Run the design pipeline for a requirement
    Run {
        /// The requirement (read from stdin when omitted)
        requirement: Vec<String>,
        #[arg(long)]
        max_rounds: Option<u32>,
        #[arg(long)]
        min_score: Option<f64>,
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Use the keyword rule table instead of the LLM classifier
        #[arg(long)]
        offline: bool,
        #[arg(long, default_value = "outputs")]
        output_dir: PathBuf,
        /// Do not write the run report
        #[arg(long)]
        no_report: bool,
    },
    /// Print the task kinds a requirement needs
    Classify {
        requirement: Vec<String>,
        #[arg(long)]
        offline: bool,
    },
    /// Score judgments stored in a JSON file
    Score {
        /// Array of five-score vectors or evaluation objects
        file: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy)]
enum ModeArg {
    Preset,
    Autonomous,
}

impl From<ModeArg> for WorkflowMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Preset => WorkflowMode::Preset,
            ModeArg::Autonomous => WorkflowMode::Autonomous,
        }
    }
}

/// One entry of a `score` input file
#[derive(Deserialize)]
#[serde(untagged)]
enum ScoreEntry {
    Vector(Vec<f64>),
    Artifact(EvaluationArtifact),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // .env may carry RUST_LOG, so load it before the subscriber
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.verbose, std::env::var("RUST_LOG").ok()))
        .with_target(false)
        .init();

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
        Err(e) => tracing::debug!("No .env loaded: {}", e),
    }

    let mut settings = Settings::load(args.config.as_deref()).await?;
    settings.apply_env(|key| std::env::var(key).ok());

    match args.command {
        CliCommand::Run {
            requirement,
            max_rounds,
            min_score,
            mode,
            offline,
            output_dir,
            no_report,
        } => {
            if let Some(n) = max_rounds {
                settings.coordinator.max_rounds = n;
            }
            if let Some(s) = min_score {
                settings.coordinator.min_acceptable_score = s;
            }
            if let Some(m) = mode {
                settings.coordinator.mode = m.into();
            }
            let requirement = requirement_text(requirement)?;
            let report_dir = (!no_report).then_some(output_dir);
            run(&requirement, settings, offline, report_dir.as_deref()).await
        }
        CliCommand::Classify {
            requirement,
            offline,
        } => {
            let requirement = requirement_text(requirement)?;
            let classifier = build_classifier(&settings, offline)?;
            let kinds = classifier.classify(&requirement).await;
            let names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
            println!("{}", serde_json::to_string(&names)?);
            Ok(())
        }
        CliCommand::Score { file } => score_file(&file, &settings).await,
    }
}

/// `RUST_LOG` when it parses, else info (debug with `--verbose`)
fn log_filter(verbose: bool, rust_log: Option<String>) -> EnvFilter {
    let default_level = if verbose { "debug" } else { "info" };
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level))
}

/// Join positional words, or read stdin when there are none
fn requirement_text(words: Vec<String>) -> Result<String> {
    let joined = words.join(" ");
    if !joined.trim().is_empty() {
        return Ok(joined.trim().to_string());
    }

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read requirement from stdin")?;
    let input = input.trim();
    if input.is_empty() {
        bail!("No requirement given");
    }
    Ok(input.to_string())
}

fn build_classifier(settings: &Settings, offline: bool) -> Result<TaskClassifier> {
    if offline {
        return Ok(TaskClassifier::offline());
    }
    let service = classifier_service(&settings.models)
        .context("Failed to create classifier client (use --offline to skip it)")?;
    Ok(TaskClassifier::new(service))
}

async fn run(
    requirement: &str,
    settings: Settings,
    offline: bool,
    report_dir: Option<&Path>,
) -> Result<()> {
    let pool = create_agent_pool(&settings.models).context("Failed to create agent pool")?;
    let classifier = build_classifier(&settings, offline)?;

    let (tx, mut rx) = mpsc::channel::<SwarmEvent>(64);
    let progress = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_progress(&event);
        }
    });

    let coordinator = Coordinator::new(settings.coordinator, pool, classifier).with_event_channel(tx);
    let result = coordinator.run(requirement).await;
    drop(coordinator);
    let _ = progress.await;

    let outcome = result?;
    print_outcome(&outcome);

    if let Some(dir) = report_dir {
        let path = RunReport::new(requirement, outcome).save(dir).await?;
        println!("Report: {}", path.display());
    }
    Ok(())
}

fn print_progress(event: &SwarmEvent) {
    let agent = &event.agent;
    match event.kind {
        SwarmEventKind::NodeStarted => println!("  > {}", agent),
        SwarmEventKind::NodeCompleted => println!("  ok {}", agent),
        SwarmEventKind::NodeFailed => println!("  failed {}", agent),
        SwarmEventKind::NodeSkipped => println!("  skipped {}", agent),
        SwarmEventKind::RoundScored | SwarmEventKind::RoundRejected => {
            if let Some(data) = &event.data {
                println!("  {:?}: {}", event.kind, data);
            }
        }
        _ => {}
    }
}

fn print_outcome(outcome: &PipelineOutcome) {
    let kinds: Vec<&str> = outcome.kinds.iter().map(|k| k.as_str()).collect();
    println!();
    println!("Task kinds: {}", kinds.join(", "));
    println!(
        "Rounds: {}  Termination: {:?}  Resolved: {}",
        outcome.round_count, outcome.termination, outcome.resolved
    );
    if outcome.incomplete {
        println!("Warning: the last round did not complete every node");
    }
    if let Some(error) = &outcome.scoring_error {
        println!("Scoring failed: {}", error);
    }
    if let Some(consensus) = &outcome.consensus {
        print_consensus(consensus);
    }
    if let Some(artifact) = &outcome.final_artifact {
        println!();
        println!("{}", artifact);
    }
}

fn print_consensus(consensus: &ConsensusResult) {
    println!(
        "Aggregate: {:.2} ({}) from {} judgment(s)",
        consensus.aggregate, consensus.rank, consensus.judgments
    );
    for c in &consensus.criteria {
        println!(
            "  {:<28} mean {:>5.2}  sd {:>4.2}  agreement {:?}",
            c.criterion.to_string(),
            c.mean,
            c.std_dev,
            c.agreement
        );
    }
}

async fn score_file(path: &Path, settings: &Settings) -> Result<()> {
    settings.coordinator.validate()?;
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let entries: Vec<ScoreEntry> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of judgments", path.display()))?;

    let judgments: Vec<Judgment> = entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| match entry {
            ScoreEntry::Vector(v) => Judgment::bare(format!("judge_{}", i + 1), JudgmentVector(v)),
            ScoreEntry::Artifact(a) => a.into_judgment(&format!("judge_{}", i + 1)),
        })
        .collect();

    let scorer = ConsensusScorer::new(settings.coordinator.weights, settings.coordinator.agreement);
    let consensus = scorer.score(&judgments)?;
    print_consensus(&consensus);
    println!(
        "Accepted at {:.1}: {}",
        settings.coordinator.min_acceptable_score,
        consensus.rank.is_acceptable()
            && consensus.aggregate >= settings.coordinator.min_acceptable_score
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_from_dotenv_file() {
        let dir = std::env::temp_dir().join(format!("matforge-dotenv-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(".env");
        std::fs::write(&path, "LLM_PROVIDER=qwen\nRUST_LOG=warn\n").unwrap();

        let rust_log = dotenvy::from_path_iter(&path)
            .unwrap()
            .filter_map(|item| item.ok())
            .find(|(key, _)| key == "RUST_LOG")
            .map(|(_, value)| value);

        assert_eq!(log_filter(false, rust_log).to_string(), "warn");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_log_filter_defaults() {
        assert_eq!(log_filter(false, None).to_string(), "info");
        assert_eq!(log_filter(true, None).to_string(), "debug");
    }
}
