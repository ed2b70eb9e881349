//! # Swarm Events
//!
//! Chronological record of a pipeline run, optionally streamed over a
//! channel while the run is in progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Kind of swarm event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SwarmEventKind {
    /// Pipeline started
    PipelineStarted,
    /// Classifier produced the kind set
    ClassificationCompleted,
    /// Classifier fell back to the default kind
    ClassificationFellBack,
    /// A round's plan was built
    PlanBuilt,
    /// Expert started working on a node
    NodeStarted,
    /// Node produced an artifact
    NodeCompleted,
    /// Expert invocation failed
    NodeFailed,
    /// Node skipped because an upstream node did not complete
    NodeSkipped,
    /// Consensus computed for a round
    RoundScored,
    /// Round rejected, redesigning with feedback
    RoundRejected,
    /// Judgments of a round could not be merged
    ScoringFailed,
    /// Pipeline reached a terminal state
    PipelineCompleted,
}

/// An event in the swarm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmEvent {
    /// Unique event ID
    pub id: String,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Kind of event
    pub kind: SwarmEventKind,
    /// Agent (or component) that produced this event
    pub agent: String,
    /// Associated data (JSON)
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    /// Round the event belongs to
    #[serde(default)]
    pub round: Option<u32>,
}

impl SwarmEvent {
    /// Create a new event
    pub fn new(kind: SwarmEventKind, agent: &str) -> Self {
        Self {
            id: uuid_v4(),
            timestamp: Utc::now(),
            kind,
            agent: agent.to_string(),
            data: None,
            round: None,
        }
    }

    /// Add data to the event
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Tag the event with its round
    pub fn in_round(mut self, round: u32) -> Self {
        self.round = Some(round);
        self
    }
}

/// Collects events and forwards them to an optional listener
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<SwarmEvent>,
    tx: Option<mpsc::Sender<SwarmEvent>>,
}

impl EventLog {
    pub fn new(tx: Option<mpsc::Sender<SwarmEvent>>) -> Self {
        Self {
            events: Vec::new(),
            tx,
        }
    }

    /// Record an event. A closed listener is ignored.
    pub async fn emit(&mut self, event: SwarmEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event.clone()).await;
        }
        self.events.push(event);
    }

    pub fn events(&self) -> &[SwarmEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<SwarmEvent> {
        self.events
    }
}

/// Generate a simple UUID v4
fn uuid_v4() -> String {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_nanos();
    format!("{:x}-{:x}", nanos, rand_u32())
}

/// Simple random number (not cryptographic)
fn rand_u32() -> u32 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};
    RandomState::new().build_hasher().finish() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = SwarmEvent::new(SwarmEventKind::NodeStarted, "designer").in_round(2);

        assert_eq!(event.agent, "designer");
        assert_eq!(event.round, Some(2));
        assert!(event.data.is_none());
    }

    #[tokio::test]
    async fn test_event_log_forwards_to_listener() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut log = EventLog::new(Some(tx));

        log.emit(SwarmEvent::new(SwarmEventKind::PipelineStarted, "coordinator"))
            .await;

        assert_eq!(log.events().len(), 1);
        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, SwarmEventKind::PipelineStarted);
    }

    #[tokio::test]
    async fn test_event_log_ignores_closed_listener() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut log = EventLog::new(Some(tx));

        log.emit(SwarmEvent::new(SwarmEventKind::PlanBuilt, "planner"))
            .await;
        assert_eq!(log.into_events().len(), 1);
    }
}
