// events.rs — Workflow audit events and their sinks.
//
// One event per successful step/action transition, emitted by the engine
// after the transition has committed — never from inside outcome
// recursion, so a sink failure cannot be mistaken for a routing failure.
// Sink errors are logged and dropped.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

/// Where in the workflow a transition starts or ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransitionPoint {
    pub step: String,
    pub action: String,
}

/// One routing transition of a work-item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub workflow_id: String,
    pub work_item: Uuid,
    pub item: Uuid,
    /// Acting user; `None` for automatic transitions.
    pub actor: Option<Uuid>,
    /// `None` at workflow entry.
    pub previous: Option<TransitionPoint>,
    /// `None` when the item left the workflow.
    pub current: Option<TransitionPoint>,
    /// Users currently owning a claimed task on the work-item.
    pub task_owners: Vec<Uuid>,
    /// Groups currently holding a pooled candidate task.
    pub group_owners: Vec<Uuid>,
    pub timestamp: DateTime<Utc>,
}

/// Trait for receiving workflow events.
///
/// Implementations decide what to do with each event: append to a file,
/// forward to a reporting pipeline, count metrics. Errors are logged but
/// never fail the transition that produced the event.
pub trait WorkflowEventSink: Send + Sync {
    fn record(&self, event: &WorkflowEvent) -> Result<(), EngineError>;
}

/// Appends events as JSONL to a file.
pub struct JsonlEventSink {
    path: PathBuf,
}

impl JsonlEventSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl WorkflowEventSink for JsonlEventSink {
    fn record(&self, event: &WorkflowEvent) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| EngineError::EventSink {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| EngineError::EventSink {
                path: self.path.display().to_string(),
                source,
            })?;
        let json = serde_json::to_string(event)?;
        writeln!(file, "{}", json).map_err(|source| EngineError::EventSink {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(())
    }
}

/// Logs events through `tracing` at info level.
pub struct LogEventSink;

impl WorkflowEventSink for LogEventSink {
    fn record(&self, event: &WorkflowEvent) -> Result<(), EngineError> {
        tracing::info!(
            workflow = %event.workflow_id,
            work_item = %event.work_item,
            previous = ?event.previous,
            current = ?event.current,
            "workflow transition"
        );
        Ok(())
    }
}

/// Fans events out to every registered sink.
///
/// A failing sink is reported via `tracing::warn!` and does not prevent
/// the other sinks from receiving the event.
#[derive(Default)]
pub struct EventLog {
    sinks: Vec<Box<dyn WorkflowEventSink>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&mut self, sink: Box<dyn WorkflowEventSink>) {
        self.sinks.push(sink);
    }

    pub fn emit(&self, event: &WorkflowEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.record(event) {
                tracing::warn!("event sink error: {}", e);
            }
        }
    }
}
