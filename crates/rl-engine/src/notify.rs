// notify.rs — Fire-and-forget task notifications.
//
// The engine composes (template, recipients, arguments) tuples; delivery
// lives behind the sink trait. A delivery failure is logged and dropped —
// it must never fail the transition that produced it. Individual items
// can be muted for the duration of a quiet workflow start.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

/// A notification ready for delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskNotification {
    /// Template id, e.g. "task_activated", "item_returned", "item_archived".
    pub template: String,
    pub recipients: Vec<Uuid>,
    /// Positional arguments the template renders (title, step, reason, ...).
    pub arguments: Vec<String>,
}

/// Delivery seam implemented by the embedding application.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &TaskNotification) -> Result<(), EngineError>;
}

/// Dispatches notifications to an optional sink, honoring per-item mutes.
#[derive(Default)]
pub struct Notifier {
    sink: Option<Arc<dyn NotificationSink>>,
    muted: Mutex<HashSet<Uuid>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sink(&mut self, sink: Arc<dyn NotificationSink>) {
        self.sink = Some(sink);
    }

    /// Suppress notifications about this work-item until unmuted.
    pub fn mute(&self, work_item: Uuid) {
        self.muted.lock().unwrap().insert(work_item);
    }

    pub fn unmute(&self, work_item: Uuid) {
        self.muted.lock().unwrap().remove(&work_item);
    }

    /// Deliver if a sink is configured and the item is not muted.
    pub fn notify(&self, work_item: Uuid, notification: TaskNotification) {
        if self.muted.lock().unwrap().contains(&work_item) {
            return;
        }
        let Some(sink) = &self.sink else {
            return;
        };
        if notification.recipients.is_empty() {
            return;
        }
        if let Err(e) = sink.deliver(&notification) {
            tracing::warn!(template = %notification.template, "notification delivery failed: {}", e);
        }
    }
}
