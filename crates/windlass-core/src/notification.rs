// Progress notifications streamed to subscribers while a task runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Human-readable payload of a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub title: String,
    pub body: String,
}

/// A single progress message tagged to a task.
///
/// Notifications are pushed to the task's progress channel as they happen
/// and also accumulate in the workflow context's log buffer, from which
/// result envelopes drain them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub task_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub message: NotificationMessage,
}

impl Notification {
    pub fn new(task_id: Uuid, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            task_id,
            timestamp: Utc::now(),
            message: NotificationMessage {
                title: title.into(),
                body: body.into(),
            },
        }
    }

    pub fn title(&self) -> &str {
        &self.message.title
    }

    pub fn body(&self) -> &str {
        &self.message.body
    }
}
