// Per-task progress channels
//
// One unbounded FIFO per active task. The running body pushes
// notifications (producer), a single streaming subscriber drains them
// (consumer) until the close sentinel. Pushing to a missing channel is a
// no-op so a body never fails because nobody is listening.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use windlass_core::Notification;

/// Queue item: `None` is the close sentinel
type Item = Option<Notification>;

struct ChannelEntry {
    tx: mpsc::UnboundedSender<Item>,
    /// Available until a subscriber claims it (single consumer)
    rx: Option<mpsc::UnboundedReceiver<Item>>,
}

/// Map of task id to its progress channel.
///
/// Owned by the scheduler: channels open when a task starts and close
/// (sentinel pushed, entry removed) when it terminates.
#[derive(Default)]
pub struct ProgressChannels {
    channels: Mutex<HashMap<Uuid, ChannelEntry>>,
}

impl ProgressChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a channel for a new task, returning the producer side handed
    /// to the task's workflow context
    pub fn open(&self, task_id: Uuid) -> mpsc::UnboundedSender<Item> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels
            .lock()
            .expect("channel map poisoned")
            .insert(task_id, ChannelEntry {
                tx: tx.clone(),
                rx: Some(rx),
            });
        tx
    }

    /// Push a notification; no-op if the task has no channel
    pub fn push(&self, task_id: Uuid, notification: Notification) {
        if let Some(entry) = self
            .channels
            .lock()
            .expect("channel map poisoned")
            .get(&task_id)
        {
            let _ = entry.tx.send(Some(notification));
        }
    }

    /// Claim the consumer side for a task. Returns `None` if the task is
    /// unknown or a subscriber already claimed it.
    pub fn subscribe(&self, task_id: Uuid) -> Option<ProgressStream> {
        self.channels
            .lock()
            .expect("channel map poisoned")
            .get_mut(&task_id)
            .and_then(|entry| entry.rx.take())
            .map(|rx| ProgressStream { rx })
    }

    /// Push the close sentinel and drop the task's entry. Safe to call
    /// for unknown tasks.
    pub fn close(&self, task_id: Uuid) {
        if let Some(entry) = self
            .channels
            .lock()
            .expect("channel map poisoned")
            .remove(&task_id)
        {
            let _ = entry.tx.send(None);
            debug!(%task_id, "progress channel closed");
        }
    }

    pub fn contains(&self, task_id: Uuid) -> bool {
        self.channels
            .lock()
            .expect("channel map poisoned")
            .contains_key(&task_id)
    }

    pub fn len(&self) -> usize {
        self.channels.lock().expect("channel map poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Awaitable stream of one task's notifications; ends when the close
/// sentinel is observed
pub struct ProgressStream {
    rx: mpsc::UnboundedReceiver<Item>,
}

impl ProgressStream {
    /// Next notification, or `None` once the task's channel closed
    pub async fn recv(&mut self) -> Option<Notification> {
        match self.rx.recv().await {
            Some(Some(notification)) => Some(notification),
            _ => None,
        }
    }
}

impl Stream for ProgressStream {
    type Item = Notification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(Some(notification))) => Poll::Ready(Some(notification)),
            Poll::Ready(Some(None)) | Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
