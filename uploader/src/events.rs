//! Upload event stream
//!
//! The pipeline emits an event for every status transition. Any number of
//! consumers (CLI output, UI state, loggers) can subscribe; emission never
//! blocks and events with no subscribers are dropped.

use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::{ItemId, UploadStatus};
use crate::store::{RecordId, RemoteId};

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    Enqueued {
        id: ItemId,
        filename: String,
    },
    StatusChanged {
        id: ItemId,
        status: UploadStatus,
    },
    Completed {
        id: ItemId,
        remote_id: RemoteId,
        record_id: RecordId,
    },
    Failed {
        id: ItemId,
        error: String,
    },
    /// Compensation gave up; the remote object has no metadata record
    Orphaned {
        id: ItemId,
        remote_id: RemoteId,
    },
    Removed {
        id: ItemId,
    },
    Closed {
        discarded: usize,
    },
}

impl UploadEvent {
    /// Short name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            UploadEvent::Enqueued { .. } => "enqueued",
            UploadEvent::StatusChanged { .. } => "status_changed",
            UploadEvent::Completed { .. } => "completed",
            UploadEvent::Failed { .. } => "failed",
            UploadEvent::Orphaned { .. } => "orphaned",
            UploadEvent::Removed { .. } => "removed",
            UploadEvent::Closed { .. } => "closed",
        }
    }

    pub fn item_id(&self) -> Option<&ItemId> {
        match self {
            UploadEvent::Enqueued { id, .. }
            | UploadEvent::StatusChanged { id, .. }
            | UploadEvent::Completed { id, .. }
            | UploadEvent::Failed { id, .. }
            | UploadEvent::Orphaned { id, .. }
            | UploadEvent::Removed { id } => Some(id),
            UploadEvent::Closed { .. } => None,
        }
    }
}

/// Broadcast bus for upload events
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<UploadEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Fire-and-forget; with no subscribers the event is dropped
    pub fn emit(&self, event: UploadEvent) {
        debug!(event_type = event.event_type(), item_id = ?event.item_id(), "EventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Receive every event emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_ok() {
        let bus = EventBus::default();
        bus.emit(UploadEvent::Closed { discarded: 0 });

        // A late subscriber does not see events sent before it joined
        let mut rx = bus.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let id = ItemId::new();

        bus.emit(UploadEvent::StatusChanged {
            id: id.clone(),
            status: UploadStatus::Uploading,
        });
        bus.emit(UploadEvent::Removed { id: id.clone() });

        let first = rx.recv().await.unwrap();
        assert_eq!(first.event_type(), "status_changed");
        assert_eq!(first.item_id(), Some(&id));
        assert_eq!(rx.recv().await.unwrap(), UploadEvent::Removed { id });
    }
}
