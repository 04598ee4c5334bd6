//! Import lifecycle events.
//!
//! Each session carries a broadcast bus; hosts subscribe to observe
//! progress (the HTTP API streams these over SSE). Emitting with no
//! subscribers is fine — events are notifications, not commands.

use serde::Serialize;
use tokio::sync::broadcast;

/// Events emitted to the host over a session's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ImportEvent {
    FileParsed {
        row_count: usize,
        column_count: usize,
        has_headers: bool,
    },
    ParseError {
        message: String,
    },
    MappingConfirmed {
        mapped: usize,
    },
    ValidationComplete {
        valid: usize,
        invalid: usize,
    },
    CellEdited {
        row_index: usize,
        key: String,
        valid: bool,
    },
    RowExcluded {
        row_index: usize,
        excluded: bool,
    },
    ImportSucceeded {
        row_count: usize,
    },
    Cancelled,
}

/// Broadcasts events to all subscribed host listeners.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ImportEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send an event to all subscribers (ignored if none).
    pub fn emit(&self, event: ImportEvent) {
        let _ = self.sender.send(event);
    }

    /// Get a receiver for streaming.
    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_reach_subscribers() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(ImportEvent::RowExcluded { row_index: 2, excluded: true });

        let event = rx.recv().await.unwrap();
        assert_eq!(event, ImportEvent::RowExcluded { row_index: 2, excluded: true });
    }

    #[test]
    fn test_emit_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.emit(ImportEvent::Cancelled);
    }

    #[test]
    fn test_event_wire_shape() {
        let event = ImportEvent::FileParsed {
            row_count: 10,
            column_count: 3,
            has_headers: true,
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "file-parsed");
        assert_eq!(json["rowCount"], 10);
        assert_eq!(json["hasHeaders"], true);
    }
}
