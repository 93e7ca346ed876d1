//! Where engine events go once the manager has produced them.

pub mod dispatcher;
pub mod format;
pub mod transport;

pub use dispatcher::{DispatchStats, OutputDispatcher};
pub use format::format_message;
pub use transport::{SocketClient, SocketSettings, Transport, TransportStatus};

use crate::config::MessageFormat;
use crate::events::{EngineEvent, GestureEvent};
use parking_lot::Mutex;
use tracing::{info, warn};

/// Receives every event the manager emits, including forced end events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &EngineEvent);
}

/// Logs each event at info level
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    format: MessageFormat,
}

impl ConsoleSink {
    pub fn new(format: MessageFormat) -> Self {
        Self { format }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, event: &EngineEvent) {
        match self.format {
            MessageFormat::Simple => info!("{}", event.description()),
            MessageFormat::Json => match format_message(event, MessageFormat::Json) {
                Ok(line) => info!("{}", line),
                Err(err) => warn!("Failed to serialize {} event: {}", event.event_type(), err),
            },
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct CapturingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().clone()
    }

    pub fn gestures(&self) -> Vec<GestureEvent> {
        self.events
            .lock()
            .iter()
            .filter_map(EngineEvent::as_gesture)
            .cloned()
            .collect()
    }

    /// Drain the captured events
    pub fn take(&self) -> Vec<EngineEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for CapturingSink {
    fn emit(&self, event: &EngineEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Details;
    use crate::landmarks::{HandId, HandType};

    #[test]
    fn test_capturing_sink_records_and_drains() {
        let sink = CapturingSink::new();
        assert!(sink.is_empty());

        let event = GestureEvent::new(HandId::from("h1"), HandType::Right, "HandOpen", 80.0, Details::new());
        sink.emit(&event.clone().into());
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.gestures(), vec![event]);

        assert_eq!(sink.take().len(), 1);
        assert!(sink.is_empty());
    }
}
