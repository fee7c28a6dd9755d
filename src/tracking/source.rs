use tokio::sync::mpsc;
use crate::models::coordinate::Coordinate;
use crate::models::error::{PositionError, TrackerError};

/// Identifies one subscription. Events carrying a superseded id are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Position { source: SourceId, position: Coordinate },
    Error { source: SourceId, error: PositionError },
    Tick { source: SourceId },
}

/// Delivery end of a subscription, feeding the session's event queue.
#[derive(Debug, Clone)]
pub struct PositionSink {
    source: SourceId,
    events: mpsc::UnboundedSender<SourceEvent>,
}

impl PositionSink {
    pub fn new(source: SourceId, events: mpsc::UnboundedSender<SourceEvent>) -> Self {
        Self { source, events }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    /// Returns false once the receiving session is gone.
    pub fn update(&self, position: Coordinate) -> bool {
        self.events.send(SourceEvent::Position { source: self.source, position }).is_ok()
    }

    pub fn error(&self, error: PositionError) -> bool {
        self.events.send(SourceEvent::Error { source: self.source, error }).is_ok()
    }

    pub fn tick(&self) -> bool {
        self.events.send(SourceEvent::Tick { source: self.source }).is_ok()
    }
}

pub trait PositionSource {
    fn subscribe(&mut self, sink: PositionSink) -> Result<SourceId, TrackerError>;
    fn unsubscribe(&mut self, source: SourceId);
}
