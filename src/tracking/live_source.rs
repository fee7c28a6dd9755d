use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use crate::models::coordinate::Coordinate;
use crate::models::error::{PositionError, TrackerError};
use crate::tracking::source::{PositionSink, PositionSource, SourceId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WatchOptions {
    #[serde(rename = "enableHighAccuracy")]
    pub high_accuracy: bool,
    #[serde(rename = "maximumAge")]
    pub max_staleness_ms: u64,
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self { high_accuracy: true, max_staleness_ms: 0, timeout_ms: 10_000 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WatchHandle(pub u64);

/// The device's continuous location-sensing capability.
pub trait LocationPlatform: Send + Sync {
    /// Fails with `PlatformUnsupported` when there is no sensing capability at all.
    fn watch(&self, options: WatchOptions, sink: PositionSink) -> Result<WatchHandle, TrackerError>;
    fn cancel(&self, handle: WatchHandle);

    /// Feeds a fix or failure observed outside the process into the watch `handle`.
    /// Reports for cancelled watches are dropped. Platforms that sense on their own
    /// never receive these.
    fn report(&self, handle: WatchHandle, report: Result<Coordinate, PositionError>) {
        debug!("Ignoring report {:?} for watch {:?}", report, handle);
    }
}

pub struct LiveSource {
    platform: Arc<dyn LocationPlatform>,
    options: WatchOptions,
    active: Option<(SourceId, WatchHandle)>,
}

impl LiveSource {
    pub fn new(platform: Arc<dyn LocationPlatform>, options: WatchOptions) -> Self {
        Self { platform, options, active: None }
    }

    pub fn is_current(&self, source: SourceId) -> bool {
        matches!(self.active, Some((active, _)) if active == source)
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn stop(&mut self) {
        if let Some((source, handle)) = self.active.take() {
            info!("Cancelling live subscription {:?} (watch {:?})", source, handle);
            self.platform.cancel(handle);
        }
    }
}

impl PositionSource for LiveSource {
    fn subscribe(&mut self, sink: PositionSink) -> Result<SourceId, TrackerError> {
        // The previous watch must be gone before a new one opens.
        self.stop();
        let source = sink.source();
        let handle = self.platform.watch(self.options, sink)?;
        info!("Opened live subscription {:?} (watch {:?})", source, handle);
        self.active = Some((source, handle));
        Ok(source)
    }

    fn unsubscribe(&mut self, source: SourceId) {
        if self.is_current(source) {
            self.stop();
        } else {
            debug!("Ignoring unsubscribe of inactive source {:?}", source);
        }
    }
}

impl Drop for LiveSource {
    fn drop(&mut self) {
        self.stop();
    }
}
