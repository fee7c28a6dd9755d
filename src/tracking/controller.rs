use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use crate::config::TrackingConfig;
use crate::models::coordinate::{Coordinate, Direction, TrackingMode};
use crate::models::error::TrackerError;
use crate::tracking::live_source::{LiveSource, LocationPlatform};
use crate::tracking::manual_source::ManualSource;
use crate::tracking::path_recorder::PathRecorder;
use crate::tracking::source::{PositionSink, PositionSource, SourceEvent, SourceId};

pub const STATUS_WAITING: &str = "waiting for position...";
pub const STATUS_STARTED: &str = "tracking started";
pub const STATUS_STOPPED: &str = "tracking stopped";
pub const STATUS_MANUAL_ENDED: &str = "manual mode ended";
pub const STATUS_LIVE_BLOCKED: &str = "live tracking is unavailable while manual mode is active";
pub const STATUS_MANUAL_BLOCKED: &str = "manual mode is unavailable while live tracking is active";

pub fn position_status(mode: TrackingMode, position: Coordinate) -> String {
    format!("{} | 위도: {:.6} | 경도: {:.6}", mode, position.latitude, position.longitude)
}

/// Gates which position source is active and feeds its output into the path.
///
/// Exactly one of Idle, Live and Manual holds at a time. Failures from either
/// source only change the status line. Events from a superseded subscription
/// are dropped, so a cancelled stream can never append to the path.
pub struct TrackingController {
    mode: TrackingMode,
    recorder: PathRecorder,
    current: Option<Coordinate>,
    status: String,
    live: LiveSource,
    manual: ManualSource,
    events: mpsc::UnboundedSender<SourceEvent>,
    next_source: u64,
}

impl TrackingController {
    pub fn new(config: &TrackingConfig,
               platform: Arc<dyn LocationPlatform>,
               events: mpsc::UnboundedSender<SourceEvent>) -> Self {
        Self {
            mode: TrackingMode::Idle,
            recorder: PathRecorder::new(),
            current: None,
            status: STATUS_WAITING.to_string(),
            live: LiveSource::new(platform, config.watch_options),
            manual: ManualSource::new(config.origin, config.delta, config.tick_interval),
            events,
            next_source: 0,
        }
    }

    pub fn mode(&self) -> TrackingMode {
        self.mode
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn path(&self) -> &[Coordinate] {
        self.recorder.snapshot()
    }

    pub fn current(&self) -> Option<Coordinate> {
        self.current
    }

    fn new_sink(&mut self) -> PositionSink {
        self.next_source += 1;
        PositionSink::new(SourceId(self.next_source), self.events.clone())
    }

    /// Opens (or re-opens) the live subscription. Returns whether live mode is now active.
    pub fn start_live(&mut self) -> bool {
        if self.mode == TrackingMode::Manual {
            warn!("Rejected live start while manual mode is active");
            self.status = STATUS_LIVE_BLOCKED.to_string();
            return false;
        }
        let sink = self.new_sink();
        match self.live.subscribe(sink) {
            Ok(source) => {
                info!("Live tracking started on {:?}", source);
                self.mode = TrackingMode::Live;
                self.status = STATUS_STARTED.to_string();
                true
            }
            Err(e) => {
                error!("Live tracking failed to start: {}", e);
                self.mode = TrackingMode::Idle;
                self.status = e.to_string();
                false
            }
        }
    }

    pub fn stop_live(&mut self) -> bool {
        if self.mode != TrackingMode::Live {
            debug!("Ignoring live stop in {} mode", self.mode);
            return false;
        }
        self.live.stop();
        self.mode = TrackingMode::Idle;
        self.status = STATUS_STOPPED.to_string();
        if self.recorder.is_empty() {
            warn!("Live tracking stopped before any fix arrived");
        } else {
            info!("Live tracking stopped with {} points", self.recorder.len());
        }
        true
    }

    /// Resets the path to the origin and starts the tick loop.
    pub fn enable_manual(&mut self) -> bool {
        match self.mode {
            TrackingMode::Live => {
                warn!("Rejected manual mode while live tracking is active");
                self.status = STATUS_MANUAL_BLOCKED.to_string();
                return false;
            }
            TrackingMode::Manual => return false,
            TrackingMode::Idle => {}
        }
        let sink = self.new_sink();
        if let Err(e) = self.manual.subscribe(sink) {
            error!("Manual mode failed to start: {}", e);
            self.status = e.to_string();
            return false;
        }
        self.mode = TrackingMode::Manual;
        self.recorder.reset();
        self.apply(self.manual.origin());
        info!("Manual mode enabled at {:?}", self.manual.origin());
        true
    }

    /// Stops the tick loop. The path is kept for saving or inspection.
    pub fn disable_manual(&mut self) -> bool {
        if self.mode != TrackingMode::Manual {
            return false;
        }
        self.manual.stop();
        self.mode = TrackingMode::Idle;
        self.status = STATUS_MANUAL_ENDED.to_string();
        info!("Manual mode disabled with {} points", self.recorder.len());
        true
    }

    pub fn press(&mut self, direction: Direction) {
        if self.mode == TrackingMode::Manual {
            self.manual.press(direction);
        }
    }

    pub fn release(&mut self, direction: Direction) {
        self.manual.release(direction);
    }

    /// Processes one queued source event. Returns the appended point, if any.
    pub fn on_source_event(&mut self, event: SourceEvent) -> Option<Coordinate> {
        match event {
            SourceEvent::Position { source, position } => {
                if self.mode == TrackingMode::Live && self.live.is_current(source) {
                    Some(self.apply(position))
                } else {
                    debug!("Dropping position from inactive source {:?}", source);
                    None
                }
            }
            SourceEvent::Error { source, error } => {
                if self.live.is_current(source) {
                    warn!("Position source {:?} reported {:?}: {}", source, error.kind, error.message);
                    self.status = TrackerError::Position(error).to_string();
                }
                None
            }
            SourceEvent::Tick { source } => {
                if self.mode == TrackingMode::Manual && self.manual.is_current(source) {
                    let position = self.manual.advance()?;
                    Some(self.apply(position))
                } else {
                    None
                }
            }
        }
    }

    fn apply(&mut self, position: Coordinate) -> Coordinate {
        self.recorder.append(position);
        self.current = Some(position);
        self.status = position_status(self.mode, position);
        position
    }
}

#[cfg(test)]
mod tests {
    use crate::models::error::{PositionError, PositionErrorKind};
    use crate::tracking::live_source::tests::MockPlatform;
    use super::*;

    fn controller(platform: Arc<MockPlatform>, delta: f64)
                  -> (TrackingController, mpsc::UnboundedReceiver<SourceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = TrackingConfig { delta, ..TrackingConfig::default() };
        (TrackingController::new(&config, platform, tx), rx)
    }

    fn drain(controller: &mut TrackingController, rx: &mut mpsc::UnboundedReceiver<SourceEvent>) {
        while let Ok(event) = rx.try_recv() {
            controller.on_source_event(event);
        }
    }

    #[test]
    fn live_scenario_records_points_in_order() {
        let platform = Arc::new(MockPlatform::default());
        let (mut controller, mut rx) = controller(platform.clone(), 0.01);
        assert!(controller.start_live());
        assert_eq!(controller.status(), STATUS_STARTED);

        let fixes = [
            Coordinate::new(37.0, 127.0),
            Coordinate::new(37.001, 127.001),
            Coordinate::new(37.002, 127.002),
        ];
        for fix in fixes {
            platform.emit(fix);
        }
        drain(&mut controller, &mut rx);

        assert_eq!(controller.path(), &fixes);
        assert_eq!(controller.status(), "Live | 위도: 37.002000 | 경도: 127.002000");
        assert_eq!(controller.current(), Some(fixes[2]));
    }

    #[test]
    fn restarting_live_leaves_one_subscription() {
        let platform = Arc::new(MockPlatform::default());
        let (mut controller, mut rx) = controller(platform.clone(), 0.01);
        controller.start_live();
        let stale = platform.open.lock().unwrap()[0].1.clone();
        controller.start_live();

        assert_eq!(platform.calls(), vec!["watch 1", "cancel 1", "watch 2"]);
        assert_eq!(platform.open_count(), 1);

        stale.update(Coordinate::new(1.0, 1.0));
        platform.emit(Coordinate::new(2.0, 2.0));
        drain(&mut controller, &mut rx);
        assert_eq!(controller.path(), &[Coordinate::new(2.0, 2.0)]);
    }

    #[test]
    fn source_errors_only_touch_status() {
        let platform = Arc::new(MockPlatform::default());
        let (mut controller, mut rx) = controller(platform.clone(), 0.01);
        controller.start_live();
        let sink = platform.open.lock().unwrap()[0].1.clone();
        sink.error(PositionError::new(PositionErrorKind::Timeout, "Timeout expired"));
        drain(&mut controller, &mut rx);

        assert_eq!(controller.mode(), TrackingMode::Live);
        assert_eq!(controller.status(), "GPS error: Timeout expired");
        assert_eq!(platform.open_count(), 1);
    }

    #[test]
    fn unsupported_platform_sets_status_without_subscribing() {
        let platform = Arc::new(MockPlatform::unsupported());
        let (mut controller, _rx) = controller(platform.clone(), 0.01);
        assert!(!controller.start_live());
        assert_eq!(controller.mode(), TrackingMode::Idle);
        assert_eq!(controller.status(), TrackerError::PlatformUnsupported.to_string());
        assert!(platform.calls().is_empty());
    }

    #[test]
    fn stop_live_only_from_live() {
        let platform = Arc::new(MockPlatform::default());
        let (mut controller, _rx) = controller(platform.clone(), 0.01);
        assert!(!controller.stop_live());
        controller.start_live();
        assert!(controller.stop_live());
        assert_eq!(controller.mode(), TrackingMode::Idle);
        assert_eq!(controller.status(), STATUS_STOPPED);
        assert_eq!(platform.open_count(), 0);
    }

    #[tokio::test]
    async fn manual_mode_seeds_origin() {
        let (mut controller, _rx) = controller(Arc::new(MockPlatform::default()), 0.01);
        controller.start_live();
        controller.stop_live();
        assert!(controller.enable_manual());
        assert_eq!(controller.path(), &[Coordinate::new(37.5665, 126.978)]);
        assert_eq!(controller.status(), "Manual | 위도: 37.566500 | 경도: 126.978000");
    }

    #[tokio::test]
    async fn holding_up_for_five_ticks() {
        let (mut controller, _rx) = controller(Arc::new(MockPlatform::default()), 0.01);
        controller.enable_manual();
        controller.press(Direction::Up);
        let source = SourceId(controller.next_source);
        for _ in 0..5 {
            controller.on_source_event(SourceEvent::Tick { source });
        }

        let last = controller.current().unwrap();
        assert!((last.latitude - 37.6165).abs() < 1e-9);
        assert_eq!(last.longitude, 126.978);
        assert_eq!(controller.path().len(), 6);
    }

    #[tokio::test]
    async fn modes_are_mutually_exclusive() {
        let platform = Arc::new(MockPlatform::default());
        let (mut controller, _rx) = controller(platform.clone(), 0.01);
        controller.enable_manual();
        assert!(!controller.start_live());
        assert_eq!(controller.mode(), TrackingMode::Manual);
        assert_eq!(controller.status(), STATUS_LIVE_BLOCKED);
        assert!(platform.calls().is_empty());

        controller.disable_manual();
        controller.start_live();
        assert!(!controller.enable_manual());
        assert_eq!(controller.mode(), TrackingMode::Live);
        assert_eq!(controller.status(), STATUS_MANUAL_BLOCKED);
    }

    #[tokio::test]
    async fn disabling_manual_keeps_path_and_ignores_late_ticks() {
        let (mut controller, _rx) = controller(Arc::new(MockPlatform::default()), 0.01);
        controller.enable_manual();
        controller.press(Direction::Right);
        let source = SourceId(controller.next_source);
        controller.on_source_event(SourceEvent::Tick { source });
        assert!(controller.disable_manual());

        assert_eq!(controller.on_source_event(SourceEvent::Tick { source }), None);
        assert_eq!(controller.path().len(), 2);
        assert_eq!(controller.status(), STATUS_MANUAL_ENDED);
    }

    #[tokio::test]
    async fn re_entering_manual_resets_the_path() {
        let (mut controller, _rx) = controller(Arc::new(MockPlatform::default()), 0.01);
        controller.enable_manual();
        controller.press(Direction::Down);
        let first = SourceId(controller.next_source);
        controller.on_source_event(SourceEvent::Tick { source: first });
        controller.disable_manual();
        controller.enable_manual();

        assert_eq!(controller.path(), &[Coordinate::new(37.5665, 126.978)]);
        assert_eq!(controller.on_source_event(SourceEvent::Tick { source: first }), None);
    }
}
