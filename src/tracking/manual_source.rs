use std::collections::HashSet;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use crate::models::coordinate::{Coordinate, Direction};
use crate::models::error::TrackerError;
use crate::tracking::source::{PositionSink, PositionSource, SourceId};
use crate::tracking::task::AutoCancelTask;

/// Simulated movement driven by held direction keys.
///
/// While subscribed, a repeating task sends one tick per frame interval into the
/// session queue. Each tick advances the virtual position by `delta` in every held
/// direction. Dropping the ticker aborts the task, so at most one loop is alive.
pub struct ManualSource {
    origin: Coordinate,
    delta: f64,
    tick_interval: Duration,
    position: Coordinate,
    held: HashSet<Direction>,
    ticker: Option<(SourceId, AutoCancelTask<()>)>,
}

impl ManualSource {
    pub fn new(origin: Coordinate, delta: f64, tick_interval: Duration) -> Self {
        Self {
            origin,
            delta,
            tick_interval,
            position: origin,
            held: HashSet::new(),
            ticker: None,
        }
    }

    pub fn origin(&self) -> Coordinate {
        self.origin
    }

    pub fn position(&self) -> Coordinate {
        self.position
    }

    pub fn is_current(&self, source: SourceId) -> bool {
        matches!(&self.ticker, Some((active, _)) if *active == source)
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn press(&mut self, direction: Direction) {
        self.held.insert(direction);
    }

    pub fn release(&mut self, direction: Direction) {
        self.held.remove(&direction);
    }

    /// Applies one tick. Returns the new position when any direction is held.
    pub fn advance(&mut self) -> Option<Coordinate> {
        if self.held.is_empty() {
            return None;
        }
        let (d_lat, d_lng) = Direction::ALL
            .iter()
            .filter(|direction| self.held.contains(*direction))
            .map(|direction| direction.unit())
            .fold((0.0, 0.0), |(lat, lng), (u_lat, u_lng)| (lat + u_lat, lng + u_lng));
        self.position = self.position.offset(d_lat * self.delta, d_lng * self.delta);
        Some(self.position)
    }

    pub fn stop(&mut self) {
        if let Some((source, _task)) = self.ticker.take() {
            info!("Stopped manual tick loop {:?}", source);
        }
        self.held.clear();
    }
}

impl PositionSource for ManualSource {
    fn subscribe(&mut self, sink: PositionSink) -> Result<SourceId, TrackerError> {
        self.stop();
        self.position = self.origin;
        let source = sink.source();
        let period = self.tick_interval;
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if !sink.tick() {
                    debug!("Session closed, ending tick loop {:?}", sink.source());
                    break;
                }
            }
        });
        info!("Started manual tick loop {:?} every {:?}", source, period);
        self.ticker = Some((source, AutoCancelTask(task)));
        Ok(source)
    }

    fn unsubscribe(&mut self, source: SourceId) {
        if self.is_current(source) {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use crate::tracking::source::SourceEvent;
    use super::*;

    const ORIGIN: Coordinate = Coordinate::new(37.5665, 126.978);

    fn source(delta: f64) -> ManualSource {
        ManualSource::new(ORIGIN, delta, Duration::from_millis(16))
    }

    #[test]
    fn idle_ticks_do_not_move() {
        let mut manual = source(0.01);
        assert_eq!(manual.advance(), None);
        assert_eq!(manual.position(), ORIGIN);
    }

    #[test]
    fn diagonal_is_additive() {
        let mut manual = source(0.01);
        manual.press(Direction::Up);
        manual.press(Direction::Right);
        let p = manual.advance().unwrap();
        assert!((p.latitude - 37.5765).abs() < 1e-9);
        assert!((p.longitude - 126.988).abs() < 1e-9);
    }

    #[test]
    fn releasing_stops_movement() {
        let mut manual = source(0.01);
        manual.press(Direction::Left);
        manual.advance();
        manual.release(Direction::Left);
        assert_eq!(manual.advance(), None);
        assert!((manual.position().longitude - 126.968).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_loop_stops_when_unsubscribed() {
        let mut manual = source(0.01);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = manual.subscribe(PositionSink::new(SourceId(1), tx)).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(rx.recv().await, Some(SourceEvent::Tick { source: id }));

        manual.unsubscribe(id);
        assert!(!manual.is_running());
        tokio::task::yield_now().await;
        while rx.try_recv().is_ok() {}

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn resubscribing_replaces_the_loop() {
        let mut manual = source(0.01);
        let (tx, mut rx) = mpsc::unbounded_channel();
        manual.subscribe(PositionSink::new(SourceId(1), tx.clone())).unwrap();
        manual.press(Direction::Up);
        manual.advance();
        manual.subscribe(PositionSink::new(SourceId(2), tx)).unwrap();

        assert_eq!(manual.position(), ORIGIN);
        assert!(manual.is_current(SourceId(2)));
        tokio::task::yield_now().await;
        while rx.try_recv().is_ok() {}

        tokio::time::sleep(Duration::from_millis(100)).await;
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event, SourceEvent::Tick { source: SourceId(2) });
        }
    }
}
