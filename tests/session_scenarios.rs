use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use route_tracker::config::TrackingConfig;
use route_tracker::map_view::{CommandMapView, MapCommand};
use route_tracker::models::coordinate::{Coordinate, Direction, TrackingMode};
use route_tracker::models::error::TrackerError;
use route_tracker::models::route::RouteId;
use route_tracker::storage::kv::{FileStore, KeyValueStore, MemoryStore, SharedStore};
use route_tracker::storage::route_store::RouteStore;
use route_tracker::storage::waypoints::{markers_key, WaypointManager};
use route_tracker::tracking::controller::TrackingController;
use route_tracker::tracking::live_source::{LocationPlatform, WatchHandle, WatchOptions};
use route_tracker::tracking::source::{PositionSink, SourceEvent};

/// A platform whose single open watch can be fed by the test.
#[derive(Default)]
struct ScriptedPlatform {
    open: Mutex<Option<(WatchHandle, PositionSink)>>,
    watches: Mutex<u64>,
}

impl ScriptedPlatform {
    fn feed(&self, lat: f64, lng: f64) {
        if let Some((_, sink)) = self.open.lock().unwrap().as_ref() {
            sink.update(Coordinate::new(lat, lng));
        }
    }
}

impl LocationPlatform for ScriptedPlatform {
    fn watch(&self, _options: WatchOptions, sink: PositionSink) -> Result<WatchHandle, TrackerError> {
        let mut open = self.open.lock().unwrap();
        assert!(open.is_none(), "a second watch opened before the first was cancelled");
        let mut watches = self.watches.lock().unwrap();
        *watches += 1;
        *open = Some((WatchHandle(*watches), sink));
        Ok(WatchHandle(*watches))
    }

    fn cancel(&self, handle: WatchHandle) {
        let mut open = self.open.lock().unwrap();
        if matches!(open.as_ref(), Some((current, _)) if *current == handle) {
            *open = None;
        }
    }
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("route-tracker-it-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn null_map() -> CommandMapView<impl FnMut(MapCommand) + Send> {
    CommandMapView::new(|_: MapCommand| {})
}

#[test]
fn live_tracking_scenario() {
    let platform = Arc::new(ScriptedPlatform::default());
    let (events, mut queue) = mpsc::unbounded_channel();
    let mut controller = TrackingController::new(&TrackingConfig::default(), platform.clone(), events);

    controller.start_live();
    controller.start_live();
    platform.feed(37.0, 127.0);
    platform.feed(37.001, 127.001);
    platform.feed(37.002, 127.002);
    while let Ok(event) = queue.try_recv() {
        controller.on_source_event(event);
    }

    assert_eq!(controller.mode(), TrackingMode::Live);
    assert_eq!(controller.path(), &[
        Coordinate::new(37.0, 127.0),
        Coordinate::new(37.001, 127.001),
        Coordinate::new(37.002, 127.002),
    ]);
    assert_eq!(controller.status(), "Live | 위도: 37.002000 | 경도: 127.002000");
    assert_eq!(*platform.watches.lock().unwrap(), 2);
}

#[tokio::test]
async fn manual_tracking_scenario() {
    let config = TrackingConfig {
        origin: Coordinate::new(37.5665, 126.978),
        delta: 0.01,
        ..TrackingConfig::default()
    };
    let (events, mut queue) = mpsc::unbounded_channel();
    let mut controller = TrackingController::new(&config, Arc::new(ScriptedPlatform::default()), events);

    assert!(controller.enable_manual());
    assert_eq!(controller.path(), &[config.origin]);

    controller.press(Direction::Up);
    let tick = queue.recv().await.unwrap();
    assert!(matches!(tick, SourceEvent::Tick { .. }));
    for _ in 0..5 {
        controller.on_source_event(tick.clone());
    }
    controller.disable_manual();

    let last = *controller.path().last().unwrap();
    assert!((last.latitude - 37.6165).abs() < 1e-9);
    assert_eq!(last.longitude, 126.978);
    assert_eq!(controller.path().len(), 6);
    assert_eq!(controller.mode(), TrackingMode::Idle);
}

#[test]
fn routes_persist_across_store_instances() {
    let dir = scratch_dir("routes");
    let path = vec![Coordinate::new(37.0, 127.0), Coordinate::new(37.5, 127.5)];
    let saved = {
        let routes = RouteStore::new(Arc::new(FileStore::open(&dir).unwrap()));
        routes.save_current_path("morning", &path).unwrap().unwrap()
    };

    let routes = RouteStore::new(Arc::new(FileStore::open(&dir).unwrap()));
    assert_eq!(routes.list_routes().unwrap(), vec![saved.clone()]);
    assert!(routes.delete_route(&saved.id).unwrap());
    assert!(!routes.delete_route(&saved.id).unwrap());
    assert!(routes.list_routes().unwrap().is_empty());
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn clearing_waypoints_removes_the_record() {
    let dir = scratch_dir("waypoints");
    let store: SharedStore = Arc::new(FileStore::open(&dir).unwrap());
    let path = vec![Coordinate::new(37.0, 127.0), Coordinate::new(37.002, 127.002)];
    let key = markers_key(&RouteId::for_path(&path).unwrap());
    let mut map = null_map();

    let mut manager = WaypointManager::new(store.clone());
    manager.bind(&path, &mut map).unwrap();
    manager.add(Coordinate::new(37.001, 127.001), "A", &mut map).unwrap();
    manager.add(Coordinate::new(37.0015, 127.0015), "B", &mut map).unwrap();
    assert!(store.get(&key).unwrap().is_some());

    let mut reloaded = WaypointManager::new(store.clone());
    reloaded.bind(&path, &mut map).unwrap();
    let titles: Vec<_> = reloaded.waypoints().iter().map(|w| w.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "B"]);

    reloaded.clear_all(&mut map).unwrap();
    assert_eq!(store.get(&key).unwrap(), None);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn clearing_routes_does_not_cascade_to_waypoints() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let routes = RouteStore::new(store.clone());
    let path = vec![Coordinate::new(1.0, 1.0), Coordinate::new(2.0, 2.0)];
    let route = routes.save_current_path("r", &path).unwrap().unwrap();
    let mut map = null_map();

    let mut manager = WaypointManager::new(store.clone());
    manager.bind(&route.path, &mut map).unwrap();
    manager.add(Coordinate::new(1.5, 1.5), "orphan", &mut map).unwrap();
    routes.clear_all_routes().unwrap();

    let key = markers_key(&RouteId::for_path(&path).unwrap());
    assert!(routes.list_routes().unwrap().is_empty());
    assert!(store.get(&key).unwrap().is_some());
}

#[test]
fn undecodable_route_records_read_as_empty() {
    let dir = scratch_dir("bytes");
    let routes = RouteStore::new(Arc::new(FileStore::open(&dir).unwrap()));
    std::fs::write(dir.join("savedRoutes.json"), [0xff, 0xfe, 0x00]).unwrap();

    assert!(routes.list_routes().unwrap().is_empty());
    let saved = routes.save_current_path("fresh", &[Coordinate::new(1.0, 1.0)]).unwrap().unwrap();
    assert_eq!(routes.list_routes().unwrap(), vec![saved]);
    std::fs::remove_dir_all(&dir).unwrap();
}
