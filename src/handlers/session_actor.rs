use std::sync::Arc;
use tokio::select;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use crate::config::TrackingConfig;
use crate::handlers::events::{ClientMessage, DeviceMessage, ServerMessage, SocketMessage};
use crate::map_view::{ClickSubscription, MapView, Marker, PinnedMapView};
use crate::models::coordinate::{Coordinate, Direction};
use crate::models::error::TrackerError;
use crate::storage::kv::SharedStore;
use crate::storage::route_store::{RouteStore, ROUTE_VIEW_LOCATION};
use crate::storage::route_view::RouteView;
use crate::storage::waypoints::WaypointManager;
use crate::tracking::controller::TrackingController;
use crate::tracking::live_source::LocationPlatform;
use crate::tracking::source::SourceEvent;

pub const STATUS_NOTHING_TO_SAVE: &str = "nothing to save: the path is empty";
pub const STATUS_NOTHING_TO_VIEW: &str = "no route to display";

/// One operator session: the tracking state machine plus everything it renders
/// into and persists to. Owned by the task running `run_actor`; dropping it
/// cancels the live watch and the manual tick loop.
pub struct TrackingSession<M: MapView> {
    config: TrackingConfig,
    platform: Arc<dyn LocationPlatform>,
    controller: TrackingController,
    routes: RouteStore,
    waypoints: WaypointManager,
    map: PinnedMapView<M>,
    view: Option<RouteView>,
    clicks: ClickSubscription,
    status: watch::Sender<String>,
    outbound: mpsc::UnboundedSender<ServerMessage>,
}

impl<M: MapView> TrackingSession<M> {
    pub fn new(config: &TrackingConfig,
               platform: Arc<dyn LocationPlatform>,
               store: SharedStore,
               map: M,
               status: watch::Sender<String>,
               outbound: mpsc::UnboundedSender<ServerMessage>)
               -> (Self, mpsc::UnboundedReceiver<SourceEvent>) {
        let (events, source_events) = mpsc::unbounded_channel();
        let mut map = PinnedMapView::new(map);
        map.configure(config.origin, config.zoom);
        map.pin(Marker::current(config.origin));
        map.draw_path(&[]);
        let clicks = map.on_click();

        let session = Self {
            config: config.clone(),
            platform: platform.clone(),
            controller: TrackingController::new(config, platform, events),
            routes: RouteStore::new(store.clone()),
            waypoints: WaypointManager::new(store),
            map,
            view: None,
            clicks,
            status,
            outbound,
        };
        session.publish_status();
        (session, source_events)
    }

    pub fn controller(&self) -> &TrackingController {
        &self.controller
    }

    pub fn waypoints(&self) -> &WaypointManager {
        &self.waypoints
    }

    pub fn view(&self) -> Option<&RouteView> {
        self.view.as_ref()
    }

    pub async fn run_actor(mut self,
                           mut inbound: mpsc::Receiver<SocketMessage>,
                           mut source_events: mpsc::UnboundedReceiver<SourceEvent>) {
        info!("Session started, listening for clicks on {:?}", self.clicks);
        loop {
            select! {
                biased;
                message = inbound.recv() => match message {
                    Some(message) => {
                        // Whatever is already queued was delivered before this input.
                        while let Ok(event) = source_events.try_recv() {
                            self.handle_source(event);
                        }
                        self.handle_input(message);
                    }
                    None => {
                        info!("Client channel closed, ending session");
                        return;
                    }
                },
                Some(event) = source_events.recv() => self.handle_source(event),
            }
        }
    }

    pub fn handle_input(&mut self, message: SocketMessage) {
        match message {
            SocketMessage::Client(message) => self.handle_client(message),
            SocketMessage::Device(message) => self.handle_device(message),
        }
    }

    /// Hands a device report to the platform, which queues it for its watch.
    pub fn handle_device(&self, message: DeviceMessage) {
        let (watch, report) = message.into_report();
        self.platform.report(watch, report);
    }

    pub fn handle_source(&mut self, event: SourceEvent) {
        if let Some(position) = self.controller.on_source_event(event) {
            if self.view.is_none() {
                self.render_position(position);
            }
        }
        self.publish_status();
    }

    pub fn handle_client(&mut self, message: ClientMessage) {
        debug!("Handling {:?}", message);
        if let Err(e) = self.dispatch(message) {
            error!("Session operation failed: {}", e);
            self.status.send_replace(e.to_string());
        }
    }

    fn dispatch(&mut self, message: ClientMessage) -> Result<(), TrackerError> {
        match message {
            ClientMessage::StartLive => {
                self.controller.start_live();
                self.publish_status();
            }
            ClientMessage::StopLive => {
                if self.controller.stop_live() {
                    self.settle()?;
                }
                self.publish_status();
            }
            ClientMessage::EnableManual => {
                if self.controller.enable_manual() {
                    self.view = None;
                    self.show_recording();
                    self.settle()?;
                }
                self.publish_status();
            }
            ClientMessage::DisableManual => {
                if self.controller.disable_manual() {
                    self.settle()?;
                }
                self.publish_status();
            }
            ClientMessage::KeyDown { key } => match key.parse::<Direction>() {
                Ok(direction) => self.controller.press(direction),
                Err(e) => debug!("Ignoring key: {}", e),
            },
            ClientMessage::KeyUp { key } => {
                if let Ok(direction) = key.parse::<Direction>() {
                    self.controller.release(direction);
                }
            }
            ClientMessage::SaveRoute { name } => {
                match self.routes.save_current_path(&name, self.controller.path())? {
                    Some(route) => self.send(ServerMessage::Saved { route }),
                    None => {
                        self.status.send_replace(STATUS_NOTHING_TO_SAVE.to_string());
                    }
                }
            }
            ClientMessage::ListRoutes => self.send_routes()?,
            ClientMessage::DeleteRoute { id } => {
                self.routes.delete_route(&id)?;
                self.send_routes()?;
            }
            ClientMessage::ClearRoutes => {
                self.routes.clear_all_routes()?;
                self.send_routes()?;
            }
            ClientMessage::ViewRoute { id } => match self.routes.find_route(&id)? {
                Some(route) => {
                    let to = self.routes.load_for_view(&route)?;
                    self.send(ServerMessage::Navigate { to: to.to_string() });
                }
                None => {
                    warn!("Route {} not found", id);
                    self.status.send_replace(format!("route {} not found", id));
                }
            },
            ClientMessage::ViewRecording => {
                self.routes.stage_path(self.controller.path())?;
                self.send(ServerMessage::Navigate { to: ROUTE_VIEW_LOCATION.to_string() });
            }
            ClientMessage::OpenRouteView => self.open_view()?,
            ClientMessage::ClearViewedPath => {
                self.routes.clear_current_path()?;
                if self.view.take().is_some() {
                    self.map.unpin_all();
                    self.map.draw_path(&[]);
                    self.settle_on(&[])?;
                }
                self.send(ServerMessage::RouteView { point_count: 0 });
            }
            ClientMessage::CloseRouteView => {
                if self.view.take().is_some() {
                    self.show_recording();
                    self.settle()?;
                }
            }
            ClientMessage::ArmWaypoint => {
                self.settle()?;
                self.waypoints.arm();
                self.send(ServerMessage::Armed { armed: true });
            }
            ClientMessage::MapClick { lat, lng, title } => {
                if !self.waypoints.is_armed() {
                    return Ok(());
                }
                let position = Coordinate::try_new(lat, lng)?;
                self.settle()?;
                let created = self.waypoints.handle_click(position, title.as_deref(), &mut self.map)?;
                self.send(ServerMessage::Armed { armed: false });
                if created.is_some() {
                    self.send_waypoints();
                }
            }
            ClientMessage::DeleteWaypoint { id } => {
                self.settle()?;
                self.waypoints.delete(&id, &mut self.map)?;
                self.send_waypoints();
            }
            ClientMessage::ClearWaypoints => {
                self.settle()?;
                self.waypoints.clear_all(&mut self.map)?;
                self.send_waypoints();
            }
        }
        Ok(())
    }

    fn open_view(&mut self) -> Result<(), TrackerError> {
        let Some(view) = RouteView::open(&self.routes)? else {
            self.status.send_replace(STATUS_NOTHING_TO_VIEW.to_string());
            self.send(ServerMessage::RouteView { point_count: 0 });
            return Ok(());
        };
        self.map.unpin_all();
        view.render(&mut self.map, self.config.zoom);
        self.waypoints.render(&mut self.map);
        self.send(ServerMessage::RouteView { point_count: view.point_count() });
        info!("Opened route view with {} points", view.point_count());
        self.view = Some(view);
        self.settle()
    }

    /// Redraws the recording surface: current marker, centre and polyline.
    /// Markers left over from the route view are torn down.
    fn show_recording(&mut self) {
        let center = self.controller.current().unwrap_or(self.config.origin);
        self.map.unpin_all();
        self.map.configure(center, self.config.zoom);
        self.map.pin(Marker::current(center));
        self.map.draw_path(self.controller.path());
        self.waypoints.render(&mut self.map);
    }

    fn render_position(&mut self, position: Coordinate) {
        self.map.pin(Marker::current(position));
        self.map.pan_to(position);
        self.map.draw_path(self.controller.path());
    }

    /// Re-derives the waypoint route from whichever path is on screen.
    fn settle(&mut self) -> Result<(), TrackerError> {
        let path = match &self.view {
            Some(view) => view.path(),
            None => self.controller.path(),
        };
        if self.waypoints.bind(path, &mut self.map)? {
            self.send_waypoints();
        }
        Ok(())
    }

    fn settle_on(&mut self, path: &[Coordinate]) -> Result<(), TrackerError> {
        if self.waypoints.bind(path, &mut self.map)? {
            self.send_waypoints();
        }
        Ok(())
    }

    fn send_routes(&self) -> Result<(), TrackerError> {
        let routes = self.routes.list_routes()?;
        self.send(ServerMessage::Routes { routes });
        Ok(())
    }

    fn send_waypoints(&self) {
        self.send(ServerMessage::Waypoints {
            route_id: self.waypoints.route_id().cloned(),
            waypoints: self.waypoints.waypoints().to_vec(),
        });
    }

    fn send(&self, message: ServerMessage) {
        if self.outbound.send(message).is_err() {
            debug!("Dropping outbound message: client gone");
        }
    }

    /// Notifies the status watchers only when the text actually changed.
    fn publish_status(&self) {
        let status = self.controller.status();
        self.status.send_if_modified(|current| {
            if current.as_str() == status {
                return false;
            }
            *current = status.to_string();
            true
        });
    }
}
