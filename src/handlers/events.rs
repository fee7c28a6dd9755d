use serde::{Deserialize, Serialize};
use tracing::warn;
use crate::map_view::MapCommand;
use crate::models::coordinate::Coordinate;
use crate::models::error::{PositionError, PositionErrorKind};
use crate::models::route::{Route, RouteId, Waypoint};
use crate::tracking::live_source::{WatchHandle, WatchOptions};

/// Operator commands, handled by the session in arrival order.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    StartLive,
    StopLive,
    EnableManual,
    DisableManual,
    KeyDown { key: String },
    KeyUp { key: String },
    SaveRoute {
        #[serde(default)]
        name: String,
    },
    ListRoutes,
    DeleteRoute { id: String },
    ClearRoutes,
    ViewRoute { id: String },
    ViewRecording,
    OpenRouteView,
    ClearViewedPath,
    CloseRouteView,
    ArmWaypoint,
    MapClick {
        lat: f64,
        lng: f64,
        #[serde(default)]
        title: Option<String>,
    },
    DeleteWaypoint { id: String },
    ClearWaypoints,
}

/// Output of the device's location watches, routed to the platform rather than the session.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum DeviceMessage {
    Position { watch_id: WatchHandle, lat: f64, lng: f64 },
    PositionError { watch_id: WatchHandle, code: u16, message: String },
}

impl DeviceMessage {
    /// Splits the message into its watch and outcome. Out-of-range fixes are
    /// reported as unavailable positions.
    pub fn into_report(self) -> (WatchHandle, Result<Coordinate, PositionError>) {
        match self {
            DeviceMessage::Position { watch_id, lat, lng } => {
                let report = Coordinate::try_new(lat, lng).map_err(|e| {
                    warn!("Watch {:?} sent {}", watch_id, e);
                    PositionError::new(PositionErrorKind::PositionUnavailable, e.to_string())
                });
                (watch_id, report)
            }
            DeviceMessage::PositionError { watch_id, code, message } => {
                (watch_id, Err(PositionError::new(PositionErrorKind::from_code(code), message)))
            }
        }
    }
}

/// Everything a client sends, kept in one stream so device reports and
/// commands reach the session in the order they were sent.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SocketMessage {
    Device(DeviceMessage),
    Client(ClientMessage),
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    Status { text: String },
    Watch { watch_id: WatchHandle, options: WatchOptions },
    ClearWatch { watch_id: WatchHandle },
    Map { command: MapCommand },
    Routes { routes: Vec<Route> },
    Saved { route: Route },
    Navigate { to: String },
    RouteView { point_count: usize },
    Waypoints { route_id: Option<RouteId>, waypoints: Vec<Waypoint> },
    Armed { armed: bool },
    Rejected { reason: String },
}
