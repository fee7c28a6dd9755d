use tracing::{debug, info};
use crate::map_view::{MapView, Marker};
use crate::models::coordinate::Coordinate;
use crate::models::error::TrackerError;
use crate::models::ids::next_id;
use crate::models::route::{RouteId, Waypoint};
use crate::storage::kv::{read_json, write_json, SharedStore};

pub const MARKERS_KEY_PREFIX: &str = "customMarkers_";

pub fn markers_key(route: &RouteId) -> String {
    format!("{}{}", MARKERS_KEY_PREFIX, route)
}

/// Operator-placed markers, stored per derived `RouteId`.
///
/// Every mutation rebuilds the displayed markers from the list. Waypoints stay
/// under the id they were created with even if the path they came from is
/// cleared or changes.
pub struct WaypointManager {
    store: SharedStore,
    route_id: Option<RouteId>,
    waypoints: Vec<Waypoint>,
    armed: bool,
}

impl WaypointManager {
    pub fn new(store: SharedStore) -> Self {
        Self { store, route_id: None, waypoints: Vec::new(), armed: false }
    }

    pub fn route_id_for(path: &[Coordinate]) -> Option<RouteId> {
        RouteId::for_path(path)
    }

    pub fn route_id(&self) -> Option<&RouteId> {
        self.route_id.as_ref()
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Points the manager at the waypoints of `path`. Returns whether the id changed.
    pub fn bind(&mut self, path: &[Coordinate], map: &mut dyn MapView) -> Result<bool, TrackerError> {
        let route_id = Self::route_id_for(path);
        if route_id == self.route_id {
            return Ok(false);
        }
        self.waypoints = match &route_id {
            Some(id) => read_json(self.store.as_ref(), &markers_key(id))?.unwrap_or_default(),
            None => Vec::new(),
        };
        debug!("Bound waypoints to {:?} ({} loaded)", route_id, self.waypoints.len());
        self.route_id = route_id;
        self.render(map);
        Ok(true)
    }

    pub fn add(&mut self, position: Coordinate, title: &str, map: &mut dyn MapView)
               -> Result<Option<Waypoint>, TrackerError> {
        let Some(route_id) = &self.route_id else {
            debug!("Not adding waypoint {:?}: no current route", title);
            return Ok(None);
        };
        let waypoint = Waypoint { id: next_id(), position, title: title.to_string() };
        let mut updated = self.waypoints.clone();
        updated.push(waypoint.clone());
        write_json(self.store.as_ref(), &markers_key(route_id), &updated)?;
        info!("Added waypoint {} {:?} to {}", waypoint.id, waypoint.title, route_id);
        self.waypoints = updated;
        self.render(map);
        Ok(Some(waypoint))
    }

    pub fn delete(&mut self, id: &str, map: &mut dyn MapView) -> Result<bool, TrackerError> {
        let mut removed = false;
        if let Some(route_id) = &self.route_id {
            let remaining: Vec<Waypoint> = self.waypoints.iter().filter(|w| w.id != id).cloned().collect();
            if remaining.len() != self.waypoints.len() {
                write_json(self.store.as_ref(), &markers_key(route_id), &remaining)?;
                info!("Deleted waypoint {} from {}", id, route_id);
                self.waypoints = remaining;
                removed = true;
            }
        }
        self.render(map);
        Ok(removed)
    }

    /// Empties the list and removes the persisted record entirely.
    pub fn clear_all(&mut self, map: &mut dyn MapView) -> Result<(), TrackerError> {
        if let Some(route_id) = &self.route_id {
            self.store.remove(&markers_key(route_id))?;
            info!("Cleared waypoints of {}", route_id);
        }
        self.waypoints.clear();
        self.render(map);
        Ok(())
    }

    pub fn arm(&mut self) {
        self.armed = true;
    }

    /// Consumes one click while armed, then disarms. `title` is the operator's
    /// answer to the title prompt; `None` means the prompt was dismissed.
    pub fn handle_click(&mut self, position: Coordinate, title: Option<&str>, map: &mut dyn MapView)
                        -> Result<Option<Waypoint>, TrackerError> {
        if !self.armed {
            return Ok(None);
        }
        self.armed = false;
        match title {
            Some(title) => self.add(position, title, map),
            None => Ok(None),
        }
    }

    /// Tears down every marker the map holds and places the waypoints again.
    pub fn render(&self, map: &mut dyn MapView) {
        map.remove_all_markers();
        for waypoint in &self.waypoints {
            map.set_marker(Marker::labelled(&waypoint.id, waypoint.position, &waypoint.title));
        }
    }
}
