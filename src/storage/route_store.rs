use chrono::Utc;
use tracing::{debug, info};
use crate::models::coordinate::Coordinate;
use crate::models::error::TrackerError;
use crate::models::ids::next_id;
use crate::models::route::Route;
use crate::storage::kv::{read_json, write_json, SharedStore};

pub const SAVED_ROUTES_KEY: &str = "savedRoutes";
pub const CURRENT_PATH_KEY: &str = "manualPath";
pub const ROUTE_VIEW_LOCATION: &str = "/route";

/// Saved routes plus the current-path hand-off buffer read by the route viewer.
pub struct RouteStore {
    store: SharedStore,
}

impl RouteStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn list_routes(&self) -> Result<Vec<Route>, TrackerError> {
        Ok(read_json(self.store.as_ref(), SAVED_ROUTES_KEY)?.unwrap_or_default())
    }

    /// Saves a copy of `path`. An empty path saves nothing and returns `None`.
    pub fn save_current_path(&self, name: &str, path: &[Coordinate]) -> Result<Option<Route>, TrackerError> {
        if path.is_empty() {
            debug!("Not saving route {:?}: path is empty", name);
            return Ok(None);
        }
        let mut routes = self.list_routes()?;
        let name = match name.trim() {
            "" => format!("Route {}", routes.len() + 1),
            trimmed => trimmed.to_string(),
        };
        let route = Route {
            id: next_id(),
            name,
            created_at: Utc::now(),
            path: path.to_vec(),
            point_count: path.len(),
        };
        routes.push(route.clone());
        write_json(self.store.as_ref(), SAVED_ROUTES_KEY, &routes)?;
        info!("Saved route {} ({:?}) with {} points", route.id, route.name, route.point_count);
        Ok(Some(route))
    }

    pub fn find_route(&self, id: &str) -> Result<Option<Route>, TrackerError> {
        Ok(self.list_routes()?.into_iter().find(|route| route.id == id))
    }

    /// Removes the route with `id`. Returns whether anything was removed.
    pub fn delete_route(&self, id: &str) -> Result<bool, TrackerError> {
        let mut routes = self.list_routes()?;
        let before = routes.len();
        routes.retain(|route| route.id != id);
        if routes.len() == before {
            debug!("Route {} not found, nothing to delete", id);
            return Ok(false);
        }
        write_json(self.store.as_ref(), SAVED_ROUTES_KEY, &routes)?;
        info!("Deleted route {}", id);
        Ok(true)
    }

    pub fn clear_all_routes(&self) -> Result<(), TrackerError> {
        self.store.remove(SAVED_ROUTES_KEY)?;
        self.store.remove(CURRENT_PATH_KEY)?;
        info!("Cleared all saved routes");
        Ok(())
    }

    /// Copies the route's path into the hand-off buffer and returns where to navigate.
    pub fn load_for_view(&self, route: &Route) -> Result<&'static str, TrackerError> {
        self.stage_path(&route.path)?;
        Ok(ROUTE_VIEW_LOCATION)
    }

    pub fn stage_path(&self, path: &[Coordinate]) -> Result<(), TrackerError> {
        write_json(self.store.as_ref(), CURRENT_PATH_KEY, path)
    }

    pub fn current_path(&self) -> Result<Vec<Coordinate>, TrackerError> {
        Ok(read_json(self.store.as_ref(), CURRENT_PATH_KEY)?.unwrap_or_default())
    }

    pub fn clear_current_path(&self) -> Result<(), TrackerError> {
        self.store.remove(CURRENT_PATH_KEY)
    }
}
