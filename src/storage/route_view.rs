use crate::map_view::{Marker, PinnedMapView, MapView};
use crate::models::coordinate::Coordinate;
use crate::models::error::TrackerError;
use crate::storage::route_store::RouteStore;

pub const START_MARKER: &str = "start";
pub const END_MARKER: &str = "end";

/// Read-only view of the path staged in the hand-off buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteView {
    path: Vec<Coordinate>,
}

impl RouteView {
    /// Returns `None` when nothing is staged.
    pub fn open(routes: &RouteStore) -> Result<Option<Self>, TrackerError> {
        let path = routes.current_path()?;
        Ok((!path.is_empty()).then_some(Self { path }))
    }

    pub fn path(&self) -> &[Coordinate] {
        &self.path
    }

    pub fn point_count(&self) -> usize {
        self.path.len()
    }

    /// Arithmetic mean of the points.
    pub fn center(&self) -> Coordinate {
        let n = self.path.len() as f64;
        let (lat, lng) = self.path
            .iter()
            .fold((0.0, 0.0), |(lat, lng), p| (lat + p.latitude / n, lng + p.longitude / n));
        Coordinate::new(lat, lng)
    }

    pub fn render<M: MapView>(&self, map: &mut PinnedMapView<M>, zoom: u8) {
        map.configure(self.center(), zoom);
        if let (Some(start), Some(end)) = (self.path.first(), self.path.last()) {
            map.pin(Marker::labelled(START_MARKER, *start, "start"));
            map.pin(Marker::labelled(END_MARKER, *end, "end"));
        }
        map.draw_path(&self.path);
    }
}
