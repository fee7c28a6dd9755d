use std::fmt::{Display, Formatter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::models::coordinate::Coordinate;

/// A saved, immutable snapshot of a recorded path.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub path: Vec<Coordinate>,
    pub point_count: usize,
}

impl Route {
    pub fn start(&self) -> Option<Coordinate> {
        self.path.first().copied()
    }

    pub fn end(&self) -> Option<Coordinate> {
        self.path.last().copied()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub id: String,
    pub position: Coordinate,
    pub title: String,
}

/// Key namespacing waypoints, derived from a path's endpoints and length.
///
/// Distinct paths that share rounded endpoints and length map to the same id.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RouteId(String);

impl RouteId {
    pub fn for_path(path: &[Coordinate]) -> Option<Self> {
        let (first, last) = (path.first()?, path.last()?);
        Some(Self(format!(
            "{:.6}_{:.6}_{:.6}_{:.6}_{}",
            first.latitude, first.longitude, last.latitude, last.longitude, path.len()
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RouteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
