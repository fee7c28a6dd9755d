use std::fmt::{Display, Formatter};
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::models::error::TrackerError;

/// A WGS84 point. Serialized as `{"lat": .., "lng": ..}`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Validating constructor for points that arrive from outside the process.
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self, TrackerError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if valid {
            Ok(Self { latitude, longitude })
        } else {
            Err(TrackerError::InvalidCoordinate { lat: latitude, lng: longitude })
        }
    }

    /// Moves by the given degree offsets, clamping latitude and wrapping longitude.
    pub fn offset(self, d_lat: f64, d_lng: f64) -> Self {
        let latitude = (self.latitude + d_lat).clamp(-90.0, 90.0);
        let mut longitude = self.longitude + d_lng;
        if longitude > 180.0 {
            longitude -= 360.0;
        } else if longitude < -180.0 {
            longitude += 360.0;
        }
        Self { latitude, longitude }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// Unit step as (latitude sign, longitude sign).
    pub fn unit(self) -> (f64, f64) {
        match self {
            Direction::Up => (1.0, 0.0),
            Direction::Down => (-1.0, 0.0),
            Direction::Left => (0.0, -1.0),
            Direction::Right => (0.0, 1.0),
        }
    }
}

impl FromStr for Direction {
    type Err = TrackerError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        match key {
            "w" | "W" | "ArrowUp" => return Ok(Direction::Up),
            "s" | "S" | "ArrowDown" => return Ok(Direction::Down),
            "a" | "A" | "ArrowLeft" => return Ok(Direction::Left),
            "d" | "D" | "ArrowRight" => return Ok(Direction::Right),
            _ => {}
        }
        match key.to_ascii_lowercase().as_str() {
            "up" | "north" => Ok(Direction::Up),
            "down" | "south" => Ok(Direction::Down),
            "left" | "west" => Ok(Direction::Left),
            "right" | "east" => Ok(Direction::Right),
            _ => Err(TrackerError::UnknownDirection(key.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TrackingMode {
    #[default]
    Idle,
    Live,
    Manual,
}

impl Display for TrackingMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            TrackingMode::Idle => "Idle",
            TrackingMode::Live => "Live",
            TrackingMode::Manual => "Manual",
        };
        write!(f, "{}", tag)
    }
}
