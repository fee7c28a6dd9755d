use std::fmt::{Display, Formatter};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PositionErrorKind {
    PermissionDenied = 1,
    PositionUnavailable = 2,
    Timeout = 3,
}

impl PositionErrorKind {
    /// Maps a platform error code. Unknown codes are reported as unavailable.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => PositionErrorKind::PermissionDenied,
            3 => PositionErrorKind::Timeout,
            _ => PositionErrorKind::PositionUnavailable,
        }
    }
}

/// A recoverable error reported by a position source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionError {
    pub kind: PositionErrorKind,
    pub message: String,
}

impl PositionError {
    pub fn new(kind: PositionErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl Display for PositionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PositionError {}

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("location sensing is not supported on this platform")]
    PlatformUnsupported,

    #[error("GPS error: {0}")]
    Position(#[from] PositionError),

    #[error("invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("unknown direction key {0:?}")]
    UnknownDirection(String),

    #[error("storage failure: {0}")]
    Storage(#[from] std::io::Error),

    #[error("failed to encode record: {0}")]
    Serialize(#[from] serde_json::Error),
}
