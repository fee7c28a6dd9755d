//! Route tracking core: live or simulated position sources feeding a recorded
//! path, with persisted routes and per-route waypoints.

pub mod config;
pub mod handlers;
pub mod map_view;
pub mod models;
pub mod server;
pub mod storage;
pub mod tracking;
