pub mod kv;
pub mod route_store;
pub mod route_view;
pub mod waypoints;
