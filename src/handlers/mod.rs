pub mod events;
pub mod session_actor;
pub mod websocket_actor;
