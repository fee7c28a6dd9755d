pub mod coordinate;
pub mod error;
pub mod ids;
pub mod route;
