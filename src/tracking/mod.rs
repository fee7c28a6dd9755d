pub mod controller;
pub mod live_source;
pub mod manual_source;
pub mod path_recorder;
pub mod source;
pub(crate) mod task;
