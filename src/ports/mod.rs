//! Boundaries between the replay kernel and the outside world.

pub mod config_port;
pub mod data_port;
pub mod report_port;
