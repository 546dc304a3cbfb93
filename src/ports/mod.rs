//! Port traits: the narrow interfaces the domain uses to reach collaborators.

pub mod config_port;
pub mod data_port;
pub mod notify_port;
pub mod persistence_port;
pub mod report_port;
