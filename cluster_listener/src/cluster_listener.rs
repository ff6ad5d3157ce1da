mod cluster_listener_actor;
mod cluster_listener_builder;
mod cluster_listener_error;
mod cluster_listener_handle;
mod cluster_listener_helpers;

pub use cluster_listener_actor::*;
pub use cluster_listener_builder::*;
pub use cluster_listener_error::*;
pub use cluster_listener_handle::*;
pub use cluster_listener_helpers::*;
