// src/execution/mod.rs

pub mod actuation;
pub mod dispatcher;
pub mod follow;
pub mod navigator;

pub use actuation::{Actuation, BoundedActuation, CancelToken};
pub use dispatcher::{GoalDispatcher, GoalHandle, ShotRequest};
pub use follow::{FollowerStatus, FollowerTask};
pub use navigator::{NavigationReport, WaypointNavigator};
