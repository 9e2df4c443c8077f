// src/models/mod.rs

pub mod follower;
pub mod goal;
pub mod pose;
pub mod predictor;
pub mod shot;
pub mod state;
pub mod trajectory;

pub use follower::{CycleOutcome, TrajectoryFollower};
pub use goal::{ActionGoal, ActionType, ExecutionResult, ShootingAction, ShootingSpec};
pub use pose::{DesiredPose, KinematicState, Pose, TargetState, VehicleState};
pub use predictor::TargetPredictor;
pub use shot::{ManeuverType, ShotCalculator};
pub use state::StateFeed;
pub use trajectory::{PredictedTargetTrajectory, SolvedTrajectory, TrajectorySample};
