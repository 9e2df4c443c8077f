// src/simulation/vehicle.rs

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nalgebra::Vector3;
use tokio::sync::Mutex;

use crate::error::ActuationError;
use crate::execution::Actuation;
use crate::models::pose::{Pose, VehicleState};
use crate::models::state::StateFeed;

/// 到着判定距離 (m)
const ARRIVAL_RADIUS: f64 = 0.05;
/// 到着待ちのポーリング周期
const POLL_PERIOD: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Hover,
    Waypoint(Pose),
    Velocity(Vector3<f64>),
}

/// 運動学だけの簡易機体
///
/// ウェイポイント指令には一定速度で直進し、速度指令はそのまま積分する。
/// 状態は `integrate` のたびに機体フィードへ丸ごと配信する。
pub struct SimulatedVehicle {
    cruise_speed: f64,
    state: Mutex<(VehicleState, Mode)>,
    feed: Arc<StateFeed<VehicleState>>,
}

impl SimulatedVehicle {
    pub fn new(initial: VehicleState, cruise_speed: f64, feed: Arc<StateFeed<VehicleState>>) -> Self {
        feed.publish(initial.clone());
        Self {
            cruise_speed,
            state: Mutex::new((initial, Mode::Hover)),
            feed,
        }
    }

    /// 機体を `dt` 秒進める
    pub async fn integrate(&self, dt: f64) {
        let mut guard = self.state.lock().await;
        let (state, mode) = &mut *guard;
        match mode {
            Mode::Hover => state.linear_velocity = Vector3::zeros(),
            Mode::Waypoint(goal) => {
                let offset = goal.position - state.position;
                let step = self.cruise_speed * dt;
                if offset.norm() <= step {
                    state.position = goal.position;
                    state.linear_velocity = Vector3::zeros();
                } else {
                    state.linear_velocity = offset.normalize() * self.cruise_speed;
                    state.position += state.linear_velocity * dt;
                }
                state.orientation = goal.orientation;
            }
            Mode::Velocity(velocity) => {
                state.linear_velocity = *velocity;
                state.position += *velocity * dt;
            }
        }
        self.feed.publish(state.clone());
    }

    async fn fly_to(&self, pose: Pose) -> Result<(), ActuationError> {
        if !pose.position.iter().all(|v| v.is_finite()) {
            return Err(ActuationError::Rejected {
                operation: "go_to_waypoint",
                reason: "non-finite waypoint".to_string(),
            });
        }
        self.state.lock().await.1 = Mode::Waypoint(pose.clone());
        loop {
            {
                let guard = self.state.lock().await;
                if guard.1 != Mode::Waypoint(pose.clone()) {
                    return Err(ActuationError::Rejected {
                        operation: "go_to_waypoint",
                        reason: "superseded by another command".to_string(),
                    });
                }
                if (guard.0.position - pose.position).norm() < ARRIVAL_RADIUS {
                    return Ok(());
                }
            }
            tokio::time::sleep(POLL_PERIOD).await;
        }
    }
}

#[async_trait]
impl Actuation for SimulatedVehicle {
    async fn take_off(&self, height: f64) -> Result<(), ActuationError> {
        let current = self.state.lock().await.0.clone();
        let mut position = current.position;
        position.z = height;
        self.fly_to(Pose {
            position,
            orientation: current.orientation,
        })
        .await
    }

    async fn land(&self) -> Result<(), ActuationError> {
        let current = self.state.lock().await.0.clone();
        let mut position = current.position;
        position.z = 0.0;
        self.fly_to(Pose {
            position,
            orientation: current.orientation,
        })
        .await
    }

    async fn go_to_waypoint(&self, waypoint: &Pose) -> Result<(), ActuationError> {
        self.fly_to(waypoint.clone()).await
    }

    async fn set_velocity(&self, velocity: &Vector3<f64>) -> Result<(), ActuationError> {
        self.state.lock().await.1 = Mode::Velocity(*velocity);
        Ok(())
    }
}
