// src/simulation/optimizer.rs

use std::sync::Arc;
use std::time::Duration;

use nalgebra::Vector3;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::error::ShotError;
use crate::execution::{CancelToken, FollowerStatus, GoalDispatcher, ShotRequest};
use crate::models::pose::{DesiredPose, VehicleState};
use crate::models::state::StateFeed;
use crate::models::trajectory::SolvedTrajectory;

/// 現在位置から目標位置までの直線軌道を作る最適化器の代役
pub struct StraightLineOptimizer {
    pub samples: usize,
    pub cruise_speed: f64,
    pub reach_tolerance: f64,
    pub ack_timeout: Duration,
}

impl StraightLineOptimizer {
    /// 直線軌道の生成
    ///
    /// # 引数
    /// - `from`: 機体の現在位置
    /// - `desired`: ショット形状計算の出力
    ///
    /// # 戻り値
    /// - 等間隔の位置列。速度は巡航速度で、終端のみ目標速度
    pub fn solve(&self, from: &Vector3<f64>, desired: &DesiredPose) -> Result<SolvedTrajectory, ShotError> {
        let offset = desired.position - from;
        let n = self.samples.max(2);
        let cruise = offset.try_normalize(1e-9).unwrap_or_else(Vector3::zeros) * self.cruise_speed;

        let positions = (0..n)
            .map(|i| from + offset * (i as f64 / (n - 1) as f64))
            .collect();
        let velocities = (0..n)
            .map(|i| if i + 1 == n { desired.linear_velocity } else { cruise })
            .collect();
        SolvedTrajectory::new(positions, velocities)
    }

    /// 目標姿勢を受け取るたびに軌道を配信し、追従が終わったら撮影完了を通知する
    ///
    /// # 引数
    /// - `follower`: 追従タスクの状態。終端まで追従した軌道数の増加を完了とみなす
    pub async fn run(
        self,
        mut requests: mpsc::Receiver<ShotRequest>,
        trajectories: mpsc::Sender<SolvedTrajectory>,
        mut follower: watch::Receiver<FollowerStatus>,
        vehicle: Arc<StateFeed<VehicleState>>,
        dispatcher: Arc<GoalDispatcher>,
        mut shutdown: CancelToken,
    ) {
        let mut next = None;
        loop {
            let request = match next.take() {
                Some(request) => request,
                None => tokio::select! {
                    _ = shutdown.cancelled() => break,
                    request = requests.recv() => match request {
                        Some(request) => request,
                        None => break,
                    },
                },
            };
            let ShotRequest { id, desired } = request;
            let current = match vehicle.latest() {
                Ok(state) => state.position,
                Err(e) => {
                    warn!(error = %e, "cannot solve without vehicle pose");
                    dispatcher.acknowledge_shot(id, false).await;
                    continue;
                }
            };
            let trajectory = match self.solve(&current, &desired) {
                Ok(trajectory) => trajectory,
                Err(e) => {
                    warn!(error = %e, "solver failed");
                    dispatcher.acknowledge_shot(id, false).await;
                    continue;
                }
            };
            if !trajectory.reaches(&desired.position, self.reach_tolerance) {
                warn!("solved trajectory does not reach the desired pose");
            }
            info!(samples = trajectory.len(), "trajectory solved");
            let completed_before = follower.borrow_and_update().completed;
            if trajectories.send(trajectory).await.is_err() {
                break;
            }

            let followed = tokio::select! {
                _ = shutdown.cancelled() => break,
                newer = requests.recv() => match newer {
                    Some(newer) => {
                        info!(shot = id, "superseded by a newer shot");
                        next = Some(newer);
                        continue;
                    }
                    None => break,
                },
                followed = async {
                    let waited = tokio::time::timeout(
                        self.ack_timeout,
                        follower.wait_for(|status| status.completed > completed_before),
                    )
                    .await;
                    matches!(waited, Ok(Ok(_)))
                } => followed,
            };
            let reached = followed && self.is_reached(&vehicle, &desired.position);
            if !reached {
                warn!("desired pose was not reached");
            }
            dispatcher.acknowledge_shot(id, reached).await;
        }
    }

    fn is_reached(&self, vehicle: &StateFeed<VehicleState>, desired: &Vector3<f64>) -> bool {
        vehicle
            .latest()
            .map_or(false, |state| (state.position - desired).norm() < self.reach_tolerance)
    }
}
