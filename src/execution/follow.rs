// src/execution/follow.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::config::FollowerParameters;
use crate::execution::actuation::{BoundedActuation, CancelToken};
use crate::models::follower::{CycleOutcome, TrajectoryFollower};
use crate::models::pose::VehicleState;
use crate::models::state::StateFeed;
use crate::models::trajectory::SolvedTrajectory;

/// 追従タスクの外部から見える状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FollowerStatus {
    /// 軌道を保持して追従中か
    pub following: bool,
    /// 終端まで追従し終えた軌道の累計数
    pub completed: u64,
}

/// 一定周期で軌道追従の速度指令を出すタスク
///
/// ゴール実行とは独立に動き、最適化器からの軌道を受け取るたびに置き換える。
pub struct FollowerTask {
    drone_id: u32,
    period: Duration,
    follower: TrajectoryFollower,
    trajectories: mpsc::Receiver<SolvedTrajectory>,
    vehicle: Arc<StateFeed<VehicleState>>,
    actuation: BoundedActuation,
    status: watch::Sender<FollowerStatus>,
}

impl FollowerTask {
    pub fn new(
        drone_id: u32,
        params: &FollowerParameters,
        trajectories: mpsc::Receiver<SolvedTrajectory>,
        vehicle: Arc<StateFeed<VehicleState>>,
        actuation: BoundedActuation,
    ) -> Self {
        Self {
            drone_id,
            period: params.period(),
            follower: TrajectoryFollower::new(params.look_ahead),
            trajectories,
            vehicle,
            actuation,
            status: watch::Sender::new(FollowerStatus::default()),
        }
    }

    pub fn status(&self) -> watch::Receiver<FollowerStatus> {
        self.status.subscribe()
    }

    /// 受信済みの軌道のうち最新のものだけを採用する
    fn take_newest(&mut self) {
        let mut newest = None;
        loop {
            match self.trajectories.try_recv() {
                Ok(trajectory) => newest = Some(trajectory),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if let Some(trajectory) = newest {
            self.follower.replace(trajectory);
        }
    }

    /// 1制御周期
    pub async fn step(&mut self) -> CycleOutcome {
        self.take_newest();
        let outcome = self.command().await;

        let following = self.follower.is_following();
        let completed = matches!(outcome, CycleOutcome::Completed(_));
        self.status.send_if_modified(|status| {
            let changed = completed || status.following != following;
            status.following = following;
            if completed {
                status.completed += 1;
            }
            changed
        });
        outcome
    }

    async fn command(&mut self) -> CycleOutcome {
        if !self.follower.is_following() {
            return CycleOutcome::Idle;
        }
        let vehicle = match self.vehicle.latest() {
            Ok(vehicle) => vehicle,
            Err(e) => {
                warn!(drone = self.drone_id, error = %e, "skipping control cycle");
                return CycleOutcome::Idle;
            }
        };

        let outcome = self.follower.cycle(&vehicle.position);
        if let CycleOutcome::Command(velocity) | CycleOutcome::Completed(velocity) = &outcome {
            if let Err(e) = self.actuation.set_velocity(velocity).await {
                warn!(drone = self.drone_id, error = %e, "set_velocity failed");
            }
        }
        outcome
    }

    /// 停止要求が来るまで周期実行する
    pub async fn run(mut self, mut shutdown: CancelToken) {
        info!(drone = self.drone_id, "waiting for trajectory");
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if let CycleOutcome::Completed(_) = self.step().await {
                info!(drone = self.drone_id, "waiting for trajectory");
            }
        }
    }
}
