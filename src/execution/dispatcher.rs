// src/execution/dispatcher.rs

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::ShotExecuterParameters;
use crate::error::ShotError;
use crate::execution::actuation::{Actuation, BoundedActuation, CancelToken};
use crate::execution::navigator::WaypointNavigator;
use crate::models::goal::{ActionGoal, ActionType, ExecutionResult};
use crate::models::pose::{DesiredPose, TargetState, VehicleState};
use crate::models::predictor::TargetPredictor;
use crate::models::shot::ShotCalculator;
use crate::models::state::StateFeed;

/// 最適化器へ配信する目標姿勢。完了通知は `id` で撮影ゴールと対応付ける
#[derive(Debug, Clone, PartialEq)]
pub struct ShotRequest {
    pub id: u64,
    pub desired: DesiredPose,
}

/// 完了通知を待っている撮影
struct PendingShot {
    id: u64,
    ack: oneshot::Sender<bool>,
}

type ShotAck = Arc<Mutex<Option<PendingShot>>>;

/// ゴール実行に必要なもの一式
struct ExecutionContext {
    drone_id: u32,
    actuation: BoundedActuation,
    navigator: WaypointNavigator,
    predictor: TargetPredictor,
    calculator: ShotCalculator,
    vehicle: Arc<StateFeed<VehicleState>>,
    target: Arc<StateFeed<TargetState>>,
    desired_pose: mpsc::Sender<ShotRequest>,
    shot_ack: ShotAck,
    next_shot: AtomicU64,
}

impl ExecutionContext {
    async fn execute(&self, goal: ActionGoal, mut cancel: CancelToken) -> ExecutionResult {
        let outcome = match goal.action_type {
            ActionType::Takeoff => self.take_off(&goal, &mut cancel).await,
            ActionType::Land => self.actuation.land(&mut cancel).await.map(|_| ExecutionResult::achieved()),
            ActionType::GotoWaypoint => self
                .navigator
                .navigate(&goal.path, goal.requested_final_yaw(), &mut cancel)
                .await
                .map(|report| ExecutionResult {
                    achieved: report.achieved(),
                    failed_waypoints: report.failed_waypoints,
                    error: None,
                }),
            ActionType::Shooting => self.shoot(&goal, &mut cancel).await,
        };

        match outcome {
            Ok(result) => result,
            Err(ShotError::Cancelled) => {
                warn!(drone = self.drone_id, action = ?goal.action_type, "goal preempted");
                ExecutionResult::failed(ShotError::Cancelled)
            }
            Err(e) => {
                warn!(drone = self.drone_id, action = ?goal.action_type, error = %e, "goal failed");
                ExecutionResult::failed(e)
            }
        }
    }

    async fn take_off(&self, goal: &ActionGoal, cancel: &mut CancelToken) -> Result<ExecutionResult, ShotError> {
        let height = goal.path.first().ok_or(ShotError::EmptyPath)?.z;
        self.actuation.take_off(height, cancel).await?;
        info!(drone = self.drone_id, height, "taking off");
        Ok(ExecutionResult::achieved())
    }

    /// 目標姿勢を一度だけ計算して配信し、下流からの完了通知を待つ
    async fn shoot(&self, goal: &ActionGoal, cancel: &mut CancelToken) -> Result<ExecutionResult, ShotError> {
        let spec = goal
            .shooting
            .as_ref()
            .ok_or(ShotError::MissingShootingRole)?
            .spec()?;
        let target = self.target.latest()?;
        let vehicle = self.vehicle.latest()?;

        let trajectory = self.predictor.predict(&target);
        let desired = self.calculator.compute(
            spec.maneuver_type,
            &spec.parameters,
            &trajectory,
            vehicle.position.z,
        )?;

        // 配信前に登録しておき、即座に返る完了通知を取りこぼさない
        let id = self.next_shot.fetch_add(1, Ordering::Relaxed) + 1;
        let (ack_tx, ack_rx) = oneshot::channel();
        *self.shot_ack.lock().await = Some(PendingShot { id, ack: ack_tx });

        let outcome = self.publish_and_wait(id, desired, ack_rx, cancel).await;
        self.release_shot(id).await;
        outcome.map(|achieved| ExecutionResult {
            achieved,
            ..Default::default()
        })
    }

    async fn publish_and_wait(
        &self,
        id: u64,
        desired: DesiredPose,
        ack: oneshot::Receiver<bool>,
        cancel: &mut CancelToken,
    ) -> Result<bool, ShotError> {
        let position = desired.position;
        tokio::select! {
            _ = cancel.cancelled() => return Err(ShotError::Cancelled),
            sent = self.desired_pose.send(ShotRequest { id, desired }) => {
                sent.map_err(|_| ShotError::PublishFailed)?
            }
        }
        info!(
            drone = self.drone_id,
            shot = id,
            x = position.x,
            y = position.y,
            z = position.z,
            "desired pose published"
        );

        tokio::select! {
            _ = cancel.cancelled() => Err(ShotError::Cancelled),
            ack = ack => Ok(ack.unwrap_or(false)),
        }
    }

    /// 自分の撮影の通知待ちが残っていれば取り除く
    async fn release_shot(&self, id: u64) {
        let mut slot = self.shot_ack.lock().await;
        if slot.as_ref().map_or(false, |pending| pending.id == id) {
            *slot = None;
        }
    }
}

/// 実行中のゴール
struct ActiveGoal {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ActiveGoal {
    async fn stop(self) {
        self.cancel.send_replace(true);
        let _ = self.handle.await;
    }
}

/// 受理したゴールの終了報告を受け取るハンドル
#[derive(Debug)]
pub struct GoalHandle {
    result: oneshot::Receiver<ExecutionResult>,
}

impl GoalHandle {
    pub async fn result(self) -> ExecutionResult {
        self.result
            .await
            .unwrap_or_else(|_| ExecutionResult::failed(ShotError::Cancelled))
    }
}

/// ゴールを一件ずつ非同期に実行する
///
/// 新しいゴールを受け取ると、実行中のゴールにキャンセルを要求してその終了を
/// 待ってから次を開始する。機体あたり同時に実行されるゴールは常に一つ。
pub struct GoalDispatcher {
    context: Arc<ExecutionContext>,
    active: Mutex<Option<ActiveGoal>>,
}

impl GoalDispatcher {
    pub fn new(
        params: &ShotExecuterParameters,
        actuation: Arc<dyn Actuation>,
        vehicle: Arc<StateFeed<VehicleState>>,
        target: Arc<StateFeed<TargetState>>,
        desired_pose: mpsc::Sender<ShotRequest>,
    ) -> Self {
        let actuation = BoundedActuation::new(actuation, params.actuation_limit());
        let context = ExecutionContext {
            drone_id: params.drone_id,
            navigator: WaypointNavigator::new(params.drone_id, actuation.clone(), vehicle.clone()),
            actuation,
            predictor: TargetPredictor::from_parameters(params),
            calculator: ShotCalculator::from_parameters(params),
            vehicle,
            target,
            desired_pose,
            shot_ack: Arc::new(Mutex::new(None)),
            next_shot: AtomicU64::new(0),
        };
        Self {
            context: Arc::new(context),
            active: Mutex::new(None),
        }
    }

    /// ゴールを受理して実行を開始する
    pub async fn submit(&self, goal: ActionGoal) -> GoalHandle {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            if !previous.handle.is_finished() {
                warn!(drone = self.context.drone_id, "preempting active goal");
            }
            previous.stop().await;
        }

        info!(drone = self.context.drone_id, action = ?goal.action_type, "goal accepted");
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (result_tx, result_rx) = oneshot::channel();
        let context = self.context.clone();
        let handle = tokio::spawn(async move {
            let result = context.execute(goal, CancelToken::new(cancel_rx)).await;
            let _ = result_tx.send(result);
        });
        *active = Some(ActiveGoal {
            cancel: cancel_tx,
            handle,
        });

        GoalHandle { result: result_rx }
    }

    /// 実行中のゴールをキャンセルし、終了を待つ
    pub async fn cancel(&self) {
        if let Some(previous) = self.active.lock().await.take() {
            previous.stop().await;
        }
    }

    pub async fn is_active(&self) -> bool {
        self.active
            .lock()
            .await
            .as_ref()
            .map_or(false, |goal| !goal.handle.is_finished())
    }

    /// 撮影ゴールの完了を通知する
    ///
    /// # 引数
    /// - `id`: 完了した撮影の `ShotRequest::id`
    /// - `achieved`: 目標姿勢に到達したか
    ///
    /// # 戻り値
    /// - `id` の撮影が通知を待っていれば `true`。終わった撮影や置き換えられた撮影への通知は捨てる
    pub async fn acknowledge_shot(&self, id: u64, achieved: bool) -> bool {
        let mut slot = self.context.shot_ack.lock().await;
        match slot.take() {
            Some(pending) if pending.id == id => pending.ack.send(achieved).is_ok(),
            other => {
                *slot = other;
                warn!(drone = self.context.drone_id, shot = id, "discarding stale shot acknowledgement");
                false
            }
        }
    }
}
