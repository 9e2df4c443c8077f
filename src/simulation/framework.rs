// src/simulation/framework.rs

use std::io::Write;
use std::sync::Arc;

use nalgebra::{UnitQuaternion, Vector3};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::config::scenario::{GoalInstance, Mission};
use crate::config::{ConfigError, ShotExecuterParameters};
use crate::execution::{BoundedActuation, CancelToken, FollowerTask, GoalDispatcher};
use crate::models::goal::{
    no_final_yaw, ActionGoal, ExecutionResult, ShootingAction, ShootingParameter, ShootingRole,
};
use crate::models::pose::{TargetState, VehicleState};
use crate::models::state::StateFeed;
use crate::simulation::csv::{create_csv_row, write_csv_header};
use crate::simulation::optimizer::StraightLineOptimizer;
use crate::simulation::vehicle::SimulatedVehicle;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("ミッションが {0} 秒以内に終わりませんでした。")]
    Timeout(f64),
    #[error("ログの書き込みに失敗しました: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// シナリオのゴール定義をゴールに変換する
pub fn build_goal(instance: &GoalInstance) -> ActionGoal {
    let shooting = instance.shooting.as_ref().map(|s| ShootingAction {
        roles: vec![ShootingRole {
            shooting_type: s.maneuver,
            parameters: s
                .parameters
                .iter()
                .map(|p| ShootingParameter {
                    param: p.param.clone(),
                    value: p.value,
                })
                .collect(),
        }],
    });

    ActionGoal {
        action_type: instance.action,
        path: instance.path.iter().map(|p| Vector3::from(*p)).collect(),
        final_yaw: instance.final_yaw.map_or_else(no_final_yaw, |yaw| {
            UnitQuaternion::from_euler_angles(0.0, 0.0, yaw).into_inner()
        }),
        shooting,
    }
}

/// 撮影対象の等速運動
fn advance_target(target: &TargetState, dt: f64) -> TargetState {
    TargetState {
        position: target.position + target.linear_velocity * dt,
        ..target.clone()
    }
}

/// ミッションをシミュレーション上で実行する
///
/// # 引数
/// - `params`: ショット実行パラメータ
/// - `mission`: ミッション定義
/// - `writer`: 周期ごとの状態を書き出すCSV出力先
///
/// # 戻り値
/// - ゴールごとの終了報告
pub async fn run_mission<W: Write>(
    params: &ShotExecuterParameters,
    mission: &Mission,
    writer: &mut W,
) -> Result<Vec<ExecutionResult>, SimulationError> {
    params.validate()?;
    mission.validate()?;
    let step = mission.step()?;

    let vehicle_feed = Arc::new(StateFeed::new("vehicle"));
    let target_feed = Arc::new(StateFeed::new("target"));

    let initial = VehicleState {
        position: Vector3::from(mission.vehicle.initial_position),
        orientation: UnitQuaternion::from_euler_angles(0.0, 0.0, mission.vehicle.initial_yaw),
        linear_velocity: Vector3::zeros(),
    };
    let sim = Arc::new(SimulatedVehicle::new(initial, mission.vehicle.cruise_speed, vehicle_feed.clone()));
    let mut target = TargetState {
        position: Vector3::from(mission.target.initial_position),
        orientation: UnitQuaternion::identity(),
        linear_velocity: Vector3::from(mission.target.velocity),
    };
    target_feed.publish(target.clone());

    let (pose_tx, pose_rx) = mpsc::channel(4);
    let (trajectory_tx, trajectory_rx) = mpsc::channel(4);
    let dispatcher = Arc::new(GoalDispatcher::new(
        params,
        sim.clone(),
        vehicle_feed.clone(),
        target_feed.clone(),
        pose_tx,
    ));

    let timeout = params.actuation_limit();
    let follower = FollowerTask::new(
        params.drone_id,
        &params.follower,
        trajectory_rx,
        vehicle_feed.clone(),
        BoundedActuation::new(sim.clone(), timeout),
    );
    let optimizer = StraightLineOptimizer {
        samples: params.time_horizon,
        cruise_speed: mission.vehicle.cruise_speed,
        reach_tolerance: params.reach_tolerance,
        ack_timeout: timeout,
    };

    let follower_status = follower.status();
    let (stop_tx, stop_rx) = watch::channel(false);
    let follower_task = tokio::spawn(follower.run(CancelToken::new(stop_rx.clone())));
    let optimizer_task = tokio::spawn(optimizer.run(
        pose_rx,
        trajectory_tx,
        follower_status.clone(),
        vehicle_feed.clone(),
        dispatcher.clone(),
        CancelToken::new(stop_rx),
    ));

    let goals: Vec<ActionGoal> = mission.goals.iter().map(build_goal).collect();
    let sequence = {
        let dispatcher = dispatcher.clone();
        async move {
            let mut results = Vec::with_capacity(goals.len());
            for goal in goals {
                let result = dispatcher.submit(goal).await.result().await;
                info!(achieved = result.achieved, "goal finished");
                results.push(result);
            }
            results
        }
    };
    tokio::pin!(sequence);

    write_csv_header(writer)?;
    let mut ticker = tokio::time::interval(step);
    let mut time = 0.0;
    let outcome = loop {
        tokio::select! {
            results = &mut sequence => break Ok(results),
            _ = ticker.tick() => {
                sim.integrate(mission.time_step).await;
                target = advance_target(&target, mission.time_step);
                target_feed.publish(target.clone());
                time += mission.time_step;

                if let Ok(vehicle) = vehicle_feed.latest() {
                    let following = follower_status.borrow().following;
                    let row = create_csv_row(time, &vehicle, &target, following);
                    writer.write_all(row.as_bytes())?;
                }
                if time > mission.duration {
                    dispatcher.cancel().await;
                    break Err(SimulationError::Timeout(mission.duration));
                }
            }
        }
    };

    stop_tx.send_replace(true);
    let _ = follower_task.await;
    let _ = optimizer_task.await;
    writer.flush()?;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::scenario::{ParameterInstance, ShootingInstance};
    use crate::models::goal::ActionType;

    #[test]
    fn test_build_goal_without_yaw() {
        let goal = build_goal(&GoalInstance {
            action: ActionType::GotoWaypoint,
            path: vec![[1.0, 2.0, 3.0]],
            final_yaw: None,
            shooting: None,
        });

        assert_eq!(goal.path, vec![Vector3::new(1.0, 2.0, 3.0)]);
        assert!(goal.requested_final_yaw().is_none());
    }

    #[test]
    fn test_build_shooting_goal() {
        let goal = build_goal(&GoalInstance {
            action: ActionType::Shooting,
            path: vec![],
            final_yaw: Some(0.5),
            shooting: Some(ShootingInstance {
                maneuver: 4,
                parameters: vec![ParameterInstance {
                    param: "y_0".to_string(),
                    value: 6.0,
                }],
            }),
        });

        let spec = goal.shooting.unwrap().spec().unwrap();
        assert_eq!(spec.maneuver_type, 4);
        assert_eq!(spec.parameters["y_0"], 6.0);
    }
}
