// src/models/goal.rs

use std::collections::HashMap;

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::Deserialize;

use crate::error::ShotError;

/// ヨー指定なしを表す番兵クォータニオン（全成分ゼロ）
pub fn no_final_yaw() -> Quaternion<f64> {
    Quaternion::new(0.0, 0.0, 0.0, 0.0)
}

/// ゴールの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Takeoff,
    Land,
    GotoWaypoint,
    Shooting,
}

/// 撮影パラメータ（名前と値の組）
#[derive(Debug, Clone, PartialEq)]
pub struct ShootingParameter {
    pub param: String,
    pub value: f64,
}

/// 撮影ロール。`shooting_type` はマニューバ種別コード。
#[derive(Debug, Clone, PartialEq)]
pub struct ShootingRole {
    pub shooting_type: u8,
    pub parameters: Vec<ShootingParameter>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShootingAction {
    pub roles: Vec<ShootingRole>,
}

/// ショット形状計算への入力
#[derive(Debug, Clone, PartialEq)]
pub struct ShootingSpec {
    pub maneuver_type: u8,
    pub parameters: HashMap<String, f64>,
}

impl ShootingAction {
    /// 先頭ロールからショット指定を取り出す。同名パラメータは後勝ち。
    pub fn spec(&self) -> Result<ShootingSpec, ShotError> {
        let role = self.roles.first().ok_or(ShotError::MissingShootingRole)?;
        let parameters = role
            .parameters
            .iter()
            .map(|p| (p.param.clone(), p.value))
            .collect();
        Ok(ShootingSpec {
            maneuver_type: role.shooting_type,
            parameters,
        })
    }
}

/// ミッションコーディネータから届く高レベルゴール。受理後は不変。
#[derive(Debug, Clone, PartialEq)]
pub struct ActionGoal {
    pub action_type: ActionType,
    pub path: Vec<Vector3<f64>>,
    pub final_yaw: Quaternion<f64>,
    pub shooting: Option<ShootingAction>,
}

impl ActionGoal {
    pub fn takeoff(height: f64) -> Self {
        Self {
            action_type: ActionType::Takeoff,
            path: vec![Vector3::new(0.0, 0.0, height)],
            final_yaw: no_final_yaw(),
            shooting: None,
        }
    }

    pub fn land() -> Self {
        Self {
            action_type: ActionType::Land,
            path: Vec::new(),
            final_yaw: no_final_yaw(),
            shooting: None,
        }
    }

    pub fn goto_waypoint(path: Vec<Vector3<f64>>, final_yaw: Option<UnitQuaternion<f64>>) -> Self {
        Self {
            action_type: ActionType::GotoWaypoint,
            path,
            final_yaw: final_yaw.map_or_else(no_final_yaw, |q| q.into_inner()),
            shooting: None,
        }
    }

    pub fn shooting(action: ShootingAction) -> Self {
        Self {
            action_type: ActionType::Shooting,
            path: Vec::new(),
            final_yaw: no_final_yaw(),
            shooting: Some(action),
        }
    }

    /// 番兵でなければ正規化したヨー姿勢を返す
    pub fn requested_final_yaw(&self) -> Option<UnitQuaternion<f64>> {
        if self.final_yaw == no_final_yaw() {
            None
        } else {
            Some(UnitQuaternion::from_quaternion(self.final_yaw))
        }
    }
}

/// ゴールごとに一度だけ返される終了報告
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionResult {
    pub achieved: bool,
    /// 失敗したウェイポイントの添字
    pub failed_waypoints: Vec<usize>,
    pub error: Option<ShotError>,
}

impl ExecutionResult {
    pub fn achieved() -> Self {
        Self {
            achieved: true,
            ..Default::default()
        }
    }

    pub fn failed(error: ShotError) -> Self {
        Self {
            achieved: false,
            failed_waypoints: Vec::new(),
            error: Some(error),
        }
    }
}
