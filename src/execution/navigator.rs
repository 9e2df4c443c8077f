// src/execution/navigator.rs

use std::sync::Arc;

use nalgebra::{UnitQuaternion, Vector3};
use tracing::{info, warn};

use crate::error::ShotError;
use crate::execution::actuation::{BoundedActuation, CancelToken};
use crate::models::pose::{Pose, VehicleState};
use crate::models::state::StateFeed;

/// ウェイポイント移動の結果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavigationReport {
    /// 移動に失敗したウェイポイントの添字
    pub failed_waypoints: Vec<usize>,
    /// 最終ヨー合わせの結果。要求がなければ `None`
    pub yaw_aligned: Option<bool>,
}

impl NavigationReport {
    pub fn achieved(&self) -> bool {
        self.failed_waypoints.is_empty() && self.yaw_aligned != Some(false)
    }
}

/// 経路の各点を順に移動し、必要なら最後にヨーを合わせる
pub struct WaypointNavigator {
    drone_id: u32,
    actuation: BoundedActuation,
    vehicle: Arc<StateFeed<VehicleState>>,
}

impl WaypointNavigator {
    pub fn new(drone_id: u32, actuation: BoundedActuation, vehicle: Arc<StateFeed<VehicleState>>) -> Self {
        Self {
            drone_id,
            actuation,
            vehicle,
        }
    }

    /// # 引数
    /// - `path`: 順に通過する点
    /// - `final_yaw`: 最終点で合わせるヨー姿勢
    /// - `cancel`: キャンセル要求
    ///
    /// # 戻り値
    /// - 途中の失敗は記録して次の点へ進む。キャンセルと状態未受信はエラー
    pub async fn navigate(
        &self,
        path: &[Vector3<f64>],
        final_yaw: Option<UnitQuaternion<f64>>,
        cancel: &mut CancelToken,
    ) -> Result<NavigationReport, ShotError> {
        let mut report = NavigationReport::default();

        for (index, point) in path.iter().enumerate() {
            // 途中では姿勢を回さず、現在の機体姿勢を引き継ぐ
            let waypoint = Pose {
                position: *point,
                orientation: self.vehicle.latest()?.orientation,
            };
            match self.actuation.go_to_waypoint(&waypoint, cancel).await {
                Ok(()) => info!(drone = self.drone_id, index, "waypoint reached"),
                Err(ShotError::Cancelled) => return Err(ShotError::Cancelled),
                Err(e) => {
                    warn!(drone = self.drone_id, index, error = %e, "go_to_waypoint failed");
                    report.failed_waypoints.push(index);
                }
            }
        }

        let Some(yaw) = final_yaw else {
            info!(drone = self.drone_id, "finish go to waypoint");
            return Ok(report);
        };

        let position = match path.last() {
            Some(last) => *last,
            None => self.vehicle.latest()?.position,
        };
        info!(drone = self.drone_id, "aligning final yaw");
        let waypoint = Pose {
            position,
            orientation: yaw,
        };
        match self.actuation.go_to_waypoint(&waypoint, cancel).await {
            Ok(()) => report.yaw_aligned = Some(true),
            Err(ShotError::Cancelled) => return Err(ShotError::Cancelled),
            Err(e) => {
                warn!(drone = self.drone_id, error = %e, "final yaw alignment failed");
                report.yaw_aligned = Some(false);
            }
        }
        Ok(report)
    }
}
