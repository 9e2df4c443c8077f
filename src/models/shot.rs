// src/models/shot.rs

use std::collections::HashMap;

use nalgebra::{UnitQuaternion, Vector2, Vector3};

use crate::config::ShotExecuterParameters;
use crate::error::ShotError;
use crate::math::{rotate_planar, yaw_towards};
use crate::models::pose::DesiredPose;
use crate::models::trajectory::{PredictedTargetTrajectory, TrajectorySample};

/// ミッションメッセージで使われるショット種別コード
pub mod shooting_type {
    pub const STATIC: u8 = 0;
    pub const FLY_THROUGH: u8 = 1;
    pub const ESTABLISH: u8 = 2;
    pub const CHASE: u8 = 3;
    pub const LATERAL: u8 = 4;
    pub const FLYBY: u8 = 5;
    pub const ELEVATOR: u8 = 6;
    pub const ORBIT: u8 = 7;
}

/// 形状計算に対応しているマニューバ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManeuverType {
    Flyby,
    Lateral,
}

impl TryFrom<u8> for ManeuverType {
    type Error = ShotError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            shooting_type::FLYBY => Ok(ManeuverType::Flyby),
            shooting_type::LATERAL => Ok(ManeuverType::Lateral),
            other => Err(ShotError::UnrecognizedManeuver(other)),
        }
    }
}

/// マニューバごとに異なる部分：基準サンプルの選び方とオフセット式
struct ShotGeometry {
    reference: for<'a> fn(&'a PredictedTargetTrajectory, usize) -> Option<&'a TrajectorySample>,
    offset: fn(&HashMap<String, f64>) -> Result<Vector2<f64>, ShotError>,
}

static FLYBY: ShotGeometry = ShotGeometry {
    reference: last_sample,
    offset: flyby_offset,
};

static LATERAL: ShotGeometry = ShotGeometry {
    reference: horizon_sample,
    offset: lateral_offset,
};

impl ManeuverType {
    fn geometry(self) -> &'static ShotGeometry {
        match self {
            ManeuverType::Flyby => &FLYBY,
            ManeuverType::Lateral => &LATERAL,
        }
    }
}

fn last_sample(trajectory: &PredictedTargetTrajectory, _horizon: usize) -> Option<&TrajectorySample> {
    trajectory.last()
}

fn horizon_sample(trajectory: &PredictedTargetTrajectory, horizon: usize) -> Option<&TrajectorySample> {
    horizon.checked_sub(1).and_then(|i| trajectory.samples.get(i))
}

fn parameter(parameters: &HashMap<String, f64>, name: &str) -> Result<f64, ShotError> {
    parameters
        .get(name)
        .copied()
        .ok_or_else(|| ShotError::MissingParameter(name.to_string()))
}

fn flyby_offset(parameters: &HashMap<String, f64>) -> Result<Vector2<f64>, ShotError> {
    Ok(Vector2::new(parameter(parameters, "x_e")?, parameter(parameters, "y_0")?))
}

// x_e は使わない
fn lateral_offset(parameters: &HashMap<String, f64>) -> Result<Vector2<f64>, ShotError> {
    Ok(Vector2::new(0.0, parameter(parameters, "y_0")?))
}

/// ショット形状計算
///
/// 予測軌道上の基準サンプルに、固定のカメラ相対方位角で回転させたオフセットを
/// 加えて機体の目標姿勢を求める。高度は現在の機体高度を保持し、水平速度は基準
/// サンプルの速度に合わせる。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotCalculator {
    pub bearing_angle: f64,
    pub time_horizon: usize,
}

impl ShotCalculator {
    pub fn from_parameters(params: &ShotExecuterParameters) -> Self {
        Self {
            bearing_angle: params.bearing_angle,
            time_horizon: params.time_horizon,
        }
    }

    /// 目標姿勢を計算する純粋関数
    ///
    /// # 引数
    /// - `maneuver_type`: ショット種別コード
    /// - `parameters`: 撮影パラメータ（名前→値）
    /// - `trajectory`: 撮影対象の予測軌道
    /// - `vehicle_altitude`: 現在の機体高度
    ///
    /// # 戻り値
    /// - 目標姿勢。未対応の種別、パラメータ欠落、空の軌道ではエラー
    pub fn compute(
        &self,
        maneuver_type: u8,
        parameters: &HashMap<String, f64>,
        trajectory: &PredictedTargetTrajectory,
        vehicle_altitude: f64,
    ) -> Result<DesiredPose, ShotError> {
        let geometry = ManeuverType::try_from(maneuver_type)?.geometry();
        if trajectory.is_empty() {
            return Err(ShotError::EmptyTrajectory);
        }
        let reference =
            (geometry.reference)(trajectory, self.time_horizon).ok_or(ShotError::EmptyTrajectory)?;
        let offset = rotate_planar((geometry.offset)(parameters)?, self.bearing_angle);

        let position = Vector3::new(
            reference.position.x + offset.x,
            reference.position.y + offset.y,
            vehicle_altitude,
        );
        let orientation =
            yaw_towards(&position, &reference.position).unwrap_or_else(UnitQuaternion::identity);

        Ok(DesiredPose {
            position,
            orientation,
            linear_velocity: Vector3::new(reference.velocity.x, reference.velocity.y, 0.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pose::TargetState;
    use crate::models::predictor::TargetPredictor;
    use approx::assert_relative_eq;

    const BEARING: f64 = -0.9;

    fn calculator() -> ShotCalculator {
        ShotCalculator {
            bearing_angle: BEARING,
            time_horizon: 4,
        }
    }

    fn trajectory() -> PredictedTargetTrajectory {
        let predictor = TargetPredictor {
            time_horizon: 4,
            step_size: 1.0,
            extrapolate_altitude: false,
        };
        predictor.predict(&TargetState {
            position: Vector3::new(0.0, 0.0, 0.0),
            orientation: UnitQuaternion::identity(),
            linear_velocity: Vector3::new(2.0, 1.0, 0.5),
        })
    }

    fn params(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_zero_offset_returns_reference_position() {
        let traj = trajectory();
        let reference = traj.last().unwrap().position;

        let flyby = calculator()
            .compute(shooting_type::FLYBY, &params(&[("x_e", 0.0), ("y_0", 0.0)]), &traj, 10.0)
            .unwrap();
        let lateral = calculator()
            .compute(shooting_type::LATERAL, &params(&[("y_0", 0.0)]), &traj, 10.0)
            .unwrap();

        for pose in [&flyby, &lateral] {
            assert_relative_eq!(pose.position.x, reference.x, epsilon = 1e-12);
            assert_relative_eq!(pose.position.y, reference.y, epsilon = 1e-12);
            assert_eq!(pose.position.z, 10.0);
        }
    }

    #[test]
    fn test_flyby_rotates_offset_by_bearing() {
        let traj = trajectory();
        let pose = calculator()
            .compute(shooting_type::FLYBY, &params(&[("x_e", 5.0), ("y_0", 0.0)]), &traj, 7.0)
            .unwrap();

        // 基準は最終サンプル (6, 3)
        assert_relative_eq!(pose.position.x, 6.0 + 5.0 * BEARING.cos(), epsilon = 1e-12);
        assert_relative_eq!(pose.position.y, 3.0 + 5.0 * BEARING.sin(), epsilon = 1e-12);
        assert_eq!(pose.position.z, 7.0);
        assert_eq!(pose.linear_velocity, Vector3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn test_lateral_ignores_x_e() {
        let traj = trajectory();
        let with_x = calculator()
            .compute(shooting_type::LATERAL, &params(&[("x_e", 50.0), ("y_0", 4.0)]), &traj, 3.0)
            .unwrap();
        let without_x = calculator()
            .compute(shooting_type::LATERAL, &params(&[("y_0", 4.0)]), &traj, 3.0)
            .unwrap();

        assert_eq!(with_x, without_x);
        assert_relative_eq!(with_x.position.x, 6.0 - BEARING.sin() * 4.0, epsilon = 1e-12);
        assert_relative_eq!(with_x.position.y, 3.0 + BEARING.cos() * 4.0, epsilon = 1e-12);
        assert_eq!(with_x.linear_velocity.z, 0.0);
    }

    #[test]
    fn test_compute_is_repeatable() {
        let traj = trajectory();
        let p = params(&[("x_e", 2.0), ("y_0", -3.0)]);
        let first = calculator().compute(shooting_type::FLYBY, &p, &traj, 5.0).unwrap();
        let second = calculator().compute(shooting_type::FLYBY, &p, &traj, 5.0).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_orientation_faces_target() {
        let traj = trajectory();
        let pose = calculator()
            .compute(shooting_type::LATERAL, &params(&[("y_0", 4.0)]), &traj, 3.0)
            .unwrap();
        let reference = traj.last().unwrap().position;
        let heading = pose.orientation * Vector3::x();
        let expected = Vector3::new(reference.x - pose.position.x, reference.y - pose.position.y, 0.0).normalize();

        assert_relative_eq!(heading.x, expected.x, epsilon = 1e-9);
        assert_relative_eq!(heading.y, expected.y, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_parameter() {
        let traj = trajectory();
        let result = calculator().compute(shooting_type::FLYBY, &params(&[("y_0", 1.0)]), &traj, 0.0);

        assert_eq!(result, Err(ShotError::MissingParameter("x_e".to_string())));
    }

    #[test]
    fn test_empty_trajectory() {
        let result = calculator().compute(
            shooting_type::LATERAL,
            &params(&[("y_0", 1.0)]),
            &PredictedTargetTrajectory::default(),
            0.0,
        );

        assert_eq!(result, Err(ShotError::EmptyTrajectory));
    }

    #[test]
    fn test_unrecognized_maneuver() {
        let traj = trajectory();
        let p = params(&[("x_e", 1.0), ("y_0", 1.0)]);

        for code in [shooting_type::ORBIT, shooting_type::CHASE, 42] {
            match calculator().compute(code, &p, &traj, 0.0) {
                Err(ShotError::UnrecognizedManeuver(c)) => assert_eq!(c, code),
                other => panic!("Expected ShotError::UnrecognizedManeuver, got {:?}", other),
            }
        }
    }
}
