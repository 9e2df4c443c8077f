// src/models/pose.rs

use nalgebra::{UnitQuaternion, Vector3};

/// 位置・姿勢・速度をまとめた運動状態
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicState {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
    pub linear_velocity: Vector3<f64>,
}

/// 機体の最新状態
pub type VehicleState = KinematicState;

/// 撮影対象の最新状態
pub type TargetState = KinematicState;

impl KinematicState {
    pub fn at_rest(position: Vector3<f64>) -> Self {
        Self {
            position,
            orientation: UnitQuaternion::identity(),
            linear_velocity: Vector3::zeros(),
        }
    }
}

/// ウェイポイント指令に使う位置と姿勢
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

/// ショット形状計算の出力。最適化器に一度だけ配信される。
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredPose {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
    pub linear_velocity: Vector3<f64>,
}
