// src/models/predictor.rs

use crate::config::ShotExecuterParameters;
use crate::models::pose::TargetState;
use crate::models::trajectory::{PredictedTargetTrajectory, TrajectorySample};

/// 等速直線運動による撮影対象の軌道予測
///
/// 加速度や曲率、不確かさは扱わない。短い予測区間の目安としてのみ使う。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPredictor {
    pub time_horizon: usize,
    pub step_size: f64,
    pub extrapolate_altitude: bool,
}

impl TargetPredictor {
    pub fn from_parameters(params: &ShotExecuterParameters) -> Self {
        Self {
            time_horizon: params.time_horizon,
            step_size: params.step_size,
            extrapolate_altitude: params.extrapolate_altitude,
        }
    }

    /// 現在の対象状態から H 個のサンプルを外挿する
    ///
    /// # 引数
    /// - `target`: 撮影対象の最新スナップショット
    ///
    /// # 戻り値
    /// - `position[i] = position + i·Δt·velocity` の予測軌道（高度は指定がなければ保持）
    pub fn predict(&self, target: &TargetState) -> PredictedTargetTrajectory {
        let samples = (0..self.time_horizon)
            .map(|i| {
                let t = i as f64 * self.step_size;
                let mut position = target.position + target.linear_velocity * t;
                if !self.extrapolate_altitude {
                    position.z = target.position.z;
                }
                TrajectorySample {
                    position,
                    velocity: target.linear_velocity,
                }
            })
            .collect();

        PredictedTargetTrajectory {
            samples,
            step_size: self.step_size,
        }
    }
}
