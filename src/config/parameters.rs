// src/config/parameters.rs

use std::time::Duration;

use serde::Deserialize;

use super::{positive, positive_seconds, ConfigError};

const DEFAULT_ACTUATION_LIMIT: Duration = Duration::from_secs(30);
const DEFAULT_PERIOD: Duration = Duration::from_millis(100);

/// ショット実行ノードのパラメータ
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ShotExecuterParameters {
    pub drone_id: u32,
    pub time_horizon: usize,        // 予測サンプル数 H
    pub step_size: f64,             // 予測刻み Δt (s)
    pub bearing_angle: f64,         // カメラ相対方位角 (rad)
    pub extrapolate_altitude: bool, // 高度方向も外挿するか
    pub actuation_timeout: f64,     // アクチュエーション呼び出しの上限 (s)
    pub reach_tolerance: f64,       // 目標姿勢到達判定距離 (m)
    pub follower: FollowerParameters,
}

/// 軌道追従コントローラのパラメータ
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FollowerParameters {
    pub look_ahead: f64,   // ルックアヘッド距離 L (m)
    pub control_rate: f64, // 制御周期 (Hz)
}

impl Default for ShotExecuterParameters {
    fn default() -> Self {
        Self {
            drone_id: 1,
            time_horizon: 8,
            step_size: 0.5,
            bearing_angle: -0.9,
            extrapolate_altitude: false,
            actuation_timeout: 30.0,
            reach_tolerance: 2.0,
            follower: FollowerParameters::default(),
        }
    }
}

impl Default for FollowerParameters {
    fn default() -> Self {
        Self {
            look_ahead: 1.0,
            control_rate: 10.0,
        }
    }
}

impl ShotExecuterParameters {
    /// 値の範囲チェック
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_horizon == 0 {
            return Err(ConfigError::Invalid("time_horizon", "1 以上が必要です"));
        }
        positive("step_size", self.step_size)?;
        if !self.bearing_angle.is_finite() {
            return Err(ConfigError::Invalid("bearing_angle", "有限値が必要です"));
        }
        positive_seconds("actuation_timeout", self.actuation_timeout)?;
        positive("reach_tolerance", self.reach_tolerance)?;
        self.follower.validate()
    }

    /// アクチュエーション呼び出しの上限。不正な値なら既定値
    pub fn actuation_limit(&self) -> Duration {
        positive_seconds("actuation_timeout", self.actuation_timeout).unwrap_or(DEFAULT_ACTUATION_LIMIT)
    }
}

impl FollowerParameters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("follower.look_ahead", self.look_ahead)?;
        positive("follower.control_rate", self.control_rate)?;
        positive_seconds("follower.control_rate", 1.0 / self.control_rate)?;
        Ok(())
    }

    /// 制御周期。不正な値なら既定値
    pub fn period(&self) -> Duration {
        positive("follower.control_rate", self.control_rate)
            .and_then(|rate| positive_seconds("follower.control_rate", 1.0 / rate))
            .unwrap_or(DEFAULT_PERIOD)
    }
}
