// src/config/scenario.rs

use std::time::Duration;

use serde::Deserialize;

use super::{positive, positive_seconds, ConfigError};
use crate::models::goal::ActionType;

/// シミュレーションで実行するミッション
#[derive(Debug, Deserialize)]
pub struct Mission {
    pub duration: f64, // シミュレーション時間の上限 (s)
    #[serde(default = "default_time_step")]
    pub time_step: f64, // 刻み幅 (s)
    pub vehicle: VehicleInstance,
    pub target: TargetInstance,
    pub goals: Vec<GoalInstance>,
}

impl Mission {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("duration", self.duration)?;
        positive_seconds("time_step", self.time_step)?;
        positive("vehicle.cruise_speed", self.vehicle.cruise_speed)?;
        Ok(())
    }

    /// シミュレーションの刻み幅
    pub fn step(&self) -> Result<Duration, ConfigError> {
        positive_seconds("time_step", self.time_step)
    }
}

#[derive(Debug, Deserialize)]
pub struct VehicleInstance {
    pub initial_position: [f64; 3],
    #[serde(default)]
    pub initial_yaw: f64, // rad
    #[serde(default = "default_cruise_speed")]
    pub cruise_speed: f64, // ウェイポイント移動速度 (m/s)
}

#[derive(Debug, Deserialize)]
pub struct TargetInstance {
    pub initial_position: [f64; 3],
    pub velocity: [f64; 3],
}

#[derive(Debug, Deserialize)]
pub struct GoalInstance {
    pub action: ActionType,
    #[serde(default)]
    pub path: Vec<[f64; 3]>,
    #[serde(default)]
    pub final_yaw: Option<f64>, // rad、省略時はヨー指定なし
    #[serde(default)]
    pub shooting: Option<ShootingInstance>,
}

#[derive(Debug, Deserialize)]
pub struct ShootingInstance {
    pub maneuver: u8,
    #[serde(default)]
    pub parameters: Vec<ParameterInstance>,
}

#[derive(Debug, Deserialize)]
pub struct ParameterInstance {
    pub param: String,
    pub value: f64,
}

fn default_cruise_speed() -> f64 {
    2.0
}

fn default_time_step() -> f64 {
    0.1
}
