// src/config/mod.rs

pub mod parameters;
pub mod scenario;

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

pub use parameters::{FollowerParameters, ShotExecuterParameters};
pub use scenario::Mission;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ファイルを開けません: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML の解析に失敗しました: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("パラメータ `{0}` が不正です: {1}")]
    Invalid(&'static str, &'static str),
}

/// YAML ファイルを読み込む共通関数
pub fn load_yaml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let file = File::open(path)?;
    let data: T = serde_yaml::from_reader(file)?;
    Ok(data)
}

/// ショット実行パラメータの読み込みと検証
pub fn load_parameters(path: impl AsRef<Path>) -> Result<ShotExecuterParameters, ConfigError> {
    let params: ShotExecuterParameters = load_yaml(path)?;
    params.validate()?;
    Ok(params)
}

/// ミッションの読み込みと検証
pub fn load_mission(path: impl AsRef<Path>) -> Result<Mission, ConfigError> {
    let mission: Mission = load_yaml(path)?;
    mission.validate()?;
    Ok(mission)
}

/// 有限の正の値か
pub(crate) fn positive(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::Invalid(field, "正の有限値が必要です"))
    }
}

/// 秒数を `Duration` に変換する。ゼロに丸まる値や表現できない値は不正
pub(crate) fn positive_seconds(field: &'static str, seconds: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(seconds)
        .ok()
        .filter(|duration| !duration.is_zero())
        .ok_or(ConfigError::Invalid(field, "表現できる正の秒数が必要です"))
}
