// src/error.rs

use thiserror::Error;

/// アクチュエーション（機体抽象化層）呼び出しの失敗
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActuationError {
    #[error("{0} サービスが利用できません。")]
    Unavailable(&'static str),
    #[error("{operation} が拒否されました: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },
}

/// ゴール実行および制御周期で発生するエラー
///
/// `ExecutionResult` に格納して返すため `Clone` を実装する。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShotError {
    #[error("撮影ゴールに shooting role がありません。")]
    MissingShootingRole,
    #[error("撮影パラメータ `{0}` がありません。")]
    MissingParameter(String),
    #[error("経路が空です。")]
    EmptyPath,
    #[error("予測軌道が空です。")]
    EmptyTrajectory,
    #[error("未対応のマニューバ種別です: {0}")]
    UnrecognizedManeuver(u8),
    #[error("{0} の状態をまだ受信していません。")]
    NotReady(&'static str),
    #[error(transparent)]
    Actuation(#[from] ActuationError),
    #[error("{0} がタイムアウトしました。")]
    Timeout(&'static str),
    #[error("ゴールがキャンセルされました。")]
    Cancelled,
    #[error("目標姿勢の配信先が閉じています。")]
    PublishFailed,
    #[error("軌道の位置数 {positions} と速度数 {velocities} が一致しません。")]
    MismatchedTrajectory { positions: usize, velocities: usize },
}
