// src/lib.rs

//! 撮影ショット実行パイプライン
//!
//! ミッションコーディネータから受け取った離陸・着陸・ウェイポイント移動・撮影
//! ゴールを一件ずつ実行し、最適化器が生成した軌道をルックアヘッド追従で速度指令に
//! 変換する。

pub mod config;
pub mod error;
pub mod execution;
pub mod math;
pub mod models;
pub mod simulation;

pub use error::{ActuationError, ShotError};
