// src/models/trajectory.rs

use nalgebra::Vector3;

use crate::error::ShotError;

/// 軌道上の1サンプル
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectorySample {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

/// 撮影対象の予測軌道（長さ H、間隔 Δt）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PredictedTargetTrajectory {
    pub samples: Vec<TrajectorySample>,
    pub step_size: f64,
}

impl PredictedTargetTrajectory {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&TrajectorySample> {
        self.samples.last()
    }
}

/// 最適化器が解いた軌道
///
/// 位置と速度は同じ長さであることを生成時に保証する。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SolvedTrajectory {
    positions: Vec<Vector3<f64>>,
    velocities: Vec<Vector3<f64>>,
}

impl SolvedTrajectory {
    pub fn new(
        positions: Vec<Vector3<f64>>,
        velocities: Vec<Vector3<f64>>,
    ) -> Result<Self, ShotError> {
        if positions.len() != velocities.len() {
            return Err(ShotError::MismatchedTrajectory {
                positions: positions.len(),
                velocities: velocities.len(),
            });
        }
        Ok(Self {
            positions,
            velocities,
        })
    }

    pub fn positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vector3<f64>] {
        &self.velocities
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// 軌道の終端が目標位置から `tolerance` 以内か
    pub fn reaches(&self, desired: &Vector3<f64>, tolerance: f64) -> bool {
        self.positions
            .last()
            .map_or(false, |end| (end - desired).norm() < tolerance)
    }
}
