// src/models/follower.rs

use nalgebra::Vector3;
use tracing::{debug, info};

use crate::math::unit_or_zero;
use crate::models::trajectory::SolvedTrajectory;

/// 1制御周期の結果
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// 追従する軌道がない。指令は出さない（ホバリング指令とは区別する）
    Idle,
    /// 追従中の速度指令
    Command(Vector3<f64>),
    /// 軌道終端に達した。最終サンプルへの指令を出し、軌道を破棄した
    Completed(Vector3<f64>),
}

/// 最近傍点の添字（同距離なら先頭を優先）
pub fn nearest_index(positions: &[Vector3<f64>], current: &Vector3<f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, p) in positions.iter().enumerate() {
        let distance = (current - p).norm();
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((i, distance));
        }
    }
    best.map(|(i, _)| i)
}

/// ルックアヘッド点の添字
///
/// # 引数
/// - `positions`: 軌道の位置列
/// - `look_ahead`: ルックアヘッド距離 L
/// - `from`: 最近傍点の添字
///
/// # 戻り値
/// - 最近傍点からの距離が L 以上となる最初の添字。終端まで見つからなければ `None`
pub fn look_ahead_index(positions: &[Vector3<f64>], look_ahead: f64, from: usize) -> Option<usize> {
    let origin = positions.get(from)?;
    positions
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, p)| (*p - origin).norm() >= look_ahead)
        .map(|(i, _)| i)
}

/// 方向はルックアヘッド点へ、速さは最近傍点の速度の大きさ
pub fn pursuit_velocity(
    current: &Vector3<f64>,
    target: &Vector3<f64>,
    nearest_velocity: &Vector3<f64>,
) -> Vector3<f64> {
    unit_or_zero(&(target - current)) * nearest_velocity.norm()
}

/// ルックアヘッド追従による軌道追従コントローラ
///
/// 軌道がなければ `IDLE`、あれば `FOLLOWING`。新しい軌道は混ぜずに丸ごと置き換える。
#[derive(Debug, Clone)]
pub struct TrajectoryFollower {
    look_ahead: f64,
    buffer: Option<SolvedTrajectory>,
}

impl TrajectoryFollower {
    pub fn new(look_ahead: f64) -> Self {
        Self {
            look_ahead,
            buffer: None,
        }
    }

    pub fn is_following(&self) -> bool {
        self.buffer.is_some()
    }

    /// 追従中の軌道を置き換える。空の軌道は IDLE に戻す
    pub fn replace(&mut self, trajectory: SolvedTrajectory) {
        info!(samples = trajectory.len(), "trajectory received");
        self.buffer = if trajectory.is_empty() {
            None
        } else {
            Some(trajectory)
        };
    }

    /// 1周期分の速度指令を求める
    pub fn cycle(&mut self, current: &Vector3<f64>) -> CycleOutcome {
        let Some(trajectory) = self.buffer.as_ref() else {
            return CycleOutcome::Idle;
        };
        let positions = trajectory.positions();
        let Some(nearest) = nearest_index(positions, current) else {
            self.buffer = None;
            return CycleOutcome::Idle;
        };
        let speed_source = trajectory.velocities()[nearest];

        match look_ahead_index(positions, self.look_ahead, nearest) {
            Some(target) => {
                debug!(nearest, look_ahead = target, "following trajectory");
                CycleOutcome::Command(pursuit_velocity(current, &positions[target], &speed_source))
            }
            None => {
                let last = positions.len() - 1;
                let velocity = pursuit_velocity(current, &positions[last], &speed_source);
                info!(nearest, "end of the trajectory");
                self.buffer = None;
                CycleOutcome::Completed(velocity)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn straight_line(n: usize) -> SolvedTrajectory {
        SolvedTrajectory::new(
            (0..n).map(|i| Vector3::new(i as f64, 0.0, 0.0)).collect(),
            vec![Vector3::new(1.0, 0.0, 0.0); n],
        )
        .unwrap()
    }

    #[test]
    fn test_nearest_index_prefers_first_tie() {
        let positions = vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
        ];

        assert_eq!(nearest_index(&positions, &Vector3::zeros()), Some(0));
        assert_eq!(nearest_index(&positions, &Vector3::new(-0.9, 0.0, 0.0)), Some(1));
        assert_eq!(nearest_index(&[], &Vector3::zeros()), None);
    }

    #[test]
    fn test_look_ahead_exact_distance() {
        let trajectory = straight_line(4);

        assert_eq!(look_ahead_index(trajectory.positions(), 1.0, 0), Some(1));
        assert_eq!(look_ahead_index(trajectory.positions(), 2.5, 0), Some(3));
        assert_eq!(look_ahead_index(trajectory.positions(), 5.0, 0), None);
    }

    #[test]
    fn test_straight_line_scenario() {
        let mut follower = TrajectoryFollower::new(1.0);
        follower.replace(straight_line(4));

        let outcome = follower.cycle(&Vector3::zeros());

        assert_eq!(outcome, CycleOutcome::Command(Vector3::new(1.0, 0.0, 0.0)));
        assert!(follower.is_following());
    }

    #[test]
    fn test_speed_from_nearest_direction_from_look_ahead() {
        let trajectory = SolvedTrajectory::new(
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(0.0, 2.0, 0.0),
                Vector3::new(0.0, 4.0, 0.0),
            ],
            vec![
                Vector3::new(0.0, 3.0, 4.0),
                Vector3::new(0.0, 1.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            ],
        )
        .unwrap();
        let mut follower = TrajectoryFollower::new(1.5);
        follower.replace(trajectory);

        // 最近傍は添字0（速さ5）、ルックアヘッドは添字1
        match follower.cycle(&Vector3::new(0.5, 0.0, 0.0)) {
            CycleOutcome::Command(v) => {
                assert_relative_eq!(v.norm(), 5.0, epsilon = 1e-12);
                let expected = Vector3::new(-0.5, 2.0, 0.0).normalize() * 5.0;
                assert_relative_eq!(v.x, expected.x, epsilon = 1e-12);
                assert_relative_eq!(v.y, expected.y, epsilon = 1e-12);
            }
            other => panic!("Expected CycleOutcome::Command, got {:?}", other),
        }
    }

    #[test]
    fn test_single_sample_completes_then_idles() {
        let mut follower = TrajectoryFollower::new(1.0);
        follower.replace(
            SolvedTrajectory::new(vec![Vector3::new(0.0, 3.0, 0.0)], vec![Vector3::new(0.0, 2.0, 0.0)])
                .unwrap(),
        );

        assert_eq!(
            follower.cycle(&Vector3::zeros()),
            CycleOutcome::Completed(Vector3::new(0.0, 2.0, 0.0))
        );
        assert!(!follower.is_following());
        assert_eq!(follower.cycle(&Vector3::zeros()), CycleOutcome::Idle);
    }

    #[test]
    fn test_idle_without_trajectory() {
        let mut follower = TrajectoryFollower::new(1.0);

        assert_eq!(follower.cycle(&Vector3::zeros()), CycleOutcome::Idle);
        follower.replace(SolvedTrajectory::default());
        assert_eq!(follower.cycle(&Vector3::zeros()), CycleOutcome::Idle);
    }

    #[test]
    fn test_new_trajectory_replaces_buffer() {
        let mut follower = TrajectoryFollower::new(1.0);
        follower.replace(straight_line(10));
        follower.replace(straight_line(2));

        // 10点の軌道なら追従を続けるが、置き換え後の2点軌道では終端に達している
        assert!(matches!(
            follower.cycle(&Vector3::new(1.0, 0.0, 0.0)),
            CycleOutcome::Completed(_)
        ));
    }

    #[test]
    fn test_zero_direction_gives_zero_command() {
        let velocity = pursuit_velocity(
            &Vector3::new(1.0, 1.0, 1.0),
            &Vector3::new(1.0, 1.0, 1.0),
            &Vector3::new(3.0, 0.0, 0.0),
        );

        assert_eq!(velocity, Vector3::zeros());
    }
}
