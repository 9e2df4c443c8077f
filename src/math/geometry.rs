// src/math/geometry.rs

use nalgebra::{Rotation2, UnitQuaternion, Vector2, Vector3};

/// 水平面内のオフセットを方位角だけ回転させる
///
/// # 引数
/// - `offset`: カメラ基準フレームでのオフセット [x, y]
/// - `angle`: 回転角 (rad)
///
/// # 戻り値
/// - ワールドフレームでのオフセット
pub fn rotate_planar(offset: Vector2<f64>, angle: f64) -> Vector2<f64> {
    Rotation2::new(angle) * offset
}

/// `from` から `to` を水平に向くヨー姿勢
///
/// 2点が水平面上で重なる場合は `None`。
pub fn yaw_towards(from: &Vector3<f64>, to: &Vector3<f64>) -> Option<UnitQuaternion<f64>> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dx.hypot(dy) < 1e-9 {
        return None;
    }
    Some(UnitQuaternion::from_euler_angles(0.0, 0.0, dy.atan2(dx)))
}

/// 方向ベクトルを正規化する。長さがほぼゼロならゼロベクトル。
pub fn unit_or_zero(v: &Vector3<f64>) -> Vector3<f64> {
    v.try_normalize(1e-9).unwrap_or_else(Vector3::zeros)
}
