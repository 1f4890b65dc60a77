//! 姿勢計算の共通ヘルパー
//!
//! `look_rotation` はローカル +Z を `forward` に、ローカル +Y を `up` に
//! できるだけ近づける回転を返す。`forward` か `up` がゼロ長・非有限なら `None`。

use nalgebra::{Unit, UnitQuaternion, Vector3};
use std::f32::consts::PI;

/// これ未満の長さのベクトルは方向として扱わない
pub const DIRECTION_EPSILON: f32 = 1e-6;

/// forward と up の外積がこれ未満なら平行とみなす
const PARALLEL_EPSILON: f32 = 1e-4;

pub fn world_up() -> Vector3<f32> {
    Vector3::y()
}

pub fn lerp(a: &Vector3<f32>, b: &Vector3<f32>, t: f32) -> Vector3<f32> {
    a + (b - a) * t
}

pub fn midpoint(a: &Vector3<f32>, b: &Vector3<f32>) -> Vector3<f32> {
    lerp(a, b, 0.5)
}

/// ゼロ長・非有限なら None
pub fn safe_normalize(v: &Vector3<f32>) -> Option<Unit<Vector3<f32>>> {
    if !v.iter().all(|c| c.is_finite()) {
        return None;
    }
    Unit::try_new(*v, DIRECTION_EPSILON)
}

/// (root, left_hip, right_hip) を通る平面の法線 = 体の正面方向
pub fn plane_normal(
    root: &Vector3<f32>,
    left_hip: &Vector3<f32>,
    right_hip: &Vector3<f32>,
) -> Option<Unit<Vector3<f32>>> {
    let to_left = root - left_hip;
    let to_right = root - right_hip;
    safe_normalize(&to_left.cross(&to_right))
}

pub fn look_rotation(forward: &Vector3<f32>, up: &Vector3<f32>) -> Option<UnitQuaternion<f32>> {
    let forward = safe_normalize(forward)?;
    let up = safe_normalize(up)?;
    if forward.cross(up.as_ref()).norm() < PARALLEL_EPSILON {
        // up と平行: ロールは決まらないので +Z からの最短回転
        return Some(
            UnitQuaternion::rotation_between(&Vector3::z(), &forward.into_inner())
                .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::y_axis(), PI)),
        );
    }
    Some(UnitQuaternion::face_towards(&forward.into_inner(), &up.into_inner()))
}

/// 顔の向き (gaze) と頭の上方向
///
/// gaze = normalize(nose - 両耳の中点)
/// up   = normalize(cross(normalize(left_ear - right_ear), gaze))
pub fn head_axes(
    nose: &Vector3<f32>,
    left_ear: &Vector3<f32>,
    right_ear: &Vector3<f32>,
) -> Option<(Unit<Vector3<f32>>, Unit<Vector3<f32>>)> {
    let gaze = safe_normalize(&(nose - midpoint(left_ear, right_ear)))?;
    let ear_axis = safe_normalize(&(left_ear - right_ear))?;
    let up = safe_normalize(&ear_axis.cross(gaze.as_ref()))?;
    Some((gaze, up))
}

/// 合成後の回転が有限か
pub fn is_finite_rotation(q: &UnitQuaternion<f32>) -> bool {
    q.coords.iter().all(|c| c.is_finite())
}
