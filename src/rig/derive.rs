//! 推定器が出力しない関節（腰・背骨・首・頭）の位置推定
//!
//! すべて純関数。入力が欠けている・縮退している場合は None を返し、
//! 呼び出し側（スタビライザ）が前フレームの値を使う。

use nalgebra::Vector3;

use crate::rig::joint::{position_of, JointId, JointPositions};
use crate::rig::orient::{head_axes, lerp, midpoint};

/// 腰中点 → 肩中点 の補間係数（ルート）
pub const ROOT_LIFT: f32 = 0.05;
/// 腰中点 → 肩中点 の補間係数（背骨）
pub const SPINE_LIFT: f32 = 0.25;

/// 派生関節の推定結果
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedJoints {
    pub hips: Option<Vector3<f32>>,
    pub spine: Option<Vector3<f32>>,
    pub neck: Option<Vector3<f32>>,
    pub head: Option<Vector3<f32>>,
}

impl DerivedJoints {
    /// 推定できなかった派生関節の数
    pub fn missing(&self) -> usize {
        [self.hips, self.spine, self.neck, self.head]
            .iter()
            .filter(|p| p.is_none())
            .count()
    }
}

/// 腰の中点と肩の中点
pub fn torso_midpoints(positions: &JointPositions) -> Option<(Vector3<f32>, Vector3<f32>)> {
    let left_hip = position_of(positions, JointId::LeftHip)?;
    let right_hip = position_of(positions, JointId::RightHip)?;
    let left_shoulder = position_of(positions, JointId::LeftShoulder)?;
    let right_shoulder = position_of(positions, JointId::RightShoulder)?;
    Some((
        midpoint(&left_hip, &right_hip),
        midpoint(&left_shoulder, &right_shoulder),
    ))
}

/// 頭の位置: 首から頭の上方向へ、鼻のオフセットを射影した点
pub fn head_position(
    neck: &Vector3<f32>,
    nose: &Vector3<f32>,
    left_ear: &Vector3<f32>,
    right_ear: &Vector3<f32>,
) -> Option<Vector3<f32>> {
    let (_, up) = head_axes(nose, left_ear, right_ear)?;
    Some(neck + up.into_inner() * (nose - neck).dot(up.as_ref()))
}

pub fn derive(positions: &JointPositions) -> DerivedJoints {
    let Some((hip_mid, shoulder_mid)) = torso_midpoints(positions) else {
        return DerivedJoints::default();
    };

    let neck = shoulder_mid;
    let head = match (
        position_of(positions, JointId::Nose),
        position_of(positions, JointId::LeftEar),
        position_of(positions, JointId::RightEar),
    ) {
        (Some(nose), Some(left_ear), Some(right_ear)) => {
            head_position(&neck, &nose, &left_ear, &right_ear)
        }
        _ => None,
    };

    DerivedJoints {
        hips: Some(lerp(&hip_mid, &shoulder_mid, ROOT_LIFT)),
        spine: Some(lerp(&hip_mid, &shoulder_mid, SPINE_LIFT)),
        neck: Some(neck),
        head,
    }
}

/// 派生関節を位置配列に書き込む。推定できなかった関節は None のまま
pub fn apply(positions: &mut JointPositions) -> DerivedJoints {
    let derived = derive(positions);
    positions[JointId::Hips as usize] = derived.hips;
    positions[JointId::Spine as usize] = derived.spine;
    positions[JointId::Neck as usize] = derived.neck;
    positions[JointId::Head as usize] = derived.head;
    derived
}
