//! テスト用の T ポーズ（y上向き, -z 正面, 左半身が +x）

use nalgebra::{UnitQuaternion, Vector3};

use crate::pose::{Landmark, LandmarkFrame, LandmarkIndex, PoseFrame};
use crate::rig::derive;
use crate::rig::joint::{empty_positions, JointId, JointPositions};
use crate::rig::skeleton::{BoneDef, Skeleton, SkeletonDef};
use crate::rig::topology::BONE_MAP;

/// スケルトンのバインド位置 = BASE + T ポーズの関節位置
pub const BASE: [f32; 3] = [0.0, 0.95, 0.0];

/// 腰中点を原点としたアバター座標の T ポーズ
pub fn t_pose_landmark(index: LandmarkIndex) -> [f32; 3] {
    use LandmarkIndex::*;
    match index {
        Nose => [0.0, 0.60, -0.10],
        LeftEyeInner => [0.02, 0.64, -0.08],
        LeftEye => [0.035, 0.64, -0.08],
        LeftEyeOuter => [0.05, 0.64, -0.07],
        RightEyeInner => [-0.02, 0.64, -0.08],
        RightEye => [-0.035, 0.64, -0.08],
        RightEyeOuter => [-0.05, 0.64, -0.07],
        LeftEar => [0.08, 0.60, 0.0],
        RightEar => [-0.08, 0.60, 0.0],
        MouthLeft => [0.03, 0.56, -0.08],
        MouthRight => [-0.03, 0.56, -0.08],
        LeftShoulder => [0.18, 0.45, 0.0],
        RightShoulder => [-0.18, 0.45, 0.0],
        LeftElbow => [0.45, 0.45, 0.0],
        RightElbow => [-0.45, 0.45, 0.0],
        LeftWrist => [0.70, 0.45, 0.0],
        RightWrist => [-0.70, 0.45, 0.0],
        LeftPinky => [0.78, 0.44, 0.02],
        RightPinky => [-0.78, 0.44, 0.02],
        LeftIndex => [0.79, 0.45, -0.02],
        RightIndex => [-0.79, 0.45, -0.02],
        LeftThumb => [0.74, 0.46, -0.04],
        RightThumb => [-0.74, 0.46, -0.04],
        LeftHip => [0.10, 0.0, 0.0],
        RightHip => [-0.10, 0.0, 0.0],
        LeftKnee => [0.10, -0.45, 0.0],
        RightKnee => [-0.10, -0.45, 0.0],
        LeftAnkle => [0.10, -0.88, 0.0],
        RightAnkle => [-0.10, -0.88, 0.0],
        LeftHeel => [0.10, -0.93, 0.05],
        RightHeel => [-0.10, -0.93, 0.05],
        LeftFootIndex => [0.10, -0.95, -0.12],
        RightFootIndex => [-0.10, -0.95, -0.12],
    }
}

/// 観測 + 派生を含む T ポーズの関節位置
pub fn t_pose_positions() -> JointPositions {
    let mut p = empty_positions();
    for index in LandmarkIndex::ALL {
        p[index as usize] = Some(Vector3::from(t_pose_landmark(index)));
    }
    derive::apply(&mut p);
    p
}

/// バインド回転はボーンごとに異なる任意の値
pub fn bind_rotation(i: usize) -> UnitQuaternion<f32> {
    let k = i as f32;
    UnitQuaternion::from_euler_angles(0.1 * k, 0.2 - 0.03 * k, -0.05 * k)
}

/// T ポーズにバインドされたスケルトン
pub fn t_pose_skeleton() -> Skeleton {
    let positions = t_pose_positions();
    let base = Vector3::from(BASE);
    let bones = BONE_MAP
        .iter()
        .enumerate()
        .map(|(i, (joint, bone, _))| {
            let p = base + positions[*joint as usize].unwrap_or_else(Vector3::zeros);
            let q = bind_rotation(i);
            BoneDef {
                name: bone.name().to_string(),
                position: p.into(),
                rotation: q.coords.into(),
            }
        })
        .collect();
    Skeleton::from_def(SkeletonDef { bones }).unwrap()
}

/// T ポーズの推定器出力
///
/// world は推定器ワールド座標 (y下向き)、screen は 640x480 の画像に
/// 身長 1.6m ≒ 画像の 60% で写っている想定の正規化座標。
pub fn t_pose_frame() -> PoseFrame {
    let mut world = LandmarkFrame::default();
    let mut screen = LandmarkFrame::default();
    for index in LandmarkIndex::ALL {
        let [x, y, z] = t_pose_landmark(index);
        world.landmarks[index as usize] = Landmark::new(x, -y, z, 0.99);
        screen.landmarks[index as usize] =
            Landmark::new(0.5 + x * 0.28, 0.55 - y * 0.375, z, 0.99);
    }
    PoseFrame {
        timestamp_us: 0,
        screen,
        world,
    }
}

pub fn joint_of(bone_index: usize) -> JointId {
    BONE_MAP[bone_index].0
}
