use nalgebra::{UnitQuaternion, Vector3};

use crate::pose::LandmarkIndex;

/// 関節ID: 33ランドマーク + 推定器が出力しない派生関節
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum JointId {
    Nose = 0,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
    // 推定器からは得られない
    Hips,
    Spine,
    Neck,
    Head,
}

impl JointId {
    pub const COUNT: usize = 37;

    pub const DERIVED: [JointId; 4] = [JointId::Hips, JointId::Spine, JointId::Neck, JointId::Head];

    pub fn from_index(index: usize) -> Option<Self> {
        if let Some(landmark) = LandmarkIndex::from_index(index) {
            return Some(Self::from(landmark));
        }
        match index {
            33 => Some(Self::Hips),
            34 => Some(Self::Spine),
            35 => Some(Self::Neck),
            36 => Some(Self::Head),
            _ => None,
        }
    }

    pub fn is_derived(self) -> bool {
        self as usize >= LandmarkIndex::COUNT
    }
}

impl From<LandmarkIndex> for JointId {
    fn from(landmark: LandmarkIndex) -> Self {
        use JointId::*;
        const OBSERVED: [JointId; LandmarkIndex::COUNT] = [
            Nose, LeftEyeInner, LeftEye, LeftEyeOuter, RightEyeInner, RightEye, RightEyeOuter,
            LeftEar, RightEar, MouthLeft, MouthRight,
            LeftShoulder, RightShoulder, LeftElbow, RightElbow, LeftWrist, RightWrist,
            LeftPinky, RightPinky, LeftIndex, RightIndex, LeftThumb, RightThumb,
            LeftHip, RightHip, LeftKnee, RightKnee, LeftAnkle, RightAnkle,
            LeftHeel, RightHeel, LeftFootIndex, RightFootIndex,
        ];
        OBSERVED[landmark as usize]
    }
}

/// 関節ごとの位置（アバター座標）。欠損は None
pub type JointPositions = [Option<Vector3<f32>>; JointId::COUNT];

pub fn empty_positions() -> JointPositions {
    [None; JointId::COUNT]
}

pub fn position_of(positions: &JointPositions, id: JointId) -> Option<Vector3<f32>> {
    positions[id as usize]
}

/// 関節アリーナの1レコード
///
/// 子関節は所有参照ではなく `JointId` で持つ。
#[derive(Debug, Clone)]
pub struct Joint {
    pub id: JointId,
    /// 対応するスケルトンボーンのインデックス
    pub bone: Option<usize>,
    /// レストポーズでのボーン回転
    pub bind_rotation: UnitQuaternion<f32>,
    /// レストポーズの向きの逆回転
    pub inverse: UnitQuaternion<f32>,
    /// 向きを決める子関節
    pub child: Option<JointId>,
    /// 直近で有効だった出力回転
    pub rotation: UnitQuaternion<f32>,
}

impl Joint {
    pub fn unbound(id: JointId) -> Self {
        Self {
            id,
            bone: None,
            bind_rotation: UnitQuaternion::identity(),
            inverse: UnitQuaternion::identity(),
            child: None,
            rotation: UnitQuaternion::identity(),
        }
    }
}

/// `JointId` で引く固定長の関節配列
#[derive(Debug, Clone)]
pub struct JointArena {
    joints: Vec<Joint>,
}

impl JointArena {
    pub fn new() -> Self {
        let joints = (0..JointId::COUNT)
            .filter_map(JointId::from_index)
            .map(Joint::unbound)
            .collect();
        Self { joints }
    }

    pub fn get(&self, id: JointId) -> &Joint {
        &self.joints[id as usize]
    }

    pub fn get_mut(&mut self, id: JointId) -> &mut Joint {
        &mut self.joints[id as usize]
    }

}

impl Default for JointArena {
    fn default() -> Self {
        Self::new()
    }
}
