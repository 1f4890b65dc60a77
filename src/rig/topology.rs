use crate::error::RigError;
use crate::rig::joint::JointId;
use crate::rig::skeleton::Skeleton;

/// 人型ボーン（Unity Humanoid の名前で参照する）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HumanBone {
    Hips,
    Spine,
    Neck,
    Head,
    LeftUpperArm,
    LeftLowerArm,
    LeftHand,
    RightUpperArm,
    RightLowerArm,
    RightHand,
    LeftUpperLeg,
    LeftLowerLeg,
    LeftFoot,
    LeftToes,
    RightUpperLeg,
    RightLowerLeg,
    RightFoot,
    RightToes,
}

impl HumanBone {
    pub fn name(self) -> &'static str {
        match self {
            Self::Hips => "Hips",
            Self::Spine => "Spine",
            Self::Neck => "Neck",
            Self::Head => "Head",
            Self::LeftUpperArm => "LeftUpperArm",
            Self::LeftLowerArm => "LeftLowerArm",
            Self::LeftHand => "LeftHand",
            Self::RightUpperArm => "RightUpperArm",
            Self::RightLowerArm => "RightLowerArm",
            Self::RightHand => "RightHand",
            Self::LeftUpperLeg => "LeftUpperLeg",
            Self::LeftLowerLeg => "LeftLowerLeg",
            Self::LeftFoot => "LeftFoot",
            Self::LeftToes => "LeftToes",
            Self::RightUpperLeg => "RightUpperLeg",
            Self::RightLowerLeg => "RightLowerLeg",
            Self::RightFoot => "RightFoot",
            Self::RightToes => "RightToes",
        }
    }
}

/// 関節 → (ボーン, 向きを決める子関節)
///
/// 表にない関節（目・口など）は計算の入力にだけ使う。
pub const BONE_MAP: [(JointId, HumanBone, Option<JointId>); 18] = [
    // 左腕
    (JointId::LeftShoulder, HumanBone::LeftUpperArm, Some(JointId::LeftElbow)),
    (JointId::LeftElbow, HumanBone::LeftLowerArm, Some(JointId::LeftWrist)),
    (JointId::LeftWrist, HumanBone::LeftHand, None),
    // 左脚
    (JointId::LeftHip, HumanBone::LeftUpperLeg, Some(JointId::LeftKnee)),
    (JointId::LeftKnee, HumanBone::LeftLowerLeg, Some(JointId::LeftAnkle)),
    (JointId::LeftAnkle, HumanBone::LeftFoot, Some(JointId::LeftFootIndex)),
    (JointId::LeftFootIndex, HumanBone::LeftToes, None),
    // 右腕
    (JointId::RightShoulder, HumanBone::RightUpperArm, Some(JointId::RightElbow)),
    (JointId::RightElbow, HumanBone::RightLowerArm, Some(JointId::RightWrist)),
    (JointId::RightWrist, HumanBone::RightHand, None),
    // 右脚
    (JointId::RightHip, HumanBone::RightUpperLeg, Some(JointId::RightKnee)),
    (JointId::RightKnee, HumanBone::RightLowerLeg, Some(JointId::RightAnkle)),
    (JointId::RightAnkle, HumanBone::RightFoot, Some(JointId::RightFootIndex)),
    (JointId::RightFootIndex, HumanBone::RightToes, None),
    // 体幹
    (JointId::Hips, HumanBone::Hips, None),
    (JointId::Spine, HumanBone::Spine, Some(JointId::Neck)),
    (JointId::Neck, HumanBone::Neck, Some(JointId::Head)),
    (JointId::Head, HumanBone::Head, None),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoneBinding {
    pub bone: HumanBone,
    /// `Skeleton` 内のインデックス
    pub bone_index: usize,
    pub child: Option<JointId>,
}

/// 関節IDで引く固定長のトポロジ表。初期化後は不変
#[derive(Debug, Clone)]
pub struct Topology {
    bindings: [Option<BoneBinding>; JointId::COUNT],
}

impl Topology {
    /// レストポーズのスケルトンから表を作る。必要なボーンが欠けていればエラー
    pub fn build(skeleton: &Skeleton) -> Result<Self, RigError> {
        let mut bindings = [None; JointId::COUNT];
        for (joint, bone, child) in BONE_MAP {
            let bone_index = skeleton
                .find(bone.name())
                .ok_or(RigError::MissingBone(bone.name()))?;
            bindings[joint as usize] = Some(BoneBinding { bone, bone_index, child });
        }
        Ok(Self { bindings })
    }

    pub fn binding(&self, joint: JointId) -> Option<&BoneBinding> {
        self.bindings[joint as usize].as_ref()
    }

    /// (関節, バインディング) を関節ID順に列挙
    pub fn iter(&self) -> impl Iterator<Item = (JointId, &BoneBinding)> {
        self.bindings.iter().enumerate().filter_map(|(i, b)| {
            let binding = b.as_ref()?;
            Some((JointId::from_index(i)?, binding))
        })
    }

    /// 表に出てくるボーン名の一覧
    pub fn required_bones() -> impl Iterator<Item = &'static str> {
        BONE_MAP.iter().map(|(_, bone, _)| bone.name())
    }
}
