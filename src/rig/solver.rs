use log::debug;
use nalgebra::{Unit, UnitQuaternion, Vector3};

use crate::error::RigError;
use crate::rig::joint::{position_of, Joint, JointArena, JointId, JointPositions};
use crate::rig::orient::{
    head_axes, is_finite_rotation, look_rotation, plane_normal, safe_normalize, world_up,
};
use crate::rig::skeleton::{AvatarRoot, Skeleton};
use crate::rig::stabilize::blend_direction;
use crate::rig::topology::Topology;

/// 1フレームのソルブ結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolveReport {
    /// 位置がなくボーンを更新できなかった関節数
    pub missing: usize,
    /// 方向が縮退して前フレームの回転を保持した関節数
    pub degenerate: usize,
}

/// リターゲットソルバー
///
/// 各関節の回転は「現在の向き × レストポーズの向きの逆 × バインド回転」。
/// 子関節への向き (aim) と体の正面方向 (腰平面の法線) から現在の向きを作る。
pub struct Solver {
    joints: JointArena,
    rest_forward: Unit<Vector3<f32>>,
    previous_gaze: Option<Unit<Vector3<f32>>>,
}

impl Solver {
    /// レストポーズのボーン位置から逆回転を事前計算する。最初のフレームの前に1回だけ
    pub fn calibrate(topology: &Topology, skeleton: &Skeleton) -> Result<Self, RigError> {
        let mut joints = JointArena::new();
        for (id, binding) in topology.iter() {
            let bind = skeleton.bone(binding.bone_index).bind_rotation;
            let joint = joints.get_mut(id);
            joint.bone = Some(binding.bone_index);
            joint.child = binding.child;
            joint.bind_rotation = bind;
            joint.rotation = bind;
        }

        let rest = |id: JointId| -> Result<Vector3<f32>, RigError> {
            topology
                .binding(id)
                .map(|b| skeleton.bone(b.bone_index).bind_position)
                .ok_or_else(|| RigError::InvalidSkeleton(format!("{:?} has no bone binding", id)))
        };

        let rest_forward = plane_normal(
            &rest(JointId::Hips)?,
            &rest(JointId::LeftHip)?,
            &rest(JointId::RightHip)?,
        )
        .ok_or(RigError::DegenerateRestPose("Hips"))?;

        let body = look_rotation(&rest_forward, &world_up())
            .ok_or(RigError::DegenerateRestPose("Hips"))?
            .inverse();
        joints.get_mut(JointId::Hips).inverse = body;
        joints.get_mut(JointId::Head).inverse = body;

        for (id, binding) in topology.iter() {
            let Some(child) = binding.child else {
                continue;
            };
            let aim = rest(child)? - rest(id)?;
            let look = look_rotation(&aim, &rest_forward)
                .ok_or(RigError::DegenerateRestPose(binding.bone.name()))?;
            joints.get_mut(id).inverse = look.inverse();
        }

        debug!(
            "rest pose calibrated: forward=({:.3}, {:.3}, {:.3})",
            rest_forward.x, rest_forward.y, rest_forward.z
        );

        Ok(Self {
            joints,
            rest_forward,
            previous_gaze: None,
        })
    }

    pub fn rest_forward(&self) -> Unit<Vector3<f32>> {
        self.rest_forward
    }

    pub fn joint(&self, id: JointId) -> &Joint {
        self.joints.get(id)
    }

    /// 安定化済みの関節位置からボーンの位置と回転を書き込む
    pub fn solve(
        &mut self,
        positions: &JointPositions,
        root: &AvatarRoot,
        skeleton: &mut Skeleton,
    ) -> SolveReport {
        let mut report = SolveReport::default();

        let forward = match (
            position_of(positions, JointId::Hips),
            position_of(positions, JointId::LeftHip),
            position_of(positions, JointId::RightHip),
        ) {
            (Some(hips), Some(left), Some(right)) => plane_normal(&hips, &left, &right),
            _ => None,
        };
        if forward.is_none() {
            debug!("body plane undefined; holding forward-dependent rotations");
        }

        let gaze = self.head_gaze(positions);

        for i in 0..JointId::COUNT {
            let Some(id) = JointId::from_index(i) else {
                continue;
            };
            let joint = self.joints.get_mut(id);
            let position = positions[i];
            let Some(bone_index) = joint.bone else {
                continue;
            };

            match (id, position) {
                (JointId::Hips, Some(p)) => skeleton.bone_mut(bone_index).position = root.position + p,
                (_, Some(p)) => skeleton.bone_mut(bone_index).position = root.to_world(&p),
                (_, None) => report.missing += 1,
            }

            let look = match id {
                JointId::Hips => Some(forward.and_then(|f| look_rotation(&f, &world_up()))),
                JointId::Head => Some(gaze.and_then(|(g, up)| look_rotation(&g, &up))),
                _ => joint.child.map(|child| {
                    let aim = position_of(positions, child)
                        .zip(position)
                        .map(|(c, p)| c - p);
                    aim.zip(forward).and_then(|(aim, f)| look_rotation(&aim, &f))
                }),
            };

            // 子のない末端（手・つま先）は回転を書き換えない
            let Some(look) = look else {
                continue;
            };
            if !apply_rotation(joint, look) {
                debug!("{:?}: degenerate direction, holding previous rotation", id);
                report.degenerate += 1;
            }
            skeleton.bone_mut(bone_index).rotation = joint.rotation;
        }

        report
    }

    /// 顔の向きと頭の上方向。向きは前フレームと球面補間する
    fn head_gaze(&mut self, positions: &JointPositions) -> Option<(Vector3<f32>, Vector3<f32>)> {
        let nose = position_of(positions, JointId::Nose)?;
        let left_ear = position_of(positions, JointId::LeftEar)?;
        let right_ear = position_of(positions, JointId::RightEar)?;

        let (gaze, _) = head_axes(&nose, &left_ear, &right_ear)?;
        let gaze = match self.previous_gaze {
            Some(prev) => blend_direction(&gaze, &prev),
            None => gaze,
        };
        self.previous_gaze = Some(gaze);

        let ear_axis = safe_normalize(&(left_ear - right_ear))?;
        let up = ear_axis.cross(gaze.as_ref());
        Some((gaze.into_inner(), up))
    }
}

/// 有効な向きなら合成して保存。縮退時は前の回転を保持して false
fn apply_rotation(joint: &mut Joint, look: Option<UnitQuaternion<f32>>) -> bool {
    let composed = look
        .map(|q| q * joint.inverse * joint.bind_rotation)
        .filter(is_finite_rotation);
    match composed {
        Some(mut q) => {
            q.renormalize();
            joint.rotation = q;
            true
        }
        None => false,
    }
}
