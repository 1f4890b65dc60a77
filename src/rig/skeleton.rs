use anyhow::{Context, Result};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::RigError;

// --- ファイル形式 ---

/// スケルトンファイル中の1ボーン（ワールド座標のバインドポーズ）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoneDef {
    pub name: String,
    pub position: [f32; 3],
    /// クォータニオン (x, y, z, w)
    pub rotation: [f32; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkeletonDef {
    pub bones: Vec<BoneDef>,
}

// --- 実行時 ---

#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub bind_position: Vector3<f32>,
    pub bind_rotation: UnitQuaternion<f32>,
}

/// 出力用のボーン姿勢
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BonePose {
    pub name: String,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
}

/// 名前付きボーン階層（レストポーズ）
///
/// ソルバーは `position` / `rotation` に毎フレーム書き込む。
#[derive(Debug, Clone)]
pub struct Skeleton {
    bones: Vec<Bone>,
}

impl Skeleton {
    pub fn from_def(def: SkeletonDef) -> Result<Self, RigError> {
        let mut seen = HashSet::new();
        let mut bones = Vec::with_capacity(def.bones.len());

        for b in def.bones {
            if !seen.insert(b.name.clone()) {
                return Err(RigError::InvalidSkeleton(format!("duplicate bone \"{}\"", b.name)));
            }
            if !b.position.iter().chain(b.rotation.iter()).all(|v| v.is_finite()) {
                return Err(RigError::InvalidSkeleton(format!(
                    "bone \"{}\" has non-finite values",
                    b.name
                )));
            }

            let [x, y, z, w] = b.rotation;
            let q = Quaternion::new(w, x, y, z);
            if q.norm() < 1e-6 {
                return Err(RigError::InvalidSkeleton(format!(
                    "bone \"{}\" has a zero rotation",
                    b.name
                )));
            }
            let rotation = UnitQuaternion::from_quaternion(q);
            let position = Vector3::from(b.position);

            bones.push(Bone {
                name: b.name,
                position,
                rotation,
                bind_position: position,
                bind_rotation: rotation,
            });
        }

        Ok(Self { bones })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read skeleton file {}", path.display()))?;
        let def: SkeletonDef = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse skeleton file {}", path.display()))?;
        Ok(Self::from_def(def)?)
    }

    /// 名前でボーンを検索
    pub fn find(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    pub fn bone(&self, index: usize) -> &Bone {
        &self.bones[index]
    }

    pub fn bone_mut(&mut self, index: usize) -> &mut Bone {
        &mut self.bones[index]
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn reset_to_bind(&mut self) {
        for b in &mut self.bones {
            b.position = b.bind_position;
            b.rotation = b.bind_rotation;
        }
    }

    pub fn poses(&self) -> Vec<BonePose> {
        self.bones
            .iter()
            .map(|b| BonePose {
                name: b.name.clone(),
                position: b.position.into(),
                rotation: b.rotation.coords.into(),
            })
            .collect()
    }
}

/// アバターのルート（ワールド位置 + 一様スケール）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvatarRoot {
    pub position: Vector3<f32>,
    pub scale: f32,
}

impl AvatarRoot {
    pub fn new(position: Vector3<f32>, scale: f32) -> Self {
        Self { position, scale }
    }

    /// 腰ボーンのバインド位置をアンカーにする
    pub fn anchored_at(skeleton: &Skeleton, hips_bone: &'static str) -> Result<Self, RigError> {
        let hips = skeleton.find(hips_bone).ok_or(RigError::MissingBone(hips_bone))?;
        Ok(Self::new(skeleton.bone(hips).bind_position, 1.0))
    }

    /// ランドマーク（アバター座標）をワールド座標へ
    pub fn to_world(&self, local: &Vector3<f32>) -> Vector3<f32> {
        self.position + local * self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bone(name: &str, position: [f32; 3]) -> BoneDef {
        BoneDef {
            name: name.to_string(),
            position,
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }

    #[test]
    fn test_from_def_and_find() {
        let def = SkeletonDef {
            bones: vec![bone("Hips", [0.0, 1.0, 0.0]), bone("Spine", [0.0, 1.2, 0.0])],
        };
        let skeleton = Skeleton::from_def(def).unwrap();
        assert_eq!(skeleton.find("Spine"), Some(1));
        assert_eq!(skeleton.find("Head"), None);
        assert_eq!(skeleton.bone(0).bind_position, Vector3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_rotation_is_normalized() {
        let mut b = bone("Hips", [0.0, 0.0, 0.0]);
        b.rotation = [0.0, 0.0, 0.0, 2.0];
        let skeleton = Skeleton::from_def(SkeletonDef { bones: vec![b] }).unwrap();
        assert!((skeleton.bone(0).rotation.quaternion().norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_duplicate_bone_rejected() {
        let def = SkeletonDef {
            bones: vec![bone("Hips", [0.0; 3]), bone("Hips", [0.0; 3])],
        };
        assert!(matches!(Skeleton::from_def(def), Err(RigError::InvalidSkeleton(_))));
    }

    #[test]
    fn test_zero_rotation_rejected() {
        let mut b = bone("Hips", [0.0; 3]);
        b.rotation = [0.0; 4];
        assert!(Skeleton::from_def(SkeletonDef { bones: vec![b] }).is_err());
    }

    #[test]
    fn test_reset_to_bind() {
        let def = SkeletonDef { bones: vec![bone("Hips", [0.0, 1.0, 0.0])] };
        let mut skeleton = Skeleton::from_def(def).unwrap();
        skeleton.bone_mut(0).position = Vector3::new(5.0, 5.0, 5.0);
        skeleton.reset_to_bind();
        assert_eq!(skeleton.bone(0).position, Vector3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_poses_use_xyzw_order() {
        let mut b = bone("Hips", [1.0, 2.0, 3.0]);
        b.rotation = [0.0, 1.0, 0.0, 0.0];
        let skeleton = Skeleton::from_def(SkeletonDef { bones: vec![b] }).unwrap();
        let poses = skeleton.poses();
        assert_eq!(poses[0].position, [1.0, 2.0, 3.0]);
        assert_eq!(poses[0].rotation, [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_avatar_root_anchor_and_to_world() {
        let def = SkeletonDef { bones: vec![bone("Hips", [0.0, 0.9, 0.5])] };
        let skeleton = Skeleton::from_def(def).unwrap();
        let mut root = AvatarRoot::anchored_at(&skeleton, "Hips").unwrap();
        assert_eq!(root.position, Vector3::new(0.0, 0.9, 0.5));
        assert_eq!(root.scale, 1.0);

        root.scale = 2.0;
        let w = root.to_world(&Vector3::new(0.1, 0.0, 0.0));
        assert!((w - Vector3::new(0.2, 0.9, 0.5)).amax() < 1e-6);

        assert!(matches!(
            AvatarRoot::anchored_at(&skeleton, "Chest"),
            Err(RigError::MissingBone("Chest"))
        ));
    }
}
