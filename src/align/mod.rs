//! スクリーン空間でのアバター位置合わせ
//!
//! アバターのランドマークをカメラで射影した点群 (source) と、推定器の
//! スクリーン座標の点群 (target) を比べ、腰中点を基準に一様スケールと
//! 平行移動を求めてアバタールートに適用する。

pub mod camera;

pub use camera::{PinholeCamera, Projection};

use log::debug;
use nalgebra::Vector3;
use thiserror::Error;

use crate::pose::{LandmarkIndex, PoseFrame};
use crate::rig::orient::midpoint;
use crate::rig::skeleton::AvatarRoot;
use crate::space::{estimator_world_to_avatar, normalized_to_screen};

/// スケール比の分子・分母に足す定数
///
/// 距離がほぼゼロのときの発散を防ぎ、スケールの応答を鈍らせる。調整用の値。
pub const DEFAULT_SCALE_BIAS: f32 = 1.0;

pub type ScreenPoints = [Option<Vector3<f32>>; LandmarkIndex::COUNT];

/// 1フレームの位置合わせ結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentOutcome {
    pub scale_factor: f32,
    pub source_pivot: Vector3<f32>,
    pub target_pivot: Vector3<f32>,
    /// 適用後のルート位置
    pub position: Vector3<f32>,
}

/// 位置合わせを見送った理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AlignSkip {
    #[error("avatar hips not projectable")]
    SourceHipsHidden,
    #[error("hips not visible on screen")]
    TargetHipsHidden,
    #[error("no landmark valid in both silhouettes")]
    ScaleUndefined,
    #[error("avatar root behind camera")]
    RootBehindCamera,
}

pub struct Alignment {
    scale_bias: f32,
    source: ScreenPoints,
    target: ScreenPoints,
}

impl Alignment {
    pub fn new(scale_bias: f32) -> Self {
        Self {
            scale_bias,
            source: [None; LandmarkIndex::COUNT],
            target: [None; LandmarkIndex::COUNT],
        }
    }

    /// スケール → 平行移動の順にルートを更新する。
    /// 腰が見えていない等で合わせられないフレームはルートに触れない。
    pub fn align<P: Projection>(
        &mut self,
        camera: &P,
        root: &mut AvatarRoot,
        frame: &PoseFrame,
        threshold: f32,
    ) -> Result<AlignmentOutcome, AlignSkip> {
        self.to_screen_space(camera, root, frame, threshold);

        let source_pivot = hip_pivot(&self.source).ok_or(AlignSkip::SourceHipsHidden)?;
        let target_pivot = hip_pivot(&self.target).ok_or(AlignSkip::TargetHipsHidden)?;
        let scale_factor = scale_ratio(
            &self.source,
            &self.target,
            &source_pivot,
            &target_pivot,
            self.scale_bias,
        )
        .ok_or(AlignSkip::ScaleUndefined)?;
        let depth = camera
            .world_to_screen(&root.position)
            .ok_or(AlignSkip::RootBehindCamera)?
            .z;

        root.scale *= scale_factor;

        let anchor = camera.screen_to_world(&Vector3::new(target_pivot.x, target_pivot.y, depth));
        root.position.x = anchor.x;
        root.position.y = anchor.y;

        debug!(
            "aligned: scale x{:.4} -> {:.4}, root=({:.3}, {:.3}, {:.3})",
            scale_factor, root.scale, root.position.x, root.position.y, root.position.z
        );

        Ok(AlignmentOutcome {
            scale_factor,
            source_pivot,
            target_pivot,
            position: root.position,
        })
    }

    fn to_screen_space<P: Projection>(
        &mut self,
        camera: &P,
        root: &AvatarRoot,
        frame: &PoseFrame,
        threshold: f32,
    ) {
        let viewport = camera.viewport();
        for index in LandmarkIndex::ALL {
            let i = index as usize;
            self.source[i] = frame.world.valid_position(index, threshold).and_then(|p| {
                let world = root.to_world(&estimator_world_to_avatar(p));
                camera.world_to_screen(&world)
            });
            self.target[i] = frame
                .screen
                .valid_position(index, threshold)
                .map(|p| normalized_to_screen(p, viewport));
        }
    }
}

impl Default for Alignment {
    fn default() -> Self {
        Self::new(DEFAULT_SCALE_BIAS)
    }
}

/// 左右の腰の中点
pub fn hip_pivot(points: &ScreenPoints) -> Option<Vector3<f32>> {
    let left = points[LandmarkIndex::LeftHip as usize]?;
    let right = points[LandmarkIndex::RightHip as usize]?;
    Some(midpoint(&left, &right))
}

/// (bias + target の基準点からの平均距離) / (bias + source の平均距離)
///
/// 平均は両方で有効なランドマークだけで取る。
pub fn scale_ratio(
    source: &ScreenPoints,
    target: &ScreenPoints,
    source_pivot: &Vector3<f32>,
    target_pivot: &Vector3<f32>,
    bias: f32,
) -> Option<f32> {
    let pairs: Vec<(f32, f32)> = source
        .iter()
        .zip(target.iter())
        .filter_map(|(s, t)| Some(((s.as_ref()? - source_pivot).norm(), (t.as_ref()? - target_pivot).norm())))
        .collect();
    if pairs.is_empty() {
        return None;
    }

    let n = pairs.len() as f32;
    let source_scaling = bias + pairs.iter().map(|(s, _)| s / n).sum::<f32>();
    let target_scaling = bias + pairs.iter().map(|(_, t)| t / n).sum::<f32>();
    if source_scaling.abs() < 1e-6 {
        return None;
    }

    let ratio = target_scaling / source_scaling;
    (ratio.is_finite() && ratio > 0.0).then_some(ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Landmark;
    use crate::rig::fixture::t_pose_frame;
    use crate::space::screen_to_normalized;

    fn camera() -> PinholeCamera {
        PinholeCamera::new(60.0, 640, 480, [0.0, 1.0, -3.0], [0.0, 0.0, 0.0])
    }

    /// 腰を原点に、各点を pivot から distance だけ離して並べる
    fn ring(pivot: Vector3<f32>, distance: f32) -> ScreenPoints {
        let mut points = [None; LandmarkIndex::COUNT];
        for (i, p) in points.iter_mut().enumerate() {
            let angle = i as f32 * 0.37;
            *p = Some(pivot + Vector3::new(angle.cos(), angle.sin(), 0.0) * distance);
        }
        points[LandmarkIndex::LeftHip as usize] = Some(pivot + Vector3::new(distance, 0.0, 0.0));
        points[LandmarkIndex::RightHip as usize] = Some(pivot - Vector3::new(distance, 0.0, 0.0));
        points
    }

    #[test]
    fn test_hip_pivot() {
        let points = ring(Vector3::new(100.0, 50.0, 0.0), 10.0);
        let pivot = hip_pivot(&points).unwrap();
        assert!((pivot - Vector3::new(100.0, 50.0, 0.0)).amax() < 1e-4);
    }

    #[test]
    fn test_scale_ratio_identity() {
        let a = ring(Vector3::new(0.0, 0.0, 0.0), 80.0);
        let b = ring(Vector3::new(300.0, 200.0, 0.0), 80.0);
        let r = scale_ratio(&a, &b, &hip_pivot(&a).unwrap(), &hip_pivot(&b).unwrap(), 1.0).unwrap();
        assert!((r - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_scale_ratio_doubles() {
        let pivot = Vector3::new(320.0, 240.0, 0.0);
        let source = ring(pivot, 100.0);
        let target = ring(pivot, 200.0);
        let r = scale_ratio(&source, &target, &pivot, &pivot, DEFAULT_SCALE_BIAS).unwrap();
        // (1 + 200) / (1 + 100)
        assert!((r - 201.0 / 101.0).abs() < 1e-4);
        assert!((r - 2.0).abs() < 0.02);
    }

    #[test]
    fn test_scale_ratio_bias_damps_tiny_distances() {
        let pivot = Vector3::new(0.0, 0.0, 0.0);
        let source = ring(pivot, 0.001);
        let target = ring(pivot, 0.002);
        let r = scale_ratio(&source, &target, &pivot, &pivot, 1.0).unwrap();
        assert!((r - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_scale_ratio_ignores_unpaired() {
        let pivot = Vector3::new(0.0, 0.0, 0.0);
        let source = ring(pivot, 100.0);
        let mut target = ring(pivot, 100.0);
        target[LandmarkIndex::Nose as usize] = None;
        let r = scale_ratio(&source, &target, &pivot, &pivot, 1.0).unwrap();
        assert!((r - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_scale_ratio_zero_denominator() {
        let pivot = Vector3::new(0.0, 0.0, 0.0);
        let source = ring(pivot, 0.0);
        let target = ring(pivot, 10.0);
        assert!(scale_ratio(&source, &target, &pivot, &pivot, 0.0).is_none());
    }

    #[test]
    fn test_align_moves_root_onto_target_hips() {
        let cam = camera();
        let mut root = AvatarRoot::new(Vector3::new(0.0, 1.0, 0.0), 1.0);
        let frame = t_pose_frame();
        let mut alignment = Alignment::default();

        let outcome = alignment.align(&cam, &mut root, &frame, 0.5).unwrap();
        assert!(outcome.scale_factor > 0.0);
        assert!((root.scale - outcome.scale_factor).abs() < 1e-6);
        // z は変えない
        assert_eq!(root.position.z, 0.0);

        let projected = cam.world_to_screen(&root.position).unwrap();
        assert!((projected.x - outcome.target_pivot.x).abs() < 1e-2);
        assert!((projected.y - outcome.target_pivot.y).abs() < 1e-2);
    }

    #[test]
    fn test_align_matching_silhouette_keeps_scale() {
        let cam = camera();
        let root = AvatarRoot::new(Vector3::new(0.0, 1.0, 0.0), 1.0);
        let mut frame = t_pose_frame();

        // 現在のアバターの射影をそのまま target にする
        for index in LandmarkIndex::ALL {
            let w = frame.world.get(index).position();
            let s = cam.world_to_screen(&root.to_world(&estimator_world_to_avatar(w))).unwrap();
            let n = screen_to_normalized(s, cam.viewport());
            frame.screen.landmarks[index as usize] = Landmark::new(n.x, n.y, n.z, 1.0);
        }

        let mut aligned = root;
        let outcome = Alignment::default().align(&cam, &mut aligned, &frame, 0.5).unwrap();
        assert!((outcome.scale_factor - 1.0).abs() < 1e-4);
        assert!((aligned.position - root.position).amax() < 1e-3);
    }

    #[test]
    fn test_align_bigger_target_grows_avatar() {
        let cam = camera();
        let mut small = t_pose_frame();
        for lm in small.screen.landmarks.iter_mut() {
            lm.x = 0.5 + (lm.x - 0.5) * 0.5;
            lm.y = 0.55 + (lm.y - 0.55) * 0.5;
        }
        let big = t_pose_frame();

        let mut root_small = AvatarRoot::new(Vector3::new(0.0, 1.0, 0.0), 1.0);
        let mut root_big = root_small;
        Alignment::default().align(&cam, &mut root_small, &small, 0.5).unwrap();
        Alignment::default().align(&cam, &mut root_big, &big, 0.5).unwrap();
        assert!(root_big.scale > root_small.scale * 1.8);
    }

    #[test]
    fn test_align_without_hips_is_noop() {
        let cam = camera();
        let mut frame = t_pose_frame();
        frame.screen.landmarks[LandmarkIndex::LeftHip as usize].visibility = 0.0;
        let mut root = AvatarRoot::new(Vector3::new(0.0, 1.0, 0.0), 1.0);
        let before = root;

        assert_eq!(
            Alignment::default().align(&cam, &mut root, &frame, 0.5),
            Err(AlignSkip::TargetHipsHidden)
        );
        assert_eq!(root, before);
    }

    #[test]
    fn test_align_avatar_behind_camera_is_noop() {
        let cam = camera();
        let frame = t_pose_frame();
        let mut root = AvatarRoot::new(Vector3::new(0.0, 1.0, -5.0), 1.0);
        let before = root;

        let skip = Alignment::default().align(&cam, &mut root, &frame, 0.5).unwrap_err();
        assert_eq!(skip, AlignSkip::SourceHipsHidden);
        assert_eq!(root, before);
    }
}
