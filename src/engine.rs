//! フレーム処理パイプライン
//!
//! 取り込み → 派生関節 → 安定化 → 位置合わせ → ソルブ を1フレームずつ
//! 完了させる。フレーム単位の欠損・縮退は数えるだけで処理は止めない。

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::align::{Alignment, AlignmentOutcome, Projection};
use crate::config::Config;
use crate::error::RigError;
use crate::pose::{LandmarkIndex, PoseFrame};
use crate::rig::derive;
use crate::rig::joint::{empty_positions, JointId};
use crate::rig::skeleton::{AvatarRoot, BonePose, Skeleton};
use crate::rig::{HumanBone, Solver, Stabilizer, Topology};
use crate::source::LandmarkSource;
use crate::space::estimator_world_to_avatar;

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    pub visibility_threshold: f32,
    /// None なら位置合わせしない
    pub scale_bias: Option<f32>,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            visibility_threshold: config.landmarks.visibility_threshold,
            scale_bias: config.alignment.enabled.then_some(config.alignment.scale_bias),
        }
    }
}

/// 1フレームの処理結果
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    /// 可視性不足・非有限で前フレームの値を使ったランドマーク数
    pub missing_landmarks: usize,
    /// 推定できなかった派生関節数
    pub missing_derived: usize,
    /// 位置がなく更新できなかったボーン数
    pub missing_bones: usize,
    /// 方向が縮退して回転を保持したボーン数
    pub degenerate_rotations: usize,
    pub alignment: Option<AlignmentOutcome>,
}

impl FrameReport {
    pub fn has_faults(&self) -> bool {
        self.missing_landmarks > 0
            || self.missing_derived > 0
            || self.missing_bones > 0
            || self.degenerate_rotations > 0
    }
}

/// 累計の統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames: u64,
    pub faulty_frames: u64,
    pub missing_landmarks: u64,
    pub degenerate_rotations: u64,
    pub skipped_alignments: u64,
}

impl FrameStats {
    fn record(&mut self, report: &FrameReport, alignment_enabled: bool) {
        self.frames += 1;
        if report.has_faults() {
            self.faulty_frames += 1;
        }
        self.missing_landmarks += report.missing_landmarks as u64;
        self.degenerate_rotations += report.degenerate_rotations as u64;
        if alignment_enabled && report.alignment.is_none() {
            self.skipped_alignments += 1;
        }
    }
}

pub struct Engine<P: Projection> {
    skeleton: Skeleton,
    root: AvatarRoot,
    solver: Solver,
    stabilizer: Stabilizer,
    alignment: Option<Alignment>,
    camera: P,
    visibility_threshold: f32,
    stats: FrameStats,
    halted: Option<String>,
}

impl<P: Projection> Engine<P> {
    /// トポロジ構築とレストポーズのキャリブレーション。必要なボーンがなければエラー
    pub fn new(skeleton: Skeleton, camera: P, settings: EngineSettings) -> Result<Self, RigError> {
        let topology = Topology::build(&skeleton)?;
        let solver = Solver::calibrate(&topology, &skeleton)?;
        let root = AvatarRoot::anchored_at(&skeleton, HumanBone::Hips.name())?;

        info!(
            "engine ready: {} bones, anchor=({:.3}, {:.3}, {:.3}), alignment={}",
            skeleton.bones().len(),
            root.position.x,
            root.position.y,
            root.position.z,
            if settings.scale_bias.is_some() { "on" } else { "off" }
        );

        Ok(Self {
            skeleton,
            root,
            solver,
            stabilizer: Stabilizer::new(),
            alignment: settings.scale_bias.map(Alignment::new),
            camera,
            visibility_threshold: settings.visibility_threshold,
            stats: FrameStats::default(),
            halted: None,
        })
    }

    /// 1フレーム処理する。停止後は何もせず None
    pub fn process(&mut self, frame: &PoseFrame) -> Option<FrameReport> {
        if self.halted.is_some() {
            return None;
        }

        let mut report = FrameReport::default();

        // 取り込み: 推定器ワールド座標 → アバター座標。欠損は前フレームの値
        let mut positions = empty_positions();
        for index in LandmarkIndex::ALL {
            let i = index as usize;
            positions[i] = match frame.world.valid_position(index, self.visibility_threshold) {
                Some(p) => Some(estimator_world_to_avatar(p)),
                None => {
                    report.missing_landmarks += 1;
                    self.stabilizer.previous(JointId::from(index))
                }
            };
        }

        let derived = derive::apply(&mut positions);
        report.missing_derived = derived.missing();

        let stabilized = self.stabilizer.apply(&positions);

        if let Some(alignment) = self.alignment.as_mut() {
            match alignment.align(&self.camera, &mut self.root, frame, self.visibility_threshold) {
                Ok(outcome) => report.alignment = Some(outcome),
                Err(skip) => debug!("frame {}: alignment skipped ({})", frame.timestamp_us, skip),
            }
        }

        let solved = self.solver.solve(&stabilized, &self.root, &mut self.skeleton);
        report.missing_bones = solved.missing;
        report.degenerate_rotations = solved.degenerate;

        if report.has_faults() {
            debug!(
                "frame {}: missing={} derived_missing={} bones_missing={} degenerate={}",
                frame.timestamp_us,
                report.missing_landmarks,
                report.missing_derived,
                report.missing_bones,
                report.degenerate_rotations
            );
        }
        self.stats.record(&report, self.alignment.is_some());

        Some(report)
    }

    /// 上流のストリームが失敗した。最後の姿勢で止める
    pub fn halt(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("engine halted: {}; holding last pose", reason);
        self.halted = Some(reason);
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    pub fn halt_reason(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn root(&self) -> &AvatarRoot {
        &self.root
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn poses(&self) -> Vec<BonePose> {
        self.skeleton.poses()
    }
}

/// ソースが尽きるまでフレームを処理する
///
/// ソースのエラーは終端扱い: エンジンを停止してエラーを返す（再接続はしない）。
pub fn run<P, S, F>(engine: &mut Engine<P>, source: &mut S, mut on_frame: F) -> Result<FrameStats>
where
    P: Projection,
    S: LandmarkSource,
    F: FnMut(&Engine<P>, &PoseFrame, &FrameReport) -> Result<()>,
{
    loop {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                engine.halt(format!("{:#}", e));
                return Err(e).context("landmark stream failed");
            }
        };
        if let Some(report) = engine.process(&frame) {
            on_frame(engine, &frame, &report)?;
        }
    }

    let stats = *engine.stats();
    if stats.faulty_frames > 0 {
        warn!(
            "{} of {} frames had missing or degenerate data ({} landmarks, {} rotations held)",
            stats.faulty_frames, stats.frames, stats.missing_landmarks, stats.degenerate_rotations
        );
    }
    Ok(stats)
}
