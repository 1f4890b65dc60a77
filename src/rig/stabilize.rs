use nalgebra::{Unit, Vector3};

use crate::rig::joint::{empty_positions, JointId, JointPositions};

/// 前フレームとのブレンド係数（固定）
pub const BLEND: f32 = 0.5;

/// 関節位置のフレーム間平滑化フィルタ
///
/// 位置: 前フレームとの線形補間
/// 方向: 球面線形補間 (`blend_direction`)
///
/// 前フレームのバッファは読み取り専用のスナップショットとして扱い、
/// 全関節を計算し終えてから差し替える。
pub struct Stabilizer {
    previous: JointPositions,
}

impl Stabilizer {
    pub fn new() -> Self {
        Self {
            previous: empty_positions(),
        }
    }

    /// 欠損 (None) の関節は前フレームの値をそのまま使う。
    /// 初回は入力をそのまま通す。
    pub fn apply(&mut self, current: &JointPositions) -> JointPositions {
        let previous = &self.previous;
        let next: JointPositions = std::array::from_fn(|i| match (current[i], previous[i]) {
            (Some(cur), Some(prev)) => Some(blend_position(&cur, &prev)),
            (Some(cur), None) => Some(cur),
            (None, prev) => prev,
        });
        self.previous = next;
        next
    }

    /// 前フレームの安定化済み位置
    pub fn previous(&self, id: JointId) -> Option<Vector3<f32>> {
        self.previous[id as usize]
    }

    pub fn reset(&mut self) {
        self.previous = empty_positions();
    }
}

impl Default for Stabilizer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn blend_position(current: &Vector3<f32>, previous: &Vector3<f32>) -> Vector3<f32> {
    current.lerp(previous, BLEND)
}

/// 単位方向ベクトルのブレンド。ほぼ同じ向き、または逆向きで補間が
/// 定義できない場合は現在値
pub fn blend_direction(
    current: &Unit<Vector3<f32>>,
    previous: &Unit<Vector3<f32>>,
) -> Unit<Vector3<f32>> {
    if current.dot(previous.as_ref()) >= 1.0 - 1e-7 {
        return *current;
    }
    current
        .try_slerp(previous, BLEND, 1e-6)
        .unwrap_or(*current)
}
