use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// MediaPipe Pose の 33 ランドマークインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;

    pub const ALL: [LandmarkIndex; Self::COUNT] = {
        use LandmarkIndex::*;
        [
            Nose, LeftEyeInner, LeftEye, LeftEyeOuter, RightEyeInner, RightEye, RightEyeOuter,
            LeftEar, RightEar, MouthLeft, MouthRight,
            LeftShoulder, RightShoulder, LeftElbow, RightElbow, LeftWrist, RightWrist,
            LeftPinky, RightPinky, LeftIndex, RightIndex, LeftThumb, RightThumb,
            LeftHip, RightHip, LeftKnee, RightKnee, LeftAnkle, RightAnkle,
            LeftHeel, RightHeel, LeftFootIndex, RightFootIndex,
        ]
    };

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// 単一ランドマーク
///
/// JSONでは `[x, y, z, visibility]` の配列として表現する。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// 可視性スコア (0.0〜1.0)
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    /// 可視性が閾値以上で、座標がすべて有限か
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.visibility >= threshold
            && self.x.is_finite()
            && self.y.is_finite()
            && self.z.is_finite()
    }

    pub fn position(&self) -> Vector3<f32> {
        Vector3::new(self.x, self.y, self.z)
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visibility: 0.0,
        }
    }
}

impl From<[f32; 4]> for Landmark {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Landmark> for [f32; 4] {
    fn from(l: Landmark) -> Self {
        [l.x, l.y, l.z, l.visibility]
    }
}

/// 1ティック分の33ランドマーク
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Landmark>", into = "Vec<Landmark>")]
pub struct LandmarkFrame {
    pub landmarks: [Landmark; LandmarkIndex::COUNT],
}

impl LandmarkFrame {
    pub fn new(landmarks: [Landmark; LandmarkIndex::COUNT]) -> Self {
        Self { landmarks }
    }

    pub fn get(&self, index: LandmarkIndex) -> &Landmark {
        &self.landmarks[index as usize]
    }

    /// 有効なら位置を返す
    pub fn valid_position(&self, index: LandmarkIndex, threshold: f32) -> Option<Vector3<f32>> {
        let lm = self.get(index);
        lm.is_valid(threshold).then(|| lm.position())
    }

    /// 閾値以上のランドマーク数
    pub fn valid_count(&self, threshold: f32) -> usize {
        self.landmarks.iter().filter(|l| l.is_valid(threshold)).count()
    }
}

impl Default for LandmarkFrame {
    fn default() -> Self {
        Self {
            landmarks: [Landmark::default(); LandmarkIndex::COUNT],
        }
    }
}

impl TryFrom<Vec<Landmark>> for LandmarkFrame {
    type Error = String;

    fn try_from(v: Vec<Landmark>) -> Result<Self, Self::Error> {
        let len = v.len();
        let landmarks: [Landmark; LandmarkIndex::COUNT] = v
            .try_into()
            .map_err(|_| format!("expected {} landmarks, got {}", LandmarkIndex::COUNT, len))?;
        Ok(Self { landmarks })
    }
}

impl From<LandmarkFrame> for Vec<Landmark> {
    fn from(frame: LandmarkFrame) -> Self {
        frame.landmarks.to_vec()
    }
}

/// 推定器の1ティック出力
///
/// `screen` は画像正規化座標 (原点左上, y下向き)、
/// `world` は推定器のワールド座標 (腰中心, メートル, y下向き)。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    #[serde(default)]
    pub timestamp_us: u64,
    #[serde(rename = "landmarks")]
    pub screen: LandmarkFrame,
    #[serde(rename = "world_landmarks")]
    pub world: LandmarkFrame,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_index_count() {
        assert_eq!(LandmarkIndex::COUNT, 33);
        for (i, idx) in LandmarkIndex::ALL.iter().enumerate() {
            assert_eq!(*idx as usize, i);
        }
    }

    #[test]
    fn test_landmark_index_from_index() {
        assert_eq!(LandmarkIndex::from_index(0), Some(LandmarkIndex::Nose));
        assert_eq!(LandmarkIndex::from_index(23), Some(LandmarkIndex::LeftHip));
        assert_eq!(LandmarkIndex::from_index(32), Some(LandmarkIndex::RightFootIndex));
        assert_eq!(LandmarkIndex::from_index(33), None);
    }

    #[test]
    fn test_landmark_is_valid() {
        let lm = Landmark::new(0.5, 0.5, 0.0, 0.7);
        assert!(lm.is_valid(0.5));
        assert!(!lm.is_valid(0.8));

        let nan = Landmark::new(f32::NAN, 0.5, 0.0, 1.0);
        assert!(!nan.is_valid(0.0));
    }

    #[test]
    fn test_frame_valid_position() {
        let mut frame = LandmarkFrame::default();
        frame.landmarks[LandmarkIndex::Nose as usize] = Landmark::new(0.1, 0.2, 0.3, 0.9);

        let nose = frame.valid_position(LandmarkIndex::Nose, 0.5).unwrap();
        assert_eq!(nose, Vector3::new(0.1, 0.2, 0.3));
        assert!(frame.valid_position(LandmarkIndex::LeftEar, 0.5).is_none());
        assert_eq!(frame.valid_count(0.5), 1);
    }

    #[test]
    fn test_pose_frame_deserialize() {
        let list = vec!["[0.5, 0.25, -0.1, 0.9]"; LandmarkIndex::COUNT].join(",");
        let json = format!(
            r#"{{"timestamp_us": 42, "landmarks": [{list}], "world_landmarks": [{list}]}}"#
        );

        let frame: PoseFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(frame.timestamp_us, 42);
        assert_eq!(*frame.screen.get(LandmarkIndex::RightHeel), Landmark::new(0.5, 0.25, -0.1, 0.9));
        assert_eq!(frame.world.valid_count(0.5), LandmarkIndex::COUNT);
    }

    #[test]
    fn test_pose_frame_rejects_short_list() {
        let list = vec!["[0.0, 0.0, 0.0, 1.0]"; 17].join(",");
        let json = format!(r#"{{"landmarks": [{list}], "world_landmarks": [{list}]}}"#);
        assert!(serde_json::from_str::<PoseFrame>(&json).is_err());
    }
}
